//! Coordinate reference systems and reprojection to WGS84.
//!
//! CRS definitions come from the EPSG catalogue bundled in `crs-definitions`;
//! the math is `proj4rs`. Geographic systems are handled in degrees at the
//! API boundary and converted to the radians `proj4rs` expects.

use std::fmt;
use std::str::FromStr;

use geo::MapCoords;
use geo_types::{Coord, Geometry};
use proj4rs::proj::Proj;

use crate::error::{FormatError, TransformError};

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u32,
}

/// ESRI and legacy codes for Web Mercator.
const WEB_MERCATOR_ALIASES: [u32; 3] = [102_100, 102_113, 900_913];

impl Crs {
    /// WGS84 geographic coordinates (EPSG:4326), the default for `GeoJSON`.
    pub const WGS84: Crs = Crs { epsg: 4326 };

    #[must_use]
    pub const fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    #[must_use]
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    #[must_use]
    pub fn is_wgs84(&self) -> bool {
        *self == Self::WGS84
    }

    /// Parse a CRS name as found in a `GeoJSON` `crs` member.
    ///
    /// Accepts `EPSG:<code>`, OGC URNs (`urn:ogc:def:crs:EPSG:[version]:<code>`),
    /// OGC `http://www.opengis.net/def/crs/EPSG/0/<code>` URIs and the
    /// `CRS84` aliases.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownCrs`] when the name matches none of these.
    pub fn parse(name: &str) -> Result<Self, FormatError> {
        let unknown = || FormatError::UnknownCrs {
            name: name.to_string(),
        };
        let trimmed = name.trim();
        let lower = trimmed.to_ascii_lowercase();

        let last_segment = lower
            .rsplit(|c| c == ':' || c == '/')
            .next()
            .unwrap_or_default();
        if last_segment == "crs84" {
            return Ok(Self::WGS84);
        }

        let is_epsg = lower.starts_with("epsg:")
            || lower.starts_with("urn:ogc:def:crs:epsg:")
            || (lower.starts_with("http") && lower.contains("/def/crs/epsg/"));
        if !is_epsg {
            return Err(unknown());
        }

        let code: u32 = last_segment.parse().map_err(|_| unknown())?;
        if WEB_MERCATOR_ALIASES.contains(&code) {
            return Ok(Self::from_epsg(3857));
        }
        Ok(Self::from_epsg(code))
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Projection {
    proj: Proj,
    geographic: bool,
}

impl Projection {
    fn for_crs(crs: Crs) -> Result<Self, TransformError> {
        let failed = |message: String| TransformError::Reprojection {
            crs: crs.to_string(),
            message,
        };

        let code = u16::try_from(crs.epsg())
            .map_err(|_| failed("EPSG code is outside the catalogue range".to_string()))?;
        let definition = crs_definitions::from_code(code)
            .ok_or_else(|| failed("EPSG code is not in the catalogue".to_string()))?;
        let proj = Proj::from_proj_string(definition.proj4)
            .map_err(|err| failed(format!("invalid definition: {err}")))?;
        let geographic = definition.proj4.contains("+proj=longlat")
            || definition.proj4.contains("+proj=latlong");

        Ok(Self { proj, geographic })
    }
}

/// Transforms coordinates from one CRS into WGS84 longitude/latitude degrees.
pub struct Reprojector {
    source_crs: Crs,
    source: Projection,
    target: Projection,
}

impl Reprojector {
    /// Build a reprojector from `source` to EPSG:4326.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Reprojection`] if either definition is missing
    /// from the catalogue or cannot be parsed.
    pub fn to_wgs84(source: Crs) -> Result<Self, TransformError> {
        Ok(Self {
            source_crs: source,
            source: Projection::for_crs(source)?,
            target: Projection::for_crs(Crs::WGS84)?,
        })
    }

    /// Transform one coordinate. `x` is easting/longitude, `y` northing/latitude.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Reprojection`] if the coordinate cannot be
    /// transformed.
    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError> {
        let (x, y) = if self.source.geographic {
            (coord.x.to_radians(), coord.y.to_radians())
        } else {
            (coord.x, coord.y)
        };

        let mut point = (x, y, 0.0);
        proj4rs::transform::transform(&self.source.proj, &self.target.proj, &mut point).map_err(
            |err| TransformError::Reprojection {
                crs: self.source_crs.to_string(),
                message: format!("({}, {}): {err}", coord.x, coord.y),
            },
        )?;

        if self.target.geographic {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }

    /// Transform every coordinate of a geometry.
    ///
    /// # Errors
    ///
    /// Returns the first coordinate failure.
    pub fn transform_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> Result<Geometry<f64>, TransformError> {
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("source", &self.source_crs)
            .field("target", &Crs::WGS84)
            .finish()
    }
}
