//! Cleaning and coordinate derivation.

use std::collections::HashSet;

use geo_types::Geometry;
use log::{debug, info};

use crate::crs::{Crs, Reprojector};
use crate::error::{Result, TransformError};
use crate::types::{ColumnType, GeoTable, Value, geometry_type_name};

/// Name of the derived latitude column.
pub const LATITUDE_COLUMN: &str = "LATITUDE";
/// Name of the derived longitude column.
pub const LONGITUDE_COLUMN: &str = "LONGITUDE";

/// Row counts around [`validate_clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanReport {
    pub before: usize,
    pub after: usize,
}

impl CleanReport {
    #[must_use]
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

/// Drop exact duplicate rows and rows without geometry.
///
/// Two rows are duplicates when every attribute and the geometry are equal;
/// the first occurrence is kept and relative order is preserved.
#[must_use]
pub fn validate_clean(mut table: GeoTable) -> (GeoTable, CleanReport) {
    let before = table.len();

    let mut seen = HashSet::with_capacity(before);
    table.retain_rows(|row| seen.insert(row.dedup_key()));
    let after_dedup = table.len();

    table.retain_rows(|row| row.geometry.is_some());
    let after = table.len();

    debug!(
        "Removed {} duplicates and {} rows without geometry",
        before - after_dedup,
        after_dedup - after
    );
    let report = CleanReport { before, after };
    info!(
        "Records after cleaning: {} (removed {})",
        report.after,
        report.removed()
    );
    (table, report)
}

/// Reproject geometries to EPSG:4326 and add `LATITUDE`/`LONGITUDE` columns.
///
/// Latitude is the point's Y and longitude its X after reprojection. Rows
/// without geometry get nulls. Existing coordinate columns are overwritten.
///
/// # Errors
///
/// Fails if the table's CRS cannot be reprojected, a geometry is not a point,
/// or a derived coordinate is outside the geographic range.
pub fn add_lat_lon(mut table: GeoTable) -> Result<GeoTable> {
    if !table.crs().is_wgs84() {
        info!("Reprojecting {} rows from {} to EPSG:4326", table.len(), table.crs());
        let reprojector = Reprojector::to_wgs84(table.crs())?;
        for row in table.rows_mut() {
            if let Some(geometry) = &row.geometry {
                row.geometry = Some(reprojector.transform_geometry(geometry)?);
            }
        }
        table.set_crs(Crs::WGS84);
    }

    let mut latitudes = Vec::with_capacity(table.len());
    let mut longitudes = Vec::with_capacity(table.len());
    for (idx, row) in table.rows().iter().enumerate() {
        match &row.geometry {
            Some(Geometry::Point(point)) => {
                let (longitude, latitude) = (point.x(), point.y());
                if !in_bounds(latitude, longitude) {
                    return Err(TransformError::OutOfBounds {
                        row: idx,
                        latitude,
                        longitude,
                    }
                    .into());
                }
                latitudes.push(Value::Float(latitude));
                longitudes.push(Value::Float(longitude));
            },
            Some(other) => {
                return Err(TransformError::NotAPoint {
                    row: idx,
                    geometry_type: geometry_type_name(other),
                }
                .into());
            },
            None => {
                latitudes.push(Value::Null);
                longitudes.push(Value::Null);
            },
        }
    }

    table.set_column(LATITUDE_COLUMN, ColumnType::Float, latitudes)?;
    table.set_column(LONGITUDE_COLUMN, ColumnType::Float, longitudes)?;
    Ok(table)
}

fn in_bounds(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}
