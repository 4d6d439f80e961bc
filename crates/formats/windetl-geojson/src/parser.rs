//! `GeoJSON` parsing into flat feature records.

use std::convert::TryInto;

use geo_types::Geometry;
use geojson::{
    Feature, FeatureCollection, GeoJson, Geometry as GeoJsonGeometry, JsonObject, JsonValue,
};
use windetl_formats_shared::{FormatReadError, FormatResult, SourcePosition};

/// Parsed `GeoJSON` feature with materialized properties and geometry.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub properties: JsonObject,
    pub geometry: Option<Geometry<f64>>,
}

/// Everything the loader needs from a `GeoJSON` document.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonDocument {
    /// One record per feature, in document order.
    pub records: Vec<FeatureRecord>,
    /// Name from a legacy (2008) `crs` member, if the document declares one.
    pub crs_name: Option<String>,
}

impl GeoJsonDocument {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse raw bytes into a [`GeoJsonDocument`].
///
/// The bytes are first read as a single `GeoJSON` object (collection, feature
/// or bare geometry). If that fails they are retried as a newline-delimited
/// sequence; when both fail the two messages are combined.
pub fn parse_geojson_bytes(
    bytes: &[u8],
    context: impl Into<String>,
) -> FormatResult<GeoJsonDocument> {
    let context = context.into();
    let reader = std::io::Cursor::new(bytes);

    match GeoJson::from_reader(reader) {
        Ok(geojson) => geojson_to_document(geojson, &context),
        Err(primary_err) => {
            let primary_err_message = primary_err.to_string();
            match parse_geojson_sequence(bytes, &context) {
                Ok(document) => Ok(document),
                Err(sequence_err) => {
                    Err(combine_errors(&primary_err_message, &sequence_err, context))
                },
            }
        },
    }
}

fn geojson_to_document(geojson: GeoJson, context: &str) -> FormatResult<GeoJsonDocument> {
    match geojson {
        GeoJson::FeatureCollection(collection) => collection_to_document(collection, context),
        GeoJson::Feature(feature) => {
            let crs_name = crs_name(feature.foreign_members.as_ref(), context)?;
            Ok(GeoJsonDocument {
                records: vec![feature_to_record(feature, context, 1)?],
                crs_name,
            })
        },
        GeoJson::Geometry(geometry) => {
            let geometry = convert_geometry(geometry, context, None)?;
            Ok(GeoJsonDocument {
                records: vec![FeatureRecord {
                    properties: JsonObject::new(),
                    geometry: Some(geometry),
                }],
                crs_name: None,
            })
        },
    }
}

fn collection_to_document(
    collection: FeatureCollection,
    context: &str,
) -> FormatResult<GeoJsonDocument> {
    let crs_name = crs_name(collection.foreign_members.as_ref(), context)?;
    let records = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| feature_to_record(feature, context, idx as u64 + 1))
        .collect::<FormatResult<Vec<_>>>()?;

    Ok(GeoJsonDocument { records, crs_name })
}

fn feature_to_record(feature: Feature, context: &str, index: u64) -> FormatResult<FeatureRecord> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(convert_geometry(geometry, context, Some(index))?),
        None => None,
    };

    let properties = feature.properties.unwrap_or_default();

    Ok(FeatureRecord {
        properties,
        geometry,
    })
}

fn convert_geometry(
    geometry: GeoJsonGeometry,
    context: &str,
    feature: Option<u64>,
) -> FormatResult<Geometry<f64>> {
    geometry.try_into().map_err(|err| FormatReadError::Parse {
        message: format!("Failed to convert GeoJSON geometry: {err}"),
        position: feature.map(SourcePosition::at_feature),
        context: Some(context.to_string()),
    })
}

/// Reads the name out of a legacy `"crs": {"type": "name", ...}` member.
fn crs_name(foreign_members: Option<&JsonObject>, context: &str) -> FormatResult<Option<String>> {
    let Some(crs) = foreign_members.and_then(|members| members.get("crs")) else {
        return Ok(None);
    };

    if crs.is_null() {
        return Ok(None);
    }

    let kind = crs.get("type").and_then(JsonValue::as_str);
    let name = crs
        .get("properties")
        .and_then(|props| props.get("name"))
        .and_then(JsonValue::as_str);

    match (kind, name) {
        (Some("name"), Some(name)) => Ok(Some(name.to_string())),
        (Some(other), _) if other != "name" => Err(FormatReadError::parse(
            format!("Unsupported crs member of type '{other}'"),
            context,
        )),
        _ => Err(FormatReadError::parse(
            format!("Malformed crs member: expected a named crs, found {}", describe_value(crs)),
            context,
        )),
    }
}

fn parse_geojson_sequence(bytes: &[u8], context: &str) -> FormatResult<GeoJsonDocument> {
    let mut document = GeoJsonDocument::default();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = (line_idx + 1) as u64;
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(err) => {
                return Err(FormatReadError::Parse {
                    message: format!("GeoJSON line is not valid UTF-8: {err}"),
                    position: Some(SourcePosition::at_line(line_number)),
                    context: Some(context.to_string()),
                });
            },
        };

        if line.is_empty() {
            continue;
        }

        let geojson = line
            .parse::<GeoJson>()
            .map_err(|err| FormatReadError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                position: Some(SourcePosition::at_line(line_number)),
                context: Some(context.to_string()),
            })?;

        let mut parsed = geojson_to_document(geojson, context)?;
        if document.crs_name.is_none() {
            document.crs_name = parsed.crs_name.take();
        }
        document.records.append(&mut parsed.records);
    }

    if document.records.is_empty() {
        Err(FormatReadError::parse("No GeoJSON features found", context))
    } else {
        Ok(document)
    }
}

fn combine_errors(
    collection_err: &str,
    sequence_err: &FormatReadError,
    context: String,
) -> FormatReadError {
    let message = format!(
        "Failed to parse GeoJSON as FeatureCollection ({collection_err}); \
         also failed to parse as GeoJSON sequence: {sequence_err}"
    );
    FormatReadError::Parse {
        message,
        position: None,
        context: Some(context),
    }
}

/// Helper to describe JSON value kinds for error messages.
pub(crate) fn describe_value(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
