//! Raw `GeoJSON` persistence and loading into a [`GeoTable`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use geojson::FeatureCollection;
use log::{error, info};
use windetl_geojson::{GeoJsonDocument, parse_geojson_bytes, write_geojson};

use crate::crs::Crs;
use crate::error::{FormatError, IoError, IoErrorExt, Result, ensure_parent_dir};
use crate::types::{Column, ColumnType, GeoTable, Value};

const FORMAT: &str = "GeoJSON";

/// Write `collection` to `path` as indented UTF-8 `GeoJSON`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns an [`IoError`] if the directory cannot be created or the file
/// cannot be written. Callers treat this as fatal.
pub fn save_geojson(collection: &FeatureCollection, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;

    let file = File::create(path).with_write_context(FORMAT, path)?;
    let mut writer = BufWriter::new(file);
    write_geojson(&mut writer, collection).with_write_context(FORMAT, path)?;

    info!(
        "GeoJSON saved to {} ({} features)",
        path.display(),
        collection.features.len()
    );
    Ok(())
}

/// Load the `GeoJSON` document at `path` into a table.
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, the document does
/// not parse, or its `crs` member names an unrecognised CRS.
pub fn try_load_geojson(path: &Path) -> Result<GeoTable> {
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let bytes = std::fs::read(path).with_read_context(FORMAT, path)?;
    let document =
        parse_geojson_bytes(&bytes, path.display().to_string()).map_err(FormatError::from)?;
    let table = table_from_document(document)?;

    info!("Table loaded with {} records.", table.len());
    Ok(table)
}

/// Load the `GeoJSON` document at `path`, logging and discarding any error.
///
/// `None` means the document could not be read; callers treat it the same as
/// an empty table.
#[must_use]
pub fn load_geojson(path: &Path) -> Option<GeoTable> {
    match try_load_geojson(path) {
        Ok(table) => Some(table),
        Err(err) => {
            error!("Failed to load GeoJSON: {err}");
            None
        },
    }
}

/// Build a table from parsed records.
///
/// Columns are the union of property names in first-seen order; each
/// column's type is inferred from all of its values. The CRS comes from the
/// document's `crs` member, defaulting to EPSG:4326.
///
/// # Errors
///
/// Returns [`FormatError::UnknownCrs`] for an unrecognised `crs` name.
pub fn table_from_document(document: GeoJsonDocument) -> Result<GeoTable> {
    let crs = match document.crs_name.as_deref() {
        Some(name) => Crs::parse(name)?,
        None => Crs::default(),
    };

    let mut names: Vec<String> = Vec::new();
    for record in &document.records {
        for key in record.properties.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let raw_rows: Vec<Vec<Value>> = document
        .records
        .iter()
        .map(|record| {
            names
                .iter()
                .map(|name| record.properties.get(name).map_or(Value::Null, Value::from_json))
                .collect()
        })
        .collect();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let column_type = ColumnType::infer(raw_rows.iter().map(|row| &row[idx]));
            Column::new(name, column_type)
        })
        .collect();

    let mut table = GeoTable::new(columns, crs);
    for (values, record) in raw_rows.into_iter().zip(document.records) {
        table.push_row(values, record.geometry)?;
    }
    Ok(table)
}
