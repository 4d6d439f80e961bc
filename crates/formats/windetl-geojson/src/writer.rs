//! `GeoJSON` writer for persisting fetched feature collections.

use std::io::Write as IoWrite;

use geojson::FeatureCollection;
use windetl_formats_shared::{FormatReadError, FormatResult};

/// Write a feature collection as a `GeoJSON` document.
///
/// Members are indented with two spaces and the document has no trailing
/// newline. Non-ASCII text is written as UTF-8, never `\u` escaped, and
/// property order is kept as it was fetched.
///
/// # Errors
///
/// Returns an error if serialization fails or the writer rejects the bytes.
pub fn write_geojson<W: IoWrite>(
    writer: &mut W,
    collection: &FeatureCollection,
) -> FormatResult<()> {
    serde_json::to_writer_pretty(&mut *writer, collection).map_err(|err| FormatReadError::Other {
        message: format!("Failed to serialize GeoJSON: {err}"),
    })?;
    writer.flush()?;
    Ok(())
}
