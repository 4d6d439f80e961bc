//! `GeoJSON` support for the `WindETL` pipeline.
//!
//! The parser turns a stored document into flat [`FeatureRecord`]s plus the
//! document's declared CRS name; the writer persists a fetched
//! [`geojson::FeatureCollection`] as indented UTF-8.

pub mod parser;
pub mod writer;

pub use parser::{FeatureRecord, GeoJsonDocument, parse_geojson_bytes};
pub use writer::write_geojson;
