//! `windetl-core` extracts the ANEEL wind-turbine layer from its feature
//! service and flattens it into a CSV.
//!
//! The stages run strictly in order:
//! - **Fetch** ([`fetch`]): page through the service until an empty page.
//! - **Store** ([`store`]): persist the raw `GeoJSON` and load it back as a [`GeoTable`].
//! - **Transform** ([`transform`]): drop duplicates and rows without geometry,
//!   reproject to EPSG:4326 and add `LATITUDE`/`LONGITUDE`.
//! - **Export** ([`export`]): write the table as CSV minus a fixed drop set.
//!
//! [`Pipeline`] sequences them; [`PipelineConfig`] carries every setting.

pub mod config;
pub mod crs;
pub mod error;
pub mod export;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod transform;
pub mod types;

pub use config::{ExportConfig, FetchConfig, PipelineConfig};
pub use crs::{Crs, Reprojector};
pub use error::{Result, WindEtlError};
pub use export::{ExportReport, export_csv, try_export_csv};
pub use fetch::{FetchReport, FetchStop, HttpPageSource, PageSource, fetch_geojson, paginate};
pub use pipeline::{AbortReason, Pipeline, PipelineOutcome, RunSummary, process_raw};
pub use store::{load_geojson, save_geojson, try_load_geojson};
pub use transform::{CleanReport, add_lat_lon, validate_clean};
pub use types::{Column, ColumnType, GeoRow, GeoTable, Value};
