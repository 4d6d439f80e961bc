//! Pipeline configuration.
//!
//! All defaults describe the ANEEL SIGEL wind-turbine layer and the fixed
//! artifact locations; callers override individual values with the `with_*`
//! builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Feature-service query endpoint for the wind-turbine layer.
pub const DEFAULT_ENDPOINT: &str =
    "https://sigel.aneel.gov.br/arcgis/rest/services/PORTAL/WFS/MapServer/0/query";

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the fetched collection is persisted.
pub const DEFAULT_RAW_PATH: &str = "data/raw/aerogeradores.geojson";

/// Where the flattened table is written.
pub const DEFAULT_PROCESSED_PATH: &str = "data/processed/outputs.csv";

/// Columns removed before export.
pub const DEFAULT_DROP_COLUMNS: [&str; 4] = ["X", "Y", "VERSAO", "geometry"];

/// Settings for the paginated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Feature-service query URL
    pub endpoint: String,
    /// Records requested per page (`resultRecordCount`)
    pub page_size: usize,
    /// Timeout applied to each request
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Settings for the CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Column names dropped when present; matching is exact
    pub drop_columns: Vec<String>,
    /// Column delimiter
    pub delimiter: u8,
    /// Text written for null cells
    pub null_value: String,
    /// Quote every field, not only those containing the delimiter or quotes
    pub quote_all: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(ToString::to_string).collect(),
            delimiter: b',',
            null_value: String::new(),
            quote_all: false,
        }
    }
}

impl ExportConfig {
    /// Returns `true` if `column` is in the drop set.
    #[must_use]
    pub fn drops(&self, column: &str) -> bool {
        self.drop_columns.iter().any(|c| c == column)
    }
}

/// Full configuration handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub raw_path: PathBuf,
    pub processed_path: PathBuf,
    pub export: ExportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Configuration with every default applied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fetch: FetchConfig::default(),
            raw_path: PathBuf::from(DEFAULT_RAW_PATH),
            processed_path: PathBuf::from(DEFAULT_PROCESSED_PATH),
            export: ExportConfig::default(),
        }
    }

    /// Set the feature-service endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.fetch.endpoint = endpoint.into();
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.fetch.page_size = page_size;
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch.timeout = timeout;
        self
    }

    /// Set the raw `GeoJSON` path
    #[must_use]
    pub fn with_raw_path(mut self, path: impl AsRef<Path>) -> Self {
        self.raw_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the processed CSV path
    #[must_use]
    pub fn with_processed_path(mut self, path: impl AsRef<Path>) -> Self {
        self.processed_path = path.as_ref().to_path_buf();
        self
    }

    /// Place both artifacts under `dir`, keeping their default relative layout.
    #[must_use]
    pub fn with_data_root(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.with_raw_path(dir.join(DEFAULT_RAW_PATH))
            .with_processed_path(dir.join(DEFAULT_PROCESSED_PATH))
    }

    /// Replace the export settings
    #[must_use]
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for an empty endpoint, a zero
    /// page size or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.endpoint.trim().is_empty() {
            return Err(invalid("endpoint", "must not be empty"));
        }
        if self.fetch.page_size == 0 {
            return Err(invalid("page_size", "must be greater than zero"));
        }
        if self.fetch.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(option: &str, message: &str) -> crate::error::WindEtlError {
    ConfigError::InvalidOption {
        option: option.to_string(),
        message: message.to_string(),
    }
    .into()
}
