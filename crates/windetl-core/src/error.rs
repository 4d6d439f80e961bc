//! Error types for `WindETL` operations.
//!
//! Each pipeline stage has its own error enum; [`WindEtlError`] is the root
//! type that stage functions return. Whether an error is fatal is decided by
//! the stage boundary, not here: fetch and export failures are logged and
//! swallowed, raw-save and transform failures propagate.

use std::path::PathBuf;
use thiserror::Error;
use windetl_formats_shared::FormatReadError;

/// Main error type for `WindETL` operations.
///
/// Uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum WindEtlError {
    /// Feature-service request errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// I/O errors (file read/write, directory creation)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Document parsing errors
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Reprojection and coordinate derivation errors
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised while requesting a page from the feature service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or timed out
    #[error("Request for offset {offset} failed: {source}")]
    Request {
        /// Result offset of the failed page
        offset: usize,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("Service returned HTTP {status} for offset {offset}")]
    Status {
        /// Result offset of the failed page
        offset: usize,
        /// The HTTP status code
        status: u16,
    },

    /// The response body was not a usable `GeoJSON` page
    #[error("Could not decode page at offset {offset}: {message}")]
    Decode {
        /// Result offset of the failed page
        offset: usize,
        /// Description of the decoding problem
        message: String,
    },
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// A parent directory could not be created
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The directory path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g., "`GeoJSON`")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File was not found
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
    },
}

/// Document parsing errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The format crate rejected the document
    #[error(transparent)]
    Parse(#[from] FormatReadError),

    /// The declared CRS is not one we can interpret
    #[error("Unrecognised coordinate reference system '{name}'")]
    UnknownCrs {
        /// The CRS name as written in the document
        name: String,
    },
}

/// Errors from the transform stage.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The CRS definition is unknown or a coordinate failed to transform
    #[error("Cannot reproject from {crs} to EPSG:4326: {message}")]
    Reprojection {
        /// Source CRS
        crs: String,
        /// Description of the failure
        message: String,
    },

    /// Latitude/longitude are only derived from point geometries
    #[error("Row {row} has a {geometry_type} geometry; expected a Point")]
    NotAPoint {
        /// Zero-based row index
        row: usize,
        /// The geometry type found
        geometry_type: &'static str,
    },

    /// A derived coordinate is outside the geographic range
    #[error("Row {row} reprojects to latitude {latitude}, longitude {longitude}, outside WGS84 bounds")]
    OutOfBounds {
        /// Zero-based row index
        row: usize,
        /// Derived latitude
        latitude: f64,
        /// Derived longitude
        longitude: f64,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Type alias for Results using `WindEtlError`.
pub type Result<T> = std::result::Result<T, WindEtlError>;

impl WindEtlError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(e) => format!("Fetch error: {e}"),
            Self::Io(e) => e.user_message(),
            Self::Format(e) => format!("Format error: {e}"),
            Self::Transform(e) => format!("Transform error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Fetch(_) => {
                Some("Check network access to the feature service and retry.".to_string())
            },
            Self::Io(e) => e.recovery_suggestion(),
            Self::Transform(TransformError::Reprojection { .. }) => Some(
                "The stored document declares a CRS the projection catalogue does not know."
                    .to_string(),
            ),
            Self::Config(_) => Some("Run 'windetl --help' to see accepted options.".to_string()),
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by rerunning with different
    /// parameters or after the user takes some action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Fetch(_))
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::Write { format, path, .. } => {
                format!("Failed to write {} file: {}", format, path.display())
            },
            Self::FileNotFound { path } => {
                format!("File not found: {}", path.display())
            },
            Self::CreateDir { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::FileNotFound { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::CreateDir { .. } | Self::Write { .. } => {
                Some("Check that the data directory is writable.".to_string())
            },
            Self::Read { .. } => None,
        }
    }
}

/// Extension trait for adding I/O context to errors.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            WindEtlError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            WindEtlError::Io(IoError::Write {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}

/// Create the parent directory of `path` if it has one.
///
/// # Errors
///
/// Returns [`IoError::CreateDir`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|source| {
                IoError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                }
                .into()
            }),
        _ => Ok(()),
    }
}
