//! Error and position types shared by the `WindETL` format crates.

use std::error::Error as StdError;
use std::fmt;

/// A position within a source document, such as a line of a GeoJSON sequence.
///
/// All indices are 1-based to align with what editors display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Feature index within a collection (1-based)
    pub feature: Option<u64>,
}

impl SourcePosition {
    /// Position pointing at a single line.
    #[must_use]
    pub fn at_line(line: u64) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    /// Position pointing at a feature inside a collection.
    #[must_use]
    pub fn at_feature(feature: u64) -> Self {
        Self {
            feature: Some(feature),
            ..Self::default()
        }
    }

    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.feature.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(feature) = self.feature {
            parts.push(format!("feature {feature}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors raised while reading or writing one of the pipeline's file formats.
#[derive(Debug)]
pub enum FormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// The document could not be parsed.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Other error type not classified above.
    Other {
        /// Human readable description of the failure.
        message: String,
    },
}

impl FormatReadError {
    /// Shorthand for a parse error without position information.
    #[must_use]
    pub fn parse(message: impl Into<String>, context: impl Into<String>) -> Self {
        FormatReadError::Parse {
            message: message.into(),
            position: None,
            context: Some(context.into()),
        }
    }

    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position
            .filter(|pos| !pos.is_empty())
            .map(|pos| format!(" at {pos}"))
            .unwrap_or_default()
    }
}

impl fmt::Display for FormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            FormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            FormatReadError::Other { message } => f.write_str(message),
        }
    }
}

impl StdError for FormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FormatReadError::Io { source, .. } => Some(source),
            FormatReadError::Parse { .. } | FormatReadError::Other { .. } => None,
        }
    }
}

impl From<std::io::Error> for FormatReadError {
    fn from(source: std::io::Error) -> Self {
        FormatReadError::Io {
            source,
            context: None,
        }
    }
}

/// Result type alias that uses [`FormatReadError`].
pub type FormatResult<T> = Result<T, FormatReadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_source_position() {
        let pos = SourcePosition {
            line: Some(10),
            feature: Some(3),
        };

        assert_eq!(pos.to_string(), "line 10, feature 3");
    }

    #[test]
    fn display_empty_position() {
        assert!(SourcePosition::default().is_empty());
        assert_eq!(SourcePosition::default().to_string(), "unknown position");
    }

    #[test]
    fn display_parse_error_with_context() {
        let error = FormatReadError::Parse {
            message: "expected value".to_string(),
            position: Some(SourcePosition::at_feature(7)),
            context: Some("data/raw/aerogeradores.geojson".to_string()),
        };

        assert_eq!(
            error.to_string(),
            "Parse error while reading data/raw/aerogeradores.geojson at feature 7: expected value"
        );
    }

    #[test]
    fn io_error_exposes_source() {
        let error = FormatReadError::from(std::io::Error::other("disk gone"));
        assert!(error.source().is_some());
        assert_eq!(error.to_string(), "I/O error: disk gone");
    }
}
