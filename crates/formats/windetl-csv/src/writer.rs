//! CSV writer for flattened attribute tables

use std::io::Write as IoWrite;

use csv::{QuoteStyle, WriterBuilder};
use windetl_formats_shared::{FormatReadError, FormatResult};

/// Options for CSV writing
#[derive(Debug, Clone)]
pub struct CsvWriterOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
    /// Null value representation (default: empty string)
    pub null_value: String,
    /// Quote every field instead of only those that need it (default: false)
    pub quote_all: bool,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_value: String::new(),
            quote_all: false,
        }
    }
}

impl CsvWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set column delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set null value representation
    #[must_use]
    pub fn with_null_value(mut self, null_value: impl Into<String>) -> Self {
        self.null_value = null_value.into();
        self
    }

    /// Set whether every field is quoted
    #[must_use]
    pub fn with_quote_all(mut self, quote_all: bool) -> Self {
        self.quote_all = quote_all;
        self
    }
}

fn csv_error(err: csv::Error) -> FormatReadError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => FormatReadError::Io {
            source,
            context: Some("CSV output".to_string()),
        },
        other => FormatReadError::Other {
            message: format!("Failed to write CSV record: {other:?}"),
        },
    }
}

/// Write a header and rows of optional cells as delimited text.
///
/// The header row is always written, even when `rows` is empty. `None` cells
/// are written as [`CsvWriterOptions::null_value`]. Returns the number of
/// data rows written.
///
/// # Errors
///
/// Returns an error if a row has a different width than the header or if
/// writing to the output fails.
pub fn write_csv<W, R>(
    writer: W,
    header: &[String],
    rows: R,
    options: &CsvWriterOptions,
) -> FormatResult<usize>
where
    W: IoWrite,
    R: IntoIterator<Item = Vec<Option<String>>>,
{
    let quote_style = if options.quote_all {
        QuoteStyle::Always
    } else {
        QuoteStyle::Necessary
    };

    let mut csv_writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(quote_style)
        .from_writer(writer);

    csv_writer.write_record(header).map_err(csv_error)?;

    let mut written = 0;
    for (idx, row) in rows.into_iter().enumerate() {
        if row.len() != header.len() {
            return Err(FormatReadError::Other {
                message: format!(
                    "Row {} has {} cells but the header has {} columns",
                    idx + 1,
                    row.len(),
                    header.len()
                ),
            });
        }
        let record = row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(options.null_value.as_str()));
        csv_writer.write_record(record).map_err(csv_error)?;
        written += 1;
    }

    csv_writer.flush()?;
    Ok(written)
}
