//! Flat CSV export of the transformed table.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use windetl_csv::{CsvWriterOptions, write_csv};

use crate::config::ExportConfig;
use crate::error::{IoErrorExt, Result, ensure_parent_dir};
use crate::types::GeoTable;

const FORMAT: &str = "CSV";

/// What a successful export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    /// Column names in output order
    pub columns: Vec<String>,
}

/// Write `table` to `path` as a headed CSV, minus the configured drop set.
///
/// Geometry is never written. Nulls become `config.null_value`.
///
/// # Errors
///
/// Returns an I/O error if the directory or file cannot be written.
pub fn try_export_csv(table: &GeoTable, path: &Path, config: &ExportConfig) -> Result<ExportReport> {
    let kept: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| !config.drops(&column.name))
        .map(|(idx, _)| idx)
        .collect();
    let header: Vec<String> = kept
        .iter()
        .map(|&idx| table.columns()[idx].name.clone())
        .collect();
    debug!(
        "Exporting {} of {} columns",
        header.len(),
        table.columns().len()
    );

    ensure_parent_dir(path)?;
    let file = File::create(path).with_write_context(FORMAT, path)?;

    let options = CsvWriterOptions::new()
        .with_delimiter(config.delimiter)
        .with_null_value(config.null_value.clone())
        .with_quote_all(config.quote_all);
    let rows = table
        .rows()
        .iter()
        .map(|row| kept.iter().map(|&idx| row.values[idx].render()).collect());
    let written =
        write_csv(BufWriter::new(file), &header, rows, &options).with_write_context(FORMAT, path)?;

    info!("CSV exported to {}", path.display());
    Ok(ExportReport {
        path: path.to_path_buf(),
        rows: written,
        columns: header,
    })
}

/// Export `table`, logging and discarding any failure.
///
/// `None` means no file was produced; the pipeline still finishes.
#[must_use]
pub fn export_csv(table: &GeoTable, path: &Path, config: &ExportConfig) -> Option<ExportReport> {
    match try_export_csv(table, path, config) {
        Ok(report) => Some(report),
        Err(err) => {
            error!("Error exporting CSV: {err}");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::types::{Column, ColumnType, Value};
    use geo_types::Point;

    fn sample() -> GeoTable {
        let mut table = GeoTable::new(
            vec![
                Column::new("NOME_EOL", ColumnType::Text),
                Column::new("X", ColumnType::Float),
                Column::new("POT_MW", ColumnType::Float),
                Column::new("VERSAO", ColumnType::Text),
                Column::new("OPERACAO", ColumnType::Boolean),
            ],
            Crs::WGS84,
        );
        table
            .push_row(
                vec![
                    Value::Text("Ventos, do Sul".into()),
                    Value::Float(123.0),
                    Value::Float(2.0),
                    Value::Text("v1".into()),
                    Value::Boolean(true),
                ],
                Some(Point::new(-50.0, -30.0).into()),
            )
            .unwrap();
        table
            .push_row(
                vec![
                    Value::Text("Caetité".into()),
                    Value::Null,
                    Value::Float(3.6),
                    Value::Null,
                    Value::Null,
                ],
                Some(Point::new(-42.5, -14.0).into()),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_export_drops_columns() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("processed").join("outputs.csv");

        let report = try_export_csv(&sample(), &path, &ExportConfig::default()).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, vec!["NOME_EOL", "POT_MW", "OPERACAO"]);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NOME_EOL,POT_MW,OPERACAO");
        assert_eq!(lines[1], "\"Ventos, do Sul\",2.0,True");
        assert_eq!(lines[2], "Caetité,3.6,");
        assert!(!text.contains("VERSAO"));
        assert!(!text.contains("geometry"));
    }

    #[test]
    fn test_export_absent_drop_columns_are_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out.csv");
        let config = ExportConfig {
            drop_columns: vec!["NOT_THERE".to_string()],
            delimiter: b';',
            null_value: "NA".to_string(),
            quote_all: false,
        };

        let report = try_export_csv(&sample(), &path, &config).unwrap();
        assert_eq!(report.columns.len(), 5);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("NOME_EOL;X;POT_MW;VERSAO;OPERACAO\n"));
        assert!(text.contains("Caetité;NA;3.6;NA;NA"));
    }

    #[test]
    fn test_export_quote_all() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("quoted.csv");
        let config = ExportConfig {
            quote_all: true,
            ..ExportConfig::default()
        };

        try_export_csv(&sample(), &path, &config).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\"NOME_EOL\",\"POT_MW\",\"OPERACAO\"");
        assert_eq!(lines[1], "\"Ventos, do Sul\",\"2.0\",\"True\"");
        assert_eq!(lines[2], "\"Caetité\",\"3.6\",\"\"");
    }

    #[test]
    fn test_export_empty_table_writes_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.csv");
        let table = GeoTable::new(vec![Column::new("UF", ColumnType::Text)], Crs::WGS84);

        let report = export_csv(&table, &path, &ExportConfig::default()).unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "UF\n");
    }

    #[test]
    fn test_export_failure_is_absent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let path = blocker.join("outputs.csv");

        assert!(export_csv(&sample(), &path, &ExportConfig::default()).is_none());
        assert!(!path.exists());
    }
}
