//! Display utilities for formatting CLI output.

use tabled::{Table, Tabled};

use windetl_core::RunSummary;

/// One line of the run summary table.
#[derive(Tabled)]
pub struct StageRow {
    #[tabled(rename = "Stage")]
    pub stage: String,
    /// Record count after the stage, or the artifact it produced.
    #[tabled(rename = "Result")]
    pub result: String,
}

impl StageRow {
    fn new(stage: &str, result: impl ToString) -> Self {
        Self {
            stage: stage.to_string(),
            result: result.to_string(),
        }
    }
}

/// Build the summary rows for a completed run.
#[must_use]
pub fn summary_rows(summary: &RunSummary) -> Vec<StageRow> {
    let fetched = summary
        .fetched
        .map_or_else(|| "skipped".to_string(), |n| n.to_string());
    let exported = match &summary.exported {
        Some(report) => format!(
            "{} rows, {} columns -> {}",
            report.rows,
            report.columns.len(),
            report.path.display()
        ),
        None => "failed (see log)".to_string(),
    };

    vec![
        StageRow::new("Fetched", fetched),
        StageRow::new("Raw GeoJSON", summary.raw_path.display()),
        StageRow::new("Loaded", summary.loaded),
        StageRow::new("Cleaned", summary.cleaned),
        StageRow::new("Removed", summary.removed),
        StageRow::new("Exported", exported),
    ]
}

/// Print the run summary to standard output.
pub fn display_summary(summary: &RunSummary) {
    println!("\n=== Run Summary ===");
    let table = Table::new(summary_rows(summary)).to_string();
    println!("{table}");
}
