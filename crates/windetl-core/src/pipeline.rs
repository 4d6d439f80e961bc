//! The fixed fetch, save, load, transform, export sequence.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::export::{ExportReport, export_csv};
use crate::fetch::{HttpPageSource, PageSource, paginate};
use crate::store::{load_geojson, save_geojson};
use crate::transform::{add_lat_lon, validate_clean};

/// Why a run stopped before exporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The service returned no features.
    NoData,
    /// The raw document was missing, unreadable or had no rows.
    EmptyTable,
}

impl AbortReason {
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            AbortReason::NoData => "No data fetched. Pipeline finished early.",
            AbortReason::EmptyTable => "Loaded table is empty or invalid. Pipeline aborted.",
        }
    }
}

/// Counts and artifacts from a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Features fetched; `None` when the run started from an existing raw file
    pub fetched: Option<usize>,
    pub loaded: usize,
    pub cleaned: usize,
    pub removed: usize,
    /// `None` if the export failed
    pub exported: Option<ExportReport>,
    pub raw_path: PathBuf,
    pub processed_path: PathBuf,
}

/// How a run ended. Both variants are normal terminations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed(RunSummary),
    Aborted(AbortReason),
}

impl PipelineOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }
}

/// Runs the stages in order against a [`PageSource`].
#[derive(Debug)]
pub struct Pipeline<S = HttpPageSource> {
    config: PipelineConfig,
    source: S,
}

impl Pipeline<HttpPageSource> {
    /// Pipeline that fetches over HTTP from `config.fetch.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let source = HttpPageSource::new(&config.fetch)?;
        Ok(Self { config, source })
    }
}

impl<S: PageSource> Pipeline<S> {
    /// Pipeline that pages through `source` instead of the configured endpoint.
    pub fn with_source(config: PipelineConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Run every stage.
    ///
    /// An empty fetch or an empty raw table ends the run early with
    /// [`PipelineOutcome::Aborted`]; nothing after that point runs.
    ///
    /// # Errors
    ///
    /// Fails if the raw document cannot be saved or the transform rejects
    /// the table. Fetch, load and export problems are logged instead.
    pub fn run(&self) -> Result<PipelineOutcome> {
        info!("Step 1: Fetching data...");
        let report = paginate(&self.source, self.config.fetch.page_size);
        let fetched = report.features.len();
        let Some(collection) = report.into_collection() else {
            warn!("{}", AbortReason::NoData.message());
            return Ok(PipelineOutcome::Aborted(AbortReason::NoData));
        };

        info!("Step 2: Saving raw data...");
        save_geojson(&collection, &self.config.raw_path)?;
        drop(collection);

        let outcome = process_raw(&self.config)?;
        Ok(match outcome {
            PipelineOutcome::Completed(summary) => PipelineOutcome::Completed(RunSummary {
                fetched: Some(fetched),
                ..summary
            }),
            aborted @ PipelineOutcome::Aborted(_) => aborted,
        })
    }
}

/// Load the raw document at `config.raw_path`, clean it, add coordinates and
/// export the CSV.
///
/// This is the whole run after the raw save; it needs no page source and
/// ignores the fetch settings.
///
/// # Errors
///
/// Fails if the transform rejects the table.
pub fn process_raw(config: &PipelineConfig) -> Result<PipelineOutcome> {
    info!("Step 3: Loading data...");
    let table = match load_geojson(&config.raw_path) {
        Some(table) if !table.is_empty() => table,
        _ => {
            warn!("{}", AbortReason::EmptyTable.message());
            return Ok(PipelineOutcome::Aborted(AbortReason::EmptyTable));
        },
    };
    let loaded = table.len();

    info!("Step 4: Transforming data...");
    let (table, report) = validate_clean(table);
    let table = add_lat_lon(table)?;

    info!("Step 5: Exporting data...");
    let exported = export_csv(&table, &config.processed_path, &config.export);

    info!("Pipeline completed successfully!");
    Ok(PipelineOutcome::Completed(RunSummary {
        fetched: None,
        loaded,
        cleaned: report.after,
        removed: report.removed(),
        exported,
        raw_path: config.raw_path.clone(),
        processed_path: config.processed_path.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, WindEtlError};
    use geojson::Feature;
    use serde_json::json;
    use std::cell::RefCell;

    struct PagedSource {
        pages: Vec<Vec<Feature>>,
        calls: RefCell<usize>,
    }

    impl PagedSource {
        fn new(pages: Vec<Vec<Feature>>) -> Self {
            Self {
                pages,
                calls: RefCell::new(0),
            }
        }
    }

    impl PageSource for PagedSource {
        fn fetch_page(
            &self,
            offset: usize,
            page_size: usize,
        ) -> std::result::Result<Vec<Feature>, FetchError> {
            *self.calls.borrow_mut() += 1;
            Ok(self.pages.get(offset / page_size).cloned().unwrap_or_default())
        }
    }

    fn turbine(name: &str, x: f64, y: f64) -> Feature {
        Feature::try_from(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [x, y]},
            "properties": {"NOME_EOL": name, "X": x, "Y": y, "VERSAO": "1", "POT_MW": 2.1}
        }))
        .unwrap()
    }

    fn config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig::new().with_data_root(dir).with_page_size(2)
    }

    #[test]
    fn test_run_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = PagedSource::new(vec![
            vec![turbine("Ventos de Santa Brigida", -36.1, -5.3), turbine("Cutia", -35.4, -5.9)],
            vec![turbine("Cutia", -35.4, -5.9)],
        ]);
        let pipeline = Pipeline::with_source(config(temp_dir.path()), source);

        let PipelineOutcome::Completed(summary) = pipeline.run().unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.fetched, Some(3));
        assert_eq!(summary.loaded, 3);
        assert_eq!(summary.cleaned, 2);
        assert_eq!(summary.removed, 1);
        assert!(summary.raw_path.exists());

        let exported = summary.exported.expect("csv written");
        assert_eq!(exported.rows, 2);
        assert_eq!(
            exported.columns,
            vec!["NOME_EOL", "POT_MW", "LATITUDE", "LONGITUDE"]
        );

        let text = std::fs::read_to_string(&summary.processed_path).unwrap();
        assert!(text.starts_with("NOME_EOL,POT_MW,LATITUDE,LONGITUDE\n"));
        assert!(text.contains("Ventos de Santa Brigida,2.1,-5.3,-36.1"));
    }

    #[test]
    fn test_no_data_aborts_without_artifacts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cfg = config(temp_dir.path());
        let pipeline = Pipeline::with_source(cfg.clone(), PagedSource::new(vec![]));

        let outcome = pipeline.run().unwrap();
        assert_eq!(outcome, PipelineOutcome::Aborted(AbortReason::NoData));
        assert!(!outcome.is_completed());
        assert_eq!(*pipeline.source.calls.borrow(), 1);
        assert!(!cfg.raw_path.exists());
        assert!(!cfg.processed_path.exists());
    }

    #[test]
    fn test_missing_raw_file_aborts_before_transform() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cfg = config(temp_dir.path());

        let outcome = process_raw(&cfg).unwrap();
        assert_eq!(outcome, PipelineOutcome::Aborted(AbortReason::EmptyTable));
        assert!(!cfg.processed_path.exists());
    }

    #[test]
    fn test_process_raw_needs_no_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cfg = config(temp_dir.path()).with_page_size(0);
        let collection = geojson::FeatureCollection {
            bbox: None,
            features: vec![turbine("Cutia", -35.4, -5.9), turbine("Cutia", -35.4, -5.9)],
            foreign_members: None,
        };
        save_geojson(&collection, &cfg.raw_path).unwrap();

        let PipelineOutcome::Completed(summary) = process_raw(&cfg).unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.fetched, None);
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.exported.map(|report| report.rows), Some(1));
    }

    #[test]
    fn test_raw_save_failure_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let cfg = config(temp_dir.path()).with_raw_path(blocker.join("raw.geojson"));
        let source = PagedSource::new(vec![vec![turbine("Cutia", -35.4, -5.9)]]);

        let err = Pipeline::with_source(cfg.clone(), source).run().unwrap_err();
        assert!(matches!(err, WindEtlError::Io(_)));
        assert!(!cfg.processed_path.exists());
    }

    #[test]
    fn test_export_failure_still_completes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let cfg = config(temp_dir.path()).with_processed_path(blocker.join("outputs.csv"));
        let source = PagedSource::new(vec![vec![turbine("Cutia", -35.4, -5.9)]]);

        let PipelineOutcome::Completed(summary) =
            Pipeline::with_source(cfg, source).run().unwrap()
        else {
            panic!("expected a completed run");
        };
        assert!(summary.exported.is_none());
        assert_eq!(summary.cleaned, 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Pipeline::new(PipelineConfig::new().with_page_size(0)).unwrap_err();
        assert!(matches!(err, WindEtlError::Config(_)));
    }
}
