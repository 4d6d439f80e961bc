//! Command-line interface for `WindETL`.
//!
//! A single invocation runs the whole pipeline: page through the ANEEL SIGEL
//! wind-turbine layer, save the raw `GeoJSON`, clean and reproject it, and
//! write the CSV. Every setting defaults to the values in
//! [`windetl_core::config`]; the flags only override them.
//!
//! Early aborts (no data, empty table) and a failed export still exit with
//! status 0. A failed raw save or transform exits non-zero.

mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, error, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use windetl_core::config::{
    DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE, DEFAULT_PROCESSED_PATH, DEFAULT_RAW_PATH, DEFAULT_TIMEOUT,
};
use windetl_core::{ExportConfig, Pipeline, PipelineConfig, PipelineOutcome, process_raw};

#[derive(Parser, Debug)]
#[command(
    name = "windetl",
    version,
    about = "Extract ANEEL wind-turbine records into a flat CSV",
    long_about = "Pages through the ANEEL SIGEL wind-turbine feature service, stores the raw GeoJSON,\n\
                  drops duplicates and rows without geometry, adds WGS84 LATITUDE/LONGITUDE\n\
                  columns and exports the result as CSV."
)]
/// Command-line options for the `WindETL` CLI.
struct Cli {
    /// Feature-service query URL.
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Records requested per page.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Where the fetched `GeoJSON` is stored.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RAW_PATH)]
    raw_path: PathBuf,

    /// Where the CSV is written.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_PROCESSED_PATH)]
    output: PathBuf,

    /// Quote every CSV field.
    #[arg(long)]
    quote_all: bool,

    /// Reprocess the existing raw file instead of fetching.
    #[arg(long)]
    skip_fetch: bool,

    /// Only show warnings and errors.
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_endpoint(self.endpoint.clone())
            .with_page_size(self.page_size)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_raw_path(&self.raw_path)
            .with_processed_path(&self.output)
            .with_export(ExportConfig {
                quote_all: self.quote_all,
                ..ExportConfig::default()
            })
    }
}

/// Entry point for the `WindETL` command-line interface.
///
/// # Errors
///
/// Returns an error if logging cannot be initialised, the fetch options are
/// invalid, or the pipeline hits a fatal stage error.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_target(cli.debug)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.pipeline_config();
    let outcome = if cli.skip_fetch {
        info!("Skipping fetch, reprocessing {}", cli.raw_path.display());
        process_raw(&config)
    } else {
        Pipeline::new(config)?.run()
    };

    match outcome {
        Ok(PipelineOutcome::Completed(summary)) => display::display_summary(&summary),
        Ok(PipelineOutcome::Aborted(reason)) => info!("Run aborted: {reason:?}"),
        Err(err) => {
            error!("{}", err.user_message());
            if let Some(suggestion) = err.recovery_suggestion() {
                info!("{suggestion}");
            }
            return Err(err.into());
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_config() {
        let cli = Cli::parse_from(["windetl"]);
        assert_eq!(cli.pipeline_config(), PipelineConfig::new());
        assert_eq!(cli.log_level(), Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "windetl",
            "--endpoint",
            "http://localhost:8080/query",
            "--page-size",
            "250",
            "--timeout-secs",
            "5",
            "--raw-path",
            "/tmp/raw.geojson",
            "-o",
            "/tmp/out.csv",
            "--quote-all",
            "--quiet",
        ]);
        let config = cli.pipeline_config();
        assert_eq!(config.fetch.endpoint, "http://localhost:8080/query");
        assert_eq!(config.fetch.page_size, 250);
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.raw_path, PathBuf::from("/tmp/raw.geojson"));
        assert_eq!(config.processed_path, PathBuf::from("/tmp/out.csv"));
        assert!(config.export.quote_all);
        assert_eq!(cli.log_level(), Level::WARN);
    }

    #[test]
    fn test_quiet_conflicts_with_debug() {
        assert!(Cli::try_parse_from(["windetl", "-q", "-d"]).is_err());
    }
}
