//! Delimited-text output for the `WindETL` pipeline.

pub mod writer;

pub use writer::{CsvWriterOptions, write_csv};
