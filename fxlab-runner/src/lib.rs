//! FXLab Runner: run configuration, pipeline execution, artifact export.
//!
//! This crate builds on `fxlab-core` to provide:
//! - TOML run configuration with named date windows
//! - Source loading (XLSX or CSV) with BLAKE3 fingerprinting
//! - The full analysis pipeline and its output layout
//! - CSV, Markdown and JSON manifest export

pub mod config;
pub mod export;
pub mod manifest;
pub mod pipeline;

pub use config::{ChartConfig, ConfigError, NamedWindow, RunConfig, SourceKind};
pub use manifest::{load_manifest, RunManifest, SCHEMA_VERSION};
pub use pipeline::{
    extract_to_csv, load_source, render_series_chart, run_analysis, AnalysisOutcome,
    LoadedSource,
};
