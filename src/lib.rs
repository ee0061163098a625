//! tabclean - CSV and Excel cleaning pipeline
//!
//! Loads a tabular file, optionally removes duplicate rows, fills missing
//! numeric values, keeps a subset of columns, prepares a bar chart and
//! exports the result as CSV or Excel.

pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod stats;

pub use config::{CleaningChoice, ExportFormat, PipelineConfig};
pub use data::FileRecord;
pub use error::{ChartWarning, PipelineError, Result, Stage};
pub use export::{ExportArtifact, Exporter};
pub use pipeline::{FilePipeline, PipelineOutput, StageReport};
