//! Error Types
//! Fatal pipeline errors and non-fatal chart warnings.

use polars::prelude::PolarsError;
use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to tell the user where a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Dedupe,
    Impute,
    Select,
    Chart,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Dedupe => "dedupe",
            Stage::Impute => "impute",
            Stage::Select => "select",
            Stage::Chart => "chart",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file format: {0:?} (expected csv or xlsx)")]
    UnsupportedFormat(String),
    #[error("Failed to parse {format} content: {message}")]
    Parse { format: &'static str, message: String },
    #[error("Column '{0}' has no non-missing values to compute a statistic from")]
    EmptyColumnStatistic(String),
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),
    #[error("Failed to serialize to {format}: {message}")]
    Serialization { format: &'static str, message: String },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{file}: {stage} stage failed: {source}")]
    Stage {
        file: String,
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Attach file and stage information to an error.
    pub fn at(self, file: &str, stage: Stage) -> Self {
        PipelineError::Stage {
            file: file.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// Stage the error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with stage wrappers removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Warning-level chart conditions. They suppress the chart but never fail the pipeline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartWarning {
    #[error("No columns selected for chart.")]
    NoColumnsSelected,
    #[error("No numeric columns available for chart.")]
    NoNumericColumns,
}
