//! Pipeline Configuration
//! Every user choice for one file, gathered into a single struct.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Missing value handling for numeric columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CleaningChoice {
    #[default]
    #[value(name = "do-nothing")]
    DoNothing,
    #[serde(alias = "mean")]
    #[value(name = "mean")]
    FillMean,
    #[serde(alias = "median")]
    #[value(name = "median")]
    FillMedian,
    #[serde(alias = "mode")]
    #[value(name = "mode")]
    FillMode,
}

impl CleaningChoice {
    pub const ALL: [CleaningChoice; 4] = [
        CleaningChoice::DoNothing,
        CleaningChoice::FillMean,
        CleaningChoice::FillMedian,
        CleaningChoice::FillMode,
    ];

    /// Label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            CleaningChoice::DoNothing => "Do Nothing",
            CleaningChoice::FillMean => "Fill with Mean",
            CleaningChoice::FillMedian => "Fill with Median",
            CleaningChoice::FillMode => "Fill with Mode",
        }
    }
}

impl fmt::Display for CleaningChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output format of the exported file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx")]
    Excel,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }
}

/// Number of preview rows, same as a dataframe `head()`.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// All choices made for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dedupe: bool,
    pub fill: CleaningChoice,
    /// `None` keeps every column.
    pub selected_columns: Option<BTreeSet<String>>,
    pub show_chart: bool,
    /// `None` charts the first two numeric columns.
    pub chart_columns: Option<Vec<String>>,
    pub export_format: ExportFormat,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedupe: false,
            fill: CleaningChoice::DoNothing,
            selected_columns: None,
            show_chart: false,
            chart_columns: None,
            export_format: ExportFormat::Csv,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON options file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}
