//! File Pipeline
//! Runs every cleaning stage for one uploaded file.
//!
//! Stage order:
//! 1. load (through the cache when one is attached), then keep a preview
//! 2. dedupe, when enabled
//! 3. impute numeric gaps
//! 4. select columns
//! 5. prepare chart data, when enabled
//! 6. export
//!
//! A failure stops the file and is tagged with the file name and stage.

use crate::charts::{ChartData, ChartOutcome, ChartPreparer};
use crate::config::{CleaningChoice, PipelineConfig};
use crate::data::{DataLoader, DataProcessor, FileRecord, LoadCache};
use crate::error::{ChartWarning, Result, Stage};
use crate::export::{ExportArtifact, Exporter};
use log::{info, warn};
use polars::prelude::DataFrame;

/// Shape of the data after one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub rows: usize,
    pub columns: usize,
    pub message: String,
}

impl StageReport {
    fn new(stage: Stage, df: &DataFrame, message: impl Into<String>) -> Self {
        Self {
            stage,
            rows: df.height(),
            columns: df.width(),
            message: message.into(),
        }
    }
}

/// Everything produced for one file.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub file_name: String,
    /// First rows of the data as loaded.
    pub preview: DataFrame,
    /// The cleaned, selected dataset that was exported.
    pub dataset: DataFrame,
    pub stages: Vec<StageReport>,
    pub chart: Option<ChartData>,
    pub chart_warning: Option<ChartWarning>,
    pub export: ExportArtifact,
}

/// Runs files through the cleaning stages. Owns the optional load cache.
#[derive(Default)]
pub struct FilePipeline {
    cache: Option<LoadCache>,
}

impl FilePipeline {
    /// Pipeline without a cache: every run parses its input.
    pub fn new() -> Self {
        Self { cache: None }
    }

    pub fn with_cache(cache: LoadCache) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn cache(&self) -> Option<&LoadCache> {
        self.cache.as_ref()
    }

    pub fn run(&mut self, record: &FileRecord, config: &PipelineConfig) -> Result<PipelineOutput> {
        let file = record.name();
        let mut stages = Vec::new();

        // Load
        let loaded = match self.cache.as_mut() {
            Some(cache) => cache.load(record.content(), record.format()),
            None => DataLoader::load_format(record.content(), record.format()),
        }
        .map_err(|e| e.at(file, Stage::Load))?;
        info!("{}: loaded {} rows x {} columns", file, loaded.height(), loaded.width());
        stages.push(StageReport::new(Stage::Load, &loaded, format!("{} file", record.format())));
        let preview = DataProcessor::preview(&loaded, config.preview_rows);

        // Dedupe
        let deduped = if config.dedupe {
            let out = DataProcessor::dedupe(&loaded).map_err(|e| e.at(file, Stage::Dedupe))?;
            let removed = loaded.height() - out.height();
            info!("{}: removed {} duplicate rows", file, removed);
            stages.push(StageReport::new(
                Stage::Dedupe,
                &out,
                format!("removed {} duplicate rows", removed),
            ));
            out
        } else {
            loaded
        };

        // Impute
        let imputation = DataProcessor::impute_with_report(&deduped, config.fill)
            .map_err(|e| e.at(file, Stage::Impute))?;
        let mut message = match config.fill {
            CleaningChoice::DoNothing => config.fill.label().to_string(),
            _ => format!("{}: {} columns filled", config.fill.label(), imputation.filled.len()),
        };
        if !imputation.skipped.is_empty() {
            message.push_str(&format!(
                ", skipped all-missing {}",
                imputation.skipped.join(", ")
            ));
        }
        info!("{}: {}", file, message);
        stages.push(StageReport::new(Stage::Impute, &imputation.df, message));
        let cleaned = imputation.df;

        // Select
        let dataset = match &config.selected_columns {
            Some(names) => {
                let out = DataProcessor::select(&cleaned, names)
                    .map_err(|e| e.at(file, Stage::Select))?;
                stages.push(StageReport::new(
                    Stage::Select,
                    &out,
                    format!("kept {} of {} columns", out.width(), cleaned.width()),
                ));
                out
            }
            None => {
                stages.push(StageReport::new(Stage::Select, &cleaned, "kept all columns"));
                cleaned
            }
        };

        // Chart
        let mut chart = None;
        let mut chart_warning = None;
        if config.show_chart {
            let columns = match &config.chart_columns {
                Some(columns) => columns.clone(),
                None => ChartPreparer::default_columns(&dataset),
            };
            match ChartPreparer::prepare_chart(&dataset, &columns)
                .map_err(|e| e.at(file, Stage::Chart))?
            {
                ChartOutcome::Ready(data) => {
                    stages.push(StageReport::new(
                        Stage::Chart,
                        &data.data,
                        format!("charting {}", data.columns.join(", ")),
                    ));
                    chart = Some(data);
                }
                ChartOutcome::Skipped(warning) => {
                    warn!("{}: {}", file, warning);
                    stages.push(StageReport::new(Stage::Chart, &dataset, warning.to_string()));
                    chart_warning = Some(warning);
                }
            }
        }

        // Export
        let export = Exporter::export(&dataset, config.export_format, file)
            .map_err(|e| e.at(file, Stage::Export))?;
        stages.push(StageReport::new(
            Stage::Export,
            &dataset,
            format!("{} ({} bytes)", export.filename, export.bytes.len()),
        ));
        info!("{}: exported {}", file, export.filename);

        Ok(PipelineOutput {
            file_name: file.to_string(),
            preview,
            dataset,
            stages,
            chart,
            chart_warning,
            export,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportFormat;
    use crate::error::PipelineError;
    use std::collections::BTreeSet;

    const CSV: &[u8] = b"id,name,score\n1,a,10\n1,a,10\n2,b,\n3,c,30\n";

    fn record() -> FileRecord {
        FileRecord::new("scores.csv", CSV.to_vec()).unwrap()
    }

    #[test]
    fn default_config_passes_data_through() {
        let out = FilePipeline::new().run(&record(), &PipelineConfig::default()).unwrap();
        assert_eq!(out.dataset.height(), 4);
        assert_eq!(out.preview.height(), 4);
        assert_eq!(out.export.filename, "scores.csv");
        assert!(out.chart.is_none());
        assert!(out.chart_warning.is_none());

        let stages: Vec<Stage> = out.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            [Stage::Load, Stage::Impute, Stage::Select, Stage::Export]
        );
    }

    #[test]
    fn full_run_reports_each_stage() {
        let config = PipelineConfig {
            dedupe: true,
            fill: CleaningChoice::FillMean,
            selected_columns: Some(BTreeSet::from(["id".to_string(), "score".to_string()])),
            show_chart: true,
            chart_columns: None,
            export_format: ExportFormat::Excel,
            preview_rows: 2,
        };
        let out = FilePipeline::new().run(&record(), &config).unwrap();

        assert_eq!(out.preview.height(), 2);
        assert_eq!(out.dataset.height(), 3);
        assert_eq!(out.dataset.width(), 2);
        assert_eq!(out.dataset.column("score").unwrap().null_count(), 0);
        assert_eq!(out.chart.as_ref().map(|c| c.columns.clone()), Some(vec!["id".to_string(), "score".to_string()]));
        assert_eq!(out.export.filename, "scores.xlsx");
        assert_eq!(out.stages.len(), 6);
        assert_eq!(out.stages[1].message, "removed 1 duplicate rows");
    }

    #[test]
    fn chart_without_numeric_columns_is_a_warning() {
        let config = PipelineConfig {
            selected_columns: Some(BTreeSet::from(["name".to_string()])),
            show_chart: true,
            ..PipelineConfig::default()
        };
        let out = FilePipeline::new().run(&record(), &config).unwrap();
        assert_eq!(out.chart_warning, Some(ChartWarning::NoNumericColumns));
        assert!(out.chart.is_none());
    }

    #[test]
    fn unknown_column_fails_in_select_stage() {
        let config = PipelineConfig {
            selected_columns: Some(BTreeSet::from(["missing".to_string()])),
            ..PipelineConfig::default()
        };
        let err = FilePipeline::new().run(&record(), &config).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Select));
        assert!(matches!(err.root(), PipelineError::UnknownColumn(c) if c == "missing"));
    }

    #[test]
    fn broken_xlsx_fails_in_load_stage() {
        let record = FileRecord::new("broken.xlsx", b"not a zip".to_vec()).unwrap();
        let err = FilePipeline::new().run(&record, &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Load));
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn cached_pipeline_reuses_parsed_input() {
        let mut pipeline = FilePipeline::with_cache(LoadCache::default());
        pipeline.run(&record(), &PipelineConfig::default()).unwrap();
        pipeline.run(&record(), &PipelineConfig::default()).unwrap();

        let cache = pipeline.cache().unwrap();
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }
}
