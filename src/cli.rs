//! Command Line Interface
//! Runs the cleaning pipeline over files given on the command line.

use crate::charts::{StaticChartRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::config::{CleaningChoice, ExportFormat, PipelineConfig};
use crate::data::{FileRecord, LoadCache, DEFAULT_CACHE_CAPACITY};
use crate::pipeline::{FilePipeline, PipelineOutput};
use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "tabclean", about = "Clean CSV and Excel files and export the result")]
pub struct Cli {
    /// Files to process (csv or xlsx)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Remove duplicate rows
    #[arg(long)]
    pub dedupe: bool,

    /// How to fill missing values in numeric columns
    #[arg(long, value_enum)]
    pub fill: Option<CleaningChoice>,

    /// Columns to keep, comma separated. Defaults to all columns.
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Render a bar chart of numeric columns
    #[arg(long)]
    pub show_chart: bool,

    /// Columns to chart, comma separated. Defaults to the first two numeric columns.
    #[arg(long, value_delimiter = ',')]
    pub chart_columns: Option<Vec<String>>,

    /// Export format
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Number of rows shown in the preview
    #[arg(long)]
    pub preview_rows: Option<usize>,

    /// Directory the exported files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Path to a JSON pipeline configuration file. Flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of parsed files kept in the load cache
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The config file (or defaults) with explicit flags applied on top.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if self.dedupe {
            config.dedupe = true;
        }
        if let Some(fill) = self.fill {
            config.fill = fill;
        }
        if let Some(columns) = &self.columns {
            config.selected_columns = Some(columns.iter().cloned().collect());
        }
        if self.show_chart {
            config.show_chart = true;
        }
        if let Some(columns) = &self.chart_columns {
            config.chart_columns = Some(columns.clone());
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
        if let Some(rows) = self.preview_rows {
            config.preview_rows = rows;
        }
        Ok(config)
    }
}

/// Process every file. Returns the number of files that failed.
pub fn run(cli: &Cli) -> Result<usize> {
    let config = cli.pipeline_config()?;
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create output directory {}", cli.out_dir.display()))?;

    let mut pipeline = FilePipeline::with_cache(LoadCache::with_capacity(cli.cache_capacity));
    let mut failures = 0;

    for path in &cli.files {
        let record = match FileRecord::from_path(path) {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Skipping {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };

        let output = match pipeline.run(&record, &config) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("Error: {}", e);
                failures += 1;
                continue;
            }
        };

        print_output(&output);
        if let Err(e) = write_output(&output, &cli.out_dir) {
            eprintln!("Error: {:#}", e);
            failures += 1;
        }
    }

    Ok(failures)
}

fn print_output(output: &PipelineOutput) {
    println!("=== {} ===", output.file_name);
    println!("Preview:\n{}", output.preview);
    for report in &output.stages {
        println!(
            "  {:<7} {:>6} rows x {:<3} columns  {}",
            report.stage, report.rows, report.columns, report.message
        );
    }
    if let Some(warning) = output.chart_warning {
        println!("Warning: {}", warning);
    }
}

fn write_output(output: &PipelineOutput, out_dir: &Path) -> Result<()> {
    let export_path = out_dir.join(&output.export.filename);
    std::fs::write(&export_path, &output.export.bytes)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;
    println!("Saved {} ({})", export_path.display(), output.export.mime_type);

    if let Some(chart) = &output.chart {
        let png = StaticChartRenderer::render_png(chart, DEFAULT_WIDTH, DEFAULT_HEIGHT)
            .with_context(|| format!("Failed to render chart for {}", output.file_name))?;
        let chart_path = out_dir.join(chart_filename(&output.file_name));
        std::fs::write(&chart_path, png)
            .with_context(|| format!("Failed to write {}", chart_path.display()))?;
        println!("Saved {}", chart_path.display());
    }
    Ok(())
}

/// `<stem>_chart.png` for an uploaded file name.
pub fn chart_filename(original: &str) -> String {
    let stem = match original.rfind('.') {
        Some(idx) if idx > 0 => &original[..idx],
        _ => original,
    };
    format!("{}_chart.png", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_filename_drops_last_extension() {
        assert_eq!(chart_filename("sales.csv"), "sales_chart.png");
        assert_eq!(chart_filename("a.b.xlsx"), "a.b_chart.png");
        assert_eq!(chart_filename("plain"), "plain_chart.png");
    }

    #[test]
    fn flags_override_config_defaults() {
        let cli = Cli::parse_from([
            "tabclean",
            "--dedupe",
            "--fill",
            "median",
            "--columns",
            "a,b",
            "--format",
            "excel",
            "data.csv",
        ]);
        let config = cli.pipeline_config().unwrap();
        assert!(config.dedupe);
        assert_eq!(config.fill, CleaningChoice::FillMedian);
        assert_eq!(config.export_format, ExportFormat::Excel);
        assert_eq!(
            config.selected_columns.unwrap().into_iter().collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert!(!config.show_chart);
        assert_eq!(cli.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn fill_names_match_choices() {
        for (name, choice) in [
            ("do-nothing", CleaningChoice::DoNothing),
            ("mean", CleaningChoice::FillMean),
            ("mode", CleaningChoice::FillMode),
        ] {
            let cli = Cli::parse_from(["tabclean", "--fill", name, "x.csv"]);
            assert_eq!(cli.fill, Some(choice));
        }
    }
}
