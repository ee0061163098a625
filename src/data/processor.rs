//! Data Processor Module
//! Cleaning operations: deduplication, missing value imputation and column selection.
//!
//! Every operation takes the input DataFrame by reference and returns a new one.

use crate::config::CleaningChoice;
use crate::error::{PipelineError, Result};
use crate::stats::{ColumnStats, StatsCalculator};
use log::{debug, warn};
use polars::prelude::*;
use std::collections::BTreeSet;

/// Whether a dtype supports mean / median.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// One column whose missing values were filled.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledColumn {
    pub column: String,
    pub value: f64,
    pub filled: usize,
}

/// Result of an imputation pass.
#[derive(Debug, Clone)]
pub struct Imputation {
    pub df: DataFrame,
    pub filled: Vec<FilledColumn>,
    /// Numeric columns with no values to compute a statistic from, left as is.
    pub skipped: Vec<String>,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Names of numeric columns, in column order.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    /// First `n` rows.
    pub fn preview(df: &DataFrame, n: usize) -> DataFrame {
        df.head(Some(n))
    }

    /// Drop rows that repeat an earlier row across all columns.
    /// The first occurrence survives and row order is preserved.
    pub fn dedupe(df: &DataFrame) -> Result<DataFrame> {
        if df.width() == 0 {
            return Ok(df.clone());
        }
        let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        debug!(
            "Dedupe removed {} of {} rows",
            df.height() - deduped.height(),
            df.height()
        );
        Ok(deduped)
    }

    /// Fill missing values of numeric columns according to `choice`.
    pub fn impute(df: &DataFrame, choice: CleaningChoice) -> Result<DataFrame> {
        Ok(Self::impute_with_report(df, choice)?.df)
    }

    /// Like [`DataProcessor::impute`], also reporting what was filled and skipped.
    ///
    /// Mean and median fills produce Float64 columns. Mode fills keep integer
    /// columns integer. Numeric columns with no present values are skipped.
    pub fn impute_with_report(df: &DataFrame, choice: CleaningChoice) -> Result<Imputation> {
        let mut out = df.clone();
        let mut filled = Vec::new();
        let mut skipped = Vec::new();

        let statistic: fn(&ColumnStats) -> f64 = match choice {
            CleaningChoice::DoNothing => {
                return Ok(Imputation {
                    df: out,
                    filled,
                    skipped,
                })
            }
            CleaningChoice::FillMean => |s| s.mean,
            CleaningChoice::FillMedian => |s| s.median,
            CleaningChoice::FillMode => |s| s.mode,
        };

        let mut targets = Vec::new();
        for name in Self::numeric_columns(df) {
            if Self::missing_count(df.column(&name)?)? > 0 {
                targets.push(name);
            }
        }
        let stats = StatsCalculator::compute_all_stats_parallel(df, &targets)?;

        for stat in stats {
            if stat.is_empty() {
                warn!(
                    "Column '{}' has no values to compute a fill from, leaving it unfilled",
                    stat.column
                );
                skipped.push(stat.column);
                continue;
            }

            let value = statistic(&stat);
            let column = df.column(&stat.column)?;
            let replacement = if choice == CleaningChoice::FillMode && column.dtype().is_integer() {
                Self::fill_integer(column, value as i64)?
            } else {
                Self::fill_float(column, value)?
            };
            out.replace(&stat.column, replacement)?;

            debug!("Filled {} values in '{}' with {}", stat.null_count, stat.column, value);
            filled.push(FilledColumn {
                column: stat.column,
                value,
                filled: stat.null_count,
            });
        }

        Ok(Imputation {
            df: out,
            filled,
            skipped,
        })
    }

    /// Nulls, plus NaN in float columns.
    fn missing_count(column: &Column) -> Result<usize> {
        let mut missing = column.null_count();
        if column.dtype().is_float() {
            let as_f64 = column.cast(&DataType::Float64)?;
            missing += as_f64
                .f64()?
                .into_iter()
                .filter(|v| v.is_some_and(f64::is_nan))
                .count();
        }
        Ok(missing)
    }

    fn fill_float(column: &Column, value: f64) -> Result<Series> {
        let as_f64 = column.cast(&DataType::Float64)?;
        let ca: Float64Chunked = as_f64
            .f64()?
            .into_iter()
            .map(|v| Some(v.filter(|x| !x.is_nan()).unwrap_or(value)))
            .collect();
        Ok(ca.with_name(column.name().clone()).into_series())
    }

    fn fill_integer(column: &Column, value: i64) -> Result<Series> {
        let as_i64 = column.cast(&DataType::Int64)?;
        let ca: Int64Chunked = as_i64
            .i64()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(value)))
            .collect();
        Ok(ca.with_name(column.name().clone()).into_series())
    }

    /// Keep only the named columns, in their original order.
    pub fn select(df: &DataFrame, names: &BTreeSet<String>) -> Result<DataFrame> {
        if let Some(missing) = names.iter().find(|n| df.get_column_index(n).is_none()) {
            return Err(PipelineError::UnknownColumn(missing.clone()));
        }

        let columns: Vec<Column> = df
            .get_columns()
            .iter()
            .filter(|col| names.contains(col.name().as_str()))
            .cloned()
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}
