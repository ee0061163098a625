//! Statistics Calculator Module
//! Column statistics used to fill missing values.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use rayon::prelude::*;
use statrs::statistics::{Data, Median, Statistics};
use std::cmp::Ordering;

/// Statistics for a single numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    /// Non-missing, non-NaN values.
    pub count: usize,
    /// Missing entries, NaN included.
    pub null_count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            null_count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            mode: f64::NAN,
        }
    }
}

impl ColumnStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Arithmetic mean of the values.
    pub fn mean(column: &str, values: &[f64]) -> Result<f64> {
        if values.is_empty() {
            return Err(PipelineError::EmptyColumnStatistic(column.to_string()));
        }
        Ok(values.iter().mean())
    }

    /// Median, averaging the two middle values for an even count.
    pub fn median(column: &str, values: &[f64]) -> Result<f64> {
        if values.is_empty() {
            return Err(PipelineError::EmptyColumnStatistic(column.to_string()));
        }
        Ok(Data::new(values.to_vec()).median())
    }

    /// Most frequent value. Ties resolve to the smallest value.
    pub fn mode(column: &str, values: &[f64]) -> Result<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut best: Option<(f64, usize)> = None;
        for run in sorted.chunk_by(|a, b| a.total_cmp(b) == Ordering::Equal) {
            // Runs arrive in ascending order, so a strict comparison keeps the smallest on ties
            if best.map_or(true, |(_, count)| run.len() > count) {
                best = Some((run[0], run.len()));
            }
        }

        best.map(|(value, _)| value)
            .ok_or_else(|| PipelineError::EmptyColumnStatistic(column.to_string()))
    }

    /// Non-missing values of a numeric column as f64. NaN is skipped.
    pub fn present_values(column: &Column) -> Result<Vec<f64>> {
        let as_f64 = column.cast(&DataType::Float64)?;
        let values = as_f64
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect();
        Ok(values)
    }

    /// Compute descriptive statistics for one column.
    ///
    /// A column with no usable values returns stats with `count == 0`
    /// and NaN statistics rather than an error.
    pub fn compute_column_stats(column: &Column) -> Result<ColumnStats> {
        let name = column.name().to_string();
        let values = Self::present_values(column)?;
        let null_count = column.len() - values.len();

        if values.is_empty() {
            return Ok(ColumnStats {
                column: name,
                null_count,
                ..ColumnStats::default()
            });
        }

        Ok(ColumnStats {
            mean: Self::mean(&name, &values)?,
            median: Self::median(&name, &values)?,
            mode: Self::mode(&name, &values)?,
            count: values.len(),
            null_count,
            column: name,
        })
    }

    /// Compute statistics for the named columns in parallel, returned in input order.
    pub fn compute_all_stats_parallel(df: &DataFrame, columns: &[String]) -> Result<Vec<ColumnStats>> {
        columns
            .par_iter()
            .map(|name| {
                let column = df
                    .column(name)
                    .map_err(|_| PipelineError::UnknownColumn(name.clone()))?;
                Self::compute_column_stats(column)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median() {
        assert_eq!(StatsCalculator::mean("x", &[1.0, 3.0]).unwrap(), 2.0);
        assert_eq!(StatsCalculator::median("x", &[5.0, 1.0, 3.0]).unwrap(), 3.0);
        assert_eq!(StatsCalculator::median("x", &[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn mode_picks_most_frequent() {
        assert_eq!(StatsCalculator::mode("x", &[1.0, 2.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn mode_tie_picks_smallest() {
        assert_eq!(StatsCalculator::mode("x", &[3.0, 1.0, 3.0, 1.0, 7.0]).unwrap(), 1.0);
        assert_eq!(StatsCalculator::mode("x", &[9.0, -4.0]).unwrap(), -4.0);
    }

    #[test]
    fn empty_values_are_an_error() {
        for result in [
            StatsCalculator::mean("empty", &[]),
            StatsCalculator::median("empty", &[]),
            StatsCalculator::mode("empty", &[]),
        ] {
            assert!(matches!(result, Err(PipelineError::EmptyColumnStatistic(c)) if c == "empty"));
        }
    }

    #[test]
    fn column_stats_treat_nan_as_missing() {
        let column = Column::new("v".into(), [Some(1.0), None, Some(f64::NAN), Some(3.0)]);
        let stats = StatsCalculator::compute_column_stats(&column).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.null_count, 2);
        assert_eq!(stats.mean, 2.0);
    }

    #[test]
    fn all_null_column_has_empty_stats() {
        let column = Column::new("v".into(), [None::<i64>, None]);
        let stats = StatsCalculator::compute_column_stats(&column).unwrap();
        assert!(stats.is_empty());
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn parallel_stats_keep_column_order() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), [1i64, 2, 3]),
            Column::new("b".into(), [10.0, 20.0, 20.0]),
        ])
        .unwrap();
        let stats =
            StatsCalculator::compute_all_stats_parallel(&df, &["b".into(), "a".into()]).unwrap();
        assert_eq!(stats[0].column, "b");
        assert_eq!(stats[0].mode, 20.0);
        assert_eq!(stats[1].column, "a");
        assert_eq!(stats[1].median, 2.0);
    }
}
