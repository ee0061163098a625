//! Chart Data Preparation
//! Picks the numeric columns a bar chart is drawn from.

use crate::data::DataProcessor;
use crate::error::{ChartWarning, PipelineError, Result};
use polars::prelude::*;
use std::collections::HashSet;

/// Numeric columns charted when the user has not chosen any.
pub const DEFAULT_CHART_COLUMNS: usize = 2;

/// Data for one bar chart: one bar series per column, one bar group per row.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub columns: Vec<String>,
    pub data: DataFrame,
}

impl ChartData {
    /// Bar heights for a column, `None` where the value is missing.
    pub fn series_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let values = self.data.column(column)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.into_iter().collect())
    }

    pub fn row_count(&self) -> usize {
        self.data.height()
    }
}

/// Either chart data or the reason there is none.
#[derive(Debug, Clone)]
pub enum ChartOutcome {
    Ready(ChartData),
    Skipped(ChartWarning),
}

impl ChartOutcome {
    pub fn chart(&self) -> Option<&ChartData> {
        match self {
            ChartOutcome::Ready(chart) => Some(chart),
            ChartOutcome::Skipped(_) => None,
        }
    }

    pub fn warning(&self) -> Option<ChartWarning> {
        match self {
            ChartOutcome::Skipped(warning) => Some(*warning),
            ChartOutcome::Ready(_) => None,
        }
    }
}

pub struct ChartPreparer;

impl ChartPreparer {
    /// Names of numeric columns, in column order.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        DataProcessor::numeric_columns(df)
    }

    /// The first two numeric columns.
    pub fn default_columns(df: &DataFrame) -> Vec<String> {
        Self::numeric_columns(df)
            .into_iter()
            .take(DEFAULT_CHART_COLUMNS)
            .collect()
    }

    /// Restrict `df` to the requested numeric columns.
    ///
    /// No numeric columns, or an empty request, yields a warning instead of data.
    /// Requesting a column that is not a numeric column of `df` is an error.
    pub fn prepare_chart(df: &DataFrame, columns: &[String]) -> Result<ChartOutcome> {
        let numeric = Self::numeric_columns(df);
        if numeric.is_empty() {
            return Ok(ChartOutcome::Skipped(ChartWarning::NoNumericColumns));
        }
        if columns.is_empty() {
            return Ok(ChartOutcome::Skipped(ChartWarning::NoColumnsSelected));
        }

        if let Some(bad) = columns.iter().find(|c| !numeric.contains(c)) {
            return Err(PipelineError::UnknownColumn(bad.clone()));
        }

        // Repeated names chart once, at their first position
        let mut seen = HashSet::new();
        let columns: Vec<String> = columns
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect();

        let selected = columns
            .iter()
            .map(|c| df.column(c).cloned())
            .collect::<PolarsResult<Vec<Column>>>()?;
        let data = DataFrame::new(selected)?;
        Ok(ChartOutcome::Ready(ChartData { columns, data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("id".into(), [1i64, 2, 3]),
            Column::new("label".into(), ["a", "b", "c"]),
            Column::new("score".into(), [Some(0.5), None, Some(0.9)]),
            Column::new("rank".into(), [3i32, 2, 1]),
        ])
        .unwrap()
    }

    #[test]
    fn default_is_first_two_numeric_columns() {
        assert_eq!(ChartPreparer::default_columns(&sample()), ["id", "score"]);
    }

    #[test]
    fn empty_selection_is_a_warning() {
        let df = sample();
        let outcome = ChartPreparer::prepare_chart(&df, &[]).unwrap();
        assert_eq!(outcome.warning(), Some(ChartWarning::NoColumnsSelected));
        assert!(outcome.chart().is_none());
        assert!(df.equals_missing(&sample()));
    }

    #[test]
    fn no_numeric_columns_is_a_warning() {
        let df = DataFrame::new(vec![Column::new("label".into(), ["a"])]).unwrap();
        let outcome = ChartPreparer::prepare_chart(&df, &["label".to_string()]).unwrap();
        assert_eq!(outcome.warning(), Some(ChartWarning::NoNumericColumns));
    }

    #[test]
    fn text_column_cannot_be_charted() {
        let err = ChartPreparer::prepare_chart(&sample(), &["label".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(c) if c == "label"));
    }

    #[test]
    fn repeated_chart_columns_are_charted_once() {
        let request = ["score", "id", "score"].map(String::from);
        let outcome = ChartPreparer::prepare_chart(&sample(), &request).unwrap();
        let chart = outcome.chart().unwrap();
        assert_eq!(chart.columns, ["score", "id"]);
        assert_eq!(chart.data.width(), 2);
    }

    #[test]
    fn chart_data_holds_requested_columns() {
        let outcome =
            ChartPreparer::prepare_chart(&sample(), &["rank".to_string(), "score".to_string()])
                .unwrap();
        let chart = outcome.chart().unwrap();
        assert_eq!(chart.columns, ["rank", "score"]);
        assert_eq!(chart.data.width(), 2);
        assert_eq!(chart.row_count(), 3);
        assert_eq!(
            chart.series_values("score").unwrap(),
            [Some(0.5), None, Some(0.9)]
        );
    }
}
