//! Charts module - chart data preparation and rendering

mod preparer;
mod renderer;

pub use preparer::{ChartData, ChartOutcome, ChartPreparer, DEFAULT_CHART_COLUMNS};
pub use renderer::{StaticChartRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH};
