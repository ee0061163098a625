//! Stats module - column statistics

mod calculator;

pub use calculator::{ColumnStats, StatsCalculator};
