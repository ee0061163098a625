//! Static Chart Renderer
//! Draws a grouped bar chart to PNG bytes.
//!
//! Layout:
//! 1. One group of bars per row, left to right in row order
//! 2. One bar per charted column inside each group, coloured from `PALETTE`
//! 3. A horizontal baseline at zero and a vertical axis on the left
//!
//! No text is drawn, so rendering does not depend on system fonts.

use super::preparer::ChartData;
use crate::error::{PipelineError, Result};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

const MARGIN: i32 = 30;

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Colour of the n-th charted column.
    pub fn series_color(index: usize) -> RGBColor {
        PALETTE[index % PALETTE.len()]
    }

    /// Render the chart as a PNG image.
    pub fn render_png(chart: &ChartData, width: u32, height: u32) -> Result<Vec<u8>> {
        let series = chart
            .columns
            .iter()
            .map(|c| chart.series_values(c))
            .collect::<Result<Vec<_>>>()?;

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        Self::draw(&mut buffer, width, height, &series).map_err(|message| {
            PipelineError::Serialization {
                format: "png",
                message,
            }
        })?;

        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            PipelineError::Serialization {
                format: "png",
                message: "bitmap buffer does not match chart size".to_string(),
            }
        })?;
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| PipelineError::Serialization {
                format: "png",
                message: e.to_string(),
            })?;
        Ok(png.into_inner())
    }

    fn draw(
        buffer: &mut [u8],
        width: u32,
        height: u32,
        series: &[Vec<Option<f64>>],
    ) -> std::result::Result<(), String> {
        let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let rows = series.first().map(|s| s.len()).unwrap_or(0);
        let (y_min, y_max) = Self::get_y_range(series);

        let plot_x = MARGIN;
        let plot_y = MARGIN;
        let plot_w = (width as i32 - 2 * MARGIN).max(1);
        let plot_h = (height as i32 - 2 * MARGIN).max(1);
        let baseline = Self::map_y(0.0, y_min, y_max, plot_y, plot_h);

        if rows > 0 && !series.is_empty() {
            let group_w = plot_w as f64 / rows as f64;
            let bar_w = group_w * 0.8 / series.len() as f64;

            for (col_idx, values) in series.iter().enumerate() {
                let style = Self::series_color(col_idx).filled();
                for (row_idx, value) in values.iter().enumerate() {
                    let Some(v) = value.filter(|v| v.is_finite()) else {
                        continue;
                    };
                    let x0 = plot_x as f64 + row_idx as f64 * group_w + group_w * 0.1
                        + col_idx as f64 * bar_w;
                    let x1 = x0 + bar_w;
                    let top = Self::map_y(v, y_min, y_max, plot_y, plot_h);
                    root.draw(&Rectangle::new(
                        [(x0.round() as i32, top), (x1.round() as i32, baseline)],
                        style,
                    ))
                    .map_err(|e| e.to_string())?;
                }
            }
        }

        let axis = BLACK.stroke_width(1);
        root.draw(&PathElement::new(
            vec![(plot_x, baseline), (plot_x + plot_w, baseline)],
            axis,
        ))
        .map_err(|e| e.to_string())?;
        root.draw(&PathElement::new(
            vec![(plot_x, plot_y), (plot_x, plot_y + plot_h)],
            axis,
        ))
        .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Value range covering every bar and zero.
    fn get_y_range(series: &[Vec<Option<f64>>]) -> (f64, f64) {
        let mut min = 0.0f64;
        let mut max = 0.0f64;
        for v in series.iter().flatten().flatten() {
            if v.is_finite() {
                min = min.min(*v);
                max = max.max(*v);
            }
        }
        if max - min == 0.0 {
            return (min, min + 1.0);
        }
        let pad = (max - min) * 0.05;
        (if min < 0.0 { min - pad } else { min }, max + pad)
    }

    fn map_y(val: f64, y_min: f64, y_max: f64, plot_y: i32, plot_h: i32) -> i32 {
        let frac = (val - y_min) / (y_max - y_min);
        plot_y + plot_h - (frac * plot_h as f64).round() as i32
    }
}
