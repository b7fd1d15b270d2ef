//! Minimal PNG charts rendered directly onto an `RgbImage`
//!
//! No fonts or axis labels: each chart is a plot area with a frame,
//! light grid lines and coloured series. Good enough to eyeball a price
//! history, an ACF, a forecast overlay or a correlation matrix.

use crate::error::{DataError, Result};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([225, 225, 225]);
    pub const GRAY: Rgb<u8> = Rgb([150, 150, 150]);
    pub const BLUE: Rgb<u8> = Rgb([33, 150, 243]);
    pub const ORANGE: Rgb<u8> = Rgb([255, 152, 0]);
    pub const GREEN: Rgb<u8> = Rgb([0, 170, 70]);
    pub const RED: Rgb<u8> = Rgb([230, 60, 60]);
    pub const PURPLE: Rgb<u8> = Rgb([140, 80, 200]);
}

/// Canvas settings shared by all charts
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: Rgb<u8>,
    pub frame: Rgb<u8>,
    pub grid: Rgb<u8>,
    /// Horizontal grid lines inside the plot area
    pub grid_lines: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 450,
            margin: 30,
            background: colors::WHITE,
            frame: colors::GRAY,
            grid: colors::LIGHT_GRAY,
            grid_lines: 4,
        }
    }
}

impl ChartConfig {
    /// Same settings with another canvas size
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    fn plot_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin).max(1)
    }

    fn plot_height(&self) -> u32 {
        self.height.saturating_sub(2 * self.margin).max(1)
    }
}

/// Maps data coordinates to pixels inside the plot area
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn new(config: &ChartConfig, x_count: usize, y_min: f64, y_max: f64) -> Self {
        // A flat series still needs a non-zero span
        let (y_min, y_max) = if (y_max - y_min).abs() < f64::EPSILON {
            (y_min - 1.0, y_max + 1.0)
        } else {
            (y_min, y_max)
        };
        Self {
            left: config.margin as f64,
            top: config.margin as f64,
            width: config.plot_width() as f64,
            height: config.plot_height() as f64,
            x_max: (x_count.saturating_sub(1)).max(1) as f64,
            y_min,
            y_max,
        }
    }

    fn x(&self, index: f64) -> f64 {
        self.left + index / self.x_max * (self.width - 1.0)
    }

    fn y(&self, value: f64) -> f64 {
        let t = (value - self.y_min) / (self.y_max - self.y_min);
        self.top + (1.0 - t) * (self.height - 1.0)
    }
}

/// One line on a [`LineChart`]
///
/// Gaps (`None`) break the line; a forecast can be drawn on the same
/// x axis as the history by leading with `None`.
#[derive(Debug, Clone)]
pub struct Series {
    pub values: Vec<Option<f64>>,
    pub color: Rgb<u8>,
}

/// Multi-series line chart
#[derive(Debug, Clone, Default)]
pub struct LineChart {
    config: ChartConfig,
    series: Vec<Series>,
    reference_lines: Vec<(f64, Rgb<u8>)>,
}

impl LineChart {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            series: Vec::new(),
            reference_lines: Vec::new(),
        }
    }

    /// Add a fully populated series
    pub fn line(self, values: &[f64], color: Rgb<u8>) -> Self {
        self.sparse_line(values.iter().map(|&v| Some(v)).collect(), color)
    }

    /// Add a series with gaps
    pub fn sparse_line(mut self, values: Vec<Option<f64>>, color: Rgb<u8>) -> Self {
        self.series.push(Series { values, color });
        self
    }

    /// Add a horizontal line at `value`
    pub fn reference_line(mut self, value: f64, color: Rgb<u8>) -> Self {
        self.reference_lines.push((value, color));
        self
    }

    /// Draw into a new image
    pub fn render(&self) -> Result<RgbImage> {
        let x_count = self.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        let (y_min, y_max) = value_range(
            self.series
                .iter()
                .flat_map(|s| s.values.iter().flatten().copied())
                .chain(self.reference_lines.iter().map(|(v, _)| *v)),
        )
        .ok_or_else(|| DataError::DataError("Line chart has no finite values".to_string()))?;

        let frame = Frame::new(&self.config, x_count, y_min, y_max);
        let mut img = blank_canvas(&self.config);

        for &(value, color) in &self.reference_lines {
            let y = frame.y(value);
            draw_line(&mut img, frame.left, y, frame.left + frame.width - 1.0, y, color);
        }

        for series in &self.series {
            let mut previous: Option<(f64, f64)> = None;
            for (i, value) in series.values.iter().enumerate() {
                match value.filter(|v| v.is_finite()) {
                    Some(v) => {
                        let point = (frame.x(i as f64), frame.y(v));
                        match previous {
                            Some((px, py)) => {
                                draw_line(&mut img, px, py, point.0, point.1, series.color)
                            }
                            None => put_pixel_f(&mut img, point.0, point.1, series.color),
                        }
                        previous = Some(point);
                    }
                    None => previous = None,
                }
            }
        }

        Ok(img)
    }

    /// Render and write a PNG
    pub fn save(&self, path: &Path) -> Result<()> {
        save_png(&self.render()?, path)
    }
}

/// Vertical bars from a zero baseline, e.g. an autocorrelation function
#[derive(Debug, Clone, Default)]
pub struct BarChart {
    config: ChartConfig,
    values: Vec<f64>,
    color: Option<Rgb<u8>>,
    bands: Vec<f64>,
}

impl BarChart {
    pub fn new(config: ChartConfig, values: &[f64]) -> Self {
        Self {
            config,
            values: values.to_vec(),
            color: None,
            bands: Vec::new(),
        }
    }

    pub fn color(mut self, color: Rgb<u8>) -> Self {
        self.color = Some(color);
        self
    }

    /// Draw dashed lines at `+bound` and `-bound`
    pub fn symmetric_band(mut self, bound: f64) -> Self {
        self.bands.push(bound.abs());
        self
    }

    pub fn render(&self) -> Result<RgbImage> {
        if self.values.is_empty() {
            return Err(DataError::DataError("Bar chart has no values".to_string()));
        }

        let (mut y_min, mut y_max) = value_range(
            self.values
                .iter()
                .copied()
                .chain(self.bands.iter().flat_map(|&b| [b, -b])),
        )
        .ok_or_else(|| DataError::DataError("Bar chart has no finite values".to_string()))?;
        y_min = y_min.min(0.0);
        y_max = y_max.max(0.0);

        let mut img = blank_canvas(&self.config);
        // Bars sit between grid positions, so leave half a slot at each end
        let slots = self.values.len() + 1;
        let frame = Frame::new(&self.config, slots, y_min, y_max);
        let bar_color = self.color.unwrap_or(colors::BLUE);
        let half_width = ((frame.width / slots as f64) * 0.35).max(0.5);

        let zero = frame.y(0.0);
        draw_line(
            &mut img,
            frame.left,
            zero,
            frame.left + frame.width - 1.0,
            zero,
            colors::BLACK,
        );

        for &bound in &self.bands {
            for level in [bound, -bound] {
                draw_dashed_hline(&mut img, &frame, frame.y(level), colors::RED);
            }
        }

        for (i, &value) in self.values.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }
            let center = frame.x(i as f64 + 0.5);
            let top = frame.y(value).min(zero);
            let bottom = frame.y(value).max(zero);
            let x0 = (center - half_width).round().max(0.0) as u32;
            let x1 = (center + half_width).round().max(0.0) as u32;
            let y0 = top.round().max(0.0) as u32;
            let y1 = bottom.round().max(0.0) as u32;
            draw_filled_rect(
                &mut img,
                x0,
                y0,
                (x1 - x0).max(1),
                (y1 - y0).max(1),
                bar_color,
            );
        }

        Ok(img)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_png(&self.render()?, path)
    }
}

/// Square matrix of values in `[-1, 1]`, e.g. correlations
#[derive(Debug, Clone)]
pub struct Heatmap {
    config: ChartConfig,
    matrix: Vec<Vec<f64>>,
}

impl Heatmap {
    pub fn new(config: ChartConfig, matrix: Vec<Vec<f64>>) -> Self {
        Self { config, matrix }
    }

    pub fn render(&self) -> Result<RgbImage> {
        let n = self.matrix.len();
        if n == 0 || self.matrix.iter().any(|row| row.len() != n) {
            return Err(DataError::InvalidParameter(
                "Heatmap needs a non-empty square matrix".to_string(),
            ));
        }

        let mut img = blank_canvas(&self.config);
        let cell_w = self.config.plot_width() / n as u32;
        let cell_h = self.config.plot_height() / n as u32;

        for (r, row) in self.matrix.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                let color = if value.is_finite() {
                    diverging_color(value)
                } else {
                    colors::LIGHT_GRAY
                };
                draw_filled_rect(
                    &mut img,
                    self.config.margin + c as u32 * cell_w,
                    self.config.margin + r as u32 * cell_h,
                    cell_w.max(1),
                    cell_h.max(1),
                    color,
                );
            }
        }

        Ok(img)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_png(&self.render()?, path)
    }
}

/// Stack images top to bottom, e.g. the panels of a decomposition
pub fn stack_vertical(panels: &[RgbImage]) -> Result<RgbImage> {
    if panels.is_empty() {
        return Err(DataError::DataError("No panels to stack".to_string()));
    }
    let width = panels.iter().map(|p| p.width()).max().unwrap_or(0);
    let height = panels.iter().map(|p| p.height()).sum();
    let mut out = RgbImage::from_pixel(width, height, colors::WHITE);

    let mut offset = 0;
    for panel in panels {
        for (x, y, pixel) in panel.enumerate_pixels() {
            out.put_pixel(x, y + offset, *pixel);
        }
        offset += panel.height();
    }
    Ok(out)
}

/// Write an image as PNG, creating the parent directory
pub fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Blue for -1, white for 0, red for +1
pub fn diverging_color(value: f64) -> Rgb<u8> {
    let v = value.clamp(-1.0, 1.0);
    if v < 0.0 {
        interpolate_color(colors::WHITE, Rgb([40, 90, 200]), -v)
    } else {
        interpolate_color(colors::WHITE, Rgb([200, 40, 40]), v)
    }
}

/// Interpolate between two colors
pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgb([
        ((1.0 - t) * c1.0[0] as f64 + t * c2.0[0] as f64) as u8,
        ((1.0 - t) * c1.0[1] as f64 + t * c2.0[1] as f64) as u8,
        ((1.0 - t) * c1.0[2] as f64 + t * c2.0[2] as f64) as u8,
    ])
}

fn value_range<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn blank_canvas(config: &ChartConfig) -> RgbImage {
    let mut img = RgbImage::from_pixel(config.width, config.height, config.background);
    let left = config.margin;
    let top = config.margin;
    let right = left + config.plot_width() - 1;
    let bottom = top + config.plot_height() - 1;

    for i in 1..=config.grid_lines {
        let y = top + i * config.plot_height() / (config.grid_lines + 1);
        draw_horizontal_line(&mut img, y, left, right, config.grid);
    }

    draw_horizontal_line(&mut img, top, left, right, config.frame);
    draw_horizontal_line(&mut img, bottom, left, right, config.frame);
    draw_vertical_line(&mut img, left, top, bottom, config.frame);
    draw_vertical_line(&mut img, right, top, bottom, config.frame);
    img
}

fn put_pixel_f(img: &mut RgbImage, x: f64, y: f64, color: Rgb<u8>) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (px, py) = (x.round() as u32, y.round() as u32);
    if px < img.width() && py < img.height() {
        img.put_pixel(px, py, color);
    }
}

/// Straight line between two points (DDA)
fn draw_line(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        put_pixel_f(img, x0 + t * (x1 - x0), y0 + t * (y1 - y0), color);
    }
}

fn draw_dashed_hline(img: &mut RgbImage, frame: &Frame, y: f64, color: Rgb<u8>) {
    let start = frame.left as u32;
    let end = (frame.left + frame.width) as u32;
    for x in (start..end).filter(|x| (x / 6) % 2 == 0) {
        put_pixel_f(img, x as f64, y, color);
    }
}

fn draw_filled_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let img_width = img.width();
    let img_height = img.height();

    for dy in 0..height {
        for dx in 0..width {
            let px = x + dx;
            let py = y + dy;
            if px < img_width && py < img_height {
                img.put_pixel(px, py, color);
            }
        }
    }
}

fn draw_vertical_line(img: &mut RgbImage, x: u32, y1: u32, y2: u32, color: Rgb<u8>) {
    let (start, end) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    if x < img.width() && img.height() > 0 {
        for y in start..=end.min(img.height() - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_horizontal_line(img: &mut RgbImage, y: u32, x1: u32, x2: u32, color: Rgb<u8>) {
    let (start, end) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    if y < img.height() && img.width() > 0 {
        for x in start..=end.min(img.width() - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_chart_renders_configured_size() {
        let chart = LineChart::new(ChartConfig::sized(200, 100))
            .line(&[1.0, 3.0, 2.0, 5.0], colors::BLUE)
            .sparse_line(vec![None, None, Some(2.5), Some(4.0)], colors::ORANGE);
        let img = chart.render().unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        assert!(img.pixels().any(|p| *p == colors::BLUE));
        assert!(img.pixels().any(|p| *p == colors::ORANGE));
    }

    #[test]
    fn test_line_chart_without_values_fails() {
        let chart = LineChart::new(ChartConfig::default()).line(&[f64::NAN], colors::BLUE);
        assert!(matches!(chart.render(), Err(DataError::DataError(_))));
    }

    #[test]
    fn test_flat_series_still_renders() {
        let chart = LineChart::new(ChartConfig::sized(120, 80)).line(&[2.0; 5], colors::GREEN);
        assert!(chart.render().is_ok());
    }

    #[test]
    fn test_bar_chart_draws_bars_and_bands() {
        let chart = BarChart::new(ChartConfig::sized(200, 100), &[1.0, -0.4, 0.2])
            .color(colors::PURPLE)
            .symmetric_band(0.3);
        let img = chart.render().unwrap();
        assert!(img.pixels().any(|p| *p == colors::PURPLE));
        assert!(img.pixels().any(|p| *p == colors::RED));
    }

    #[test]
    fn test_heatmap_requires_square_matrix() {
        let bad = Heatmap::new(ChartConfig::default(), vec![vec![1.0, 0.5]]);
        assert!(bad.render().is_err());

        let good = Heatmap::new(
            ChartConfig::sized(100, 100),
            vec![vec![1.0, -1.0], vec![-1.0, 1.0]],
        );
        assert!(good.render().is_ok());
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(0.0), colors::WHITE);
        assert_eq!(diverging_color(1.0), Rgb([200, 40, 40]));
        assert_eq!(diverging_color(-2.0), Rgb([40, 90, 200]));
    }

    #[test]
    fn test_stack_vertical_sums_heights() {
        let a = RgbImage::new(10, 5);
        let b = RgbImage::new(8, 7);
        let stacked = stack_vertical(&[a, b]).unwrap();
        assert_eq!(stacked.dimensions(), (10, 12));
    }
}
