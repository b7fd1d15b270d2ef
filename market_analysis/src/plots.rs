//! PNG figures for the analysis stage

use crate::analysis::AssetAnalysis;
use crate::correlation::CorrelationMatrix;
use crate::error::{AnalysisError, Result};
use market_data::chart::{self, colors, BarChart, ChartConfig, Heatmap, LineChart};
use series_math::moving_averages::sma_series;
use std::path::Path;

/// Price with its 7- and 30-day moving averages
pub fn price_plot(analysis: &AssetAnalysis, path: &Path) -> Result<()> {
    let prices = &analysis.prices;
    LineChart::new(ChartConfig::default())
        .line(prices, colors::BLUE)
        .sparse_line(sma_series(prices, 7)?, colors::ORANGE)
        .sparse_line(sma_series(prices, 30)?, colors::RED)
        .save(path)?;
    Ok(())
}

/// ACF bars with the white-noise band
pub fn acf_plot(analysis: &AssetAnalysis, path: &Path) -> Result<()> {
    if analysis.acf.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "{}: no autocorrelations to plot",
            analysis.asset
        )));
    }
    BarChart::new(ChartConfig::default(), &analysis.acf)
        .color(colors::BLUE)
        .symmetric_band(analysis.acf_bound)
        .save(path)?;
    Ok(())
}

/// Observed, trend, seasonal and residual panels stacked vertically
pub fn decomposition_plot(analysis: &AssetAnalysis, path: &Path) -> Result<()> {
    let d = analysis.decomposition.as_ref().ok_or_else(|| {
        AnalysisError::InsufficientData(format!(
            "{}: no decomposition to plot",
            analysis.asset
        ))
    })?;

    let panel = ChartConfig::sized(900, 200);
    let panels = vec![
        LineChart::new(panel.clone())
            .line(&analysis.prices, colors::BLUE)
            .render()?,
        LineChart::new(panel.clone())
            .sparse_line(d.trend.clone(), colors::ORANGE)
            .render()?,
        LineChart::new(panel.clone())
            .line(&d.seasonal, colors::GREEN)
            .render()?,
        LineChart::new(panel)
            .sparse_line(d.residual.clone(), colors::PURPLE)
            .reference_line(0.0, colors::GRAY)
            .render()?,
    ];
    chart::save_png(&chart::stack_vertical(&panels)?, path)?;
    Ok(())
}

/// Correlation matrix heatmap, assets in matrix order
pub fn correlation_plot(matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
    let side = 120 * matrix.assets.len() as u32 + 60;
    Heatmap::new(ChartConfig::sized(side, side), matrix.values.clone()).save(path)?;
    Ok(())
}
