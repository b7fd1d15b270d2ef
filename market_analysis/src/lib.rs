//! # Market Analysis
//!
//! Exploratory statistics over processed price series: distribution
//! summaries, ADF and KPSS stationarity tests, ACF/PACF with Ljung-Box,
//! additive seasonal decomposition and cross-asset return correlation.
//! Output is side effects only: text reports and PNG plots.

pub mod analysis;
pub mod autocorrelation;
pub mod correlation;
pub mod decomposition;
pub mod descriptive;
pub mod error;
pub mod plots;
pub mod report;
pub mod stationarity;

pub use crate::analysis::{analyze_prices, analyze_table, AnalysisConfig, AssetAnalysis};
pub use crate::correlation::{return_correlation, CorrelationMatrix, PricePath};
pub use crate::error::{AnalysisError, Result};

use log::{info, warn};
use market_data::storage;
use std::path::{Path, PathBuf};

/// Where the artifacts of one analyzed asset go
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPaths {
    pub report: PathBuf,
    pub price_plot: PathBuf,
    pub acf_plot: PathBuf,
    pub decomposition_plot: PathBuf,
}

/// Write the report and plots of one asset
///
/// The report is written first; a plot that cannot be drawn is logged
/// and returned in the list of errors without stopping the others.
pub fn write_asset_artifacts(analysis: &AssetAnalysis, paths: &AnalysisPaths) -> Result<Vec<String>> {
    storage::write_text(&paths.report, &report::asset_report(analysis))?;

    let figures: [(&Path, fn(&AssetAnalysis, &Path) -> Result<()>); 3] = [
        (paths.price_plot.as_path(), plots::price_plot),
        (paths.acf_plot.as_path(), plots::acf_plot),
        (paths.decomposition_plot.as_path(), plots::decomposition_plot),
    ];

    let mut errors = Vec::new();
    for (path, draw) in figures {
        if let Err(e) = draw(analysis, path) {
            warn!("{}: could not write {}: {}", analysis.asset, path.display(), e);
            errors.push(format!("{}: {}", path.display(), e));
        }
    }

    info!(
        "{}: analysis written to {}",
        analysis.asset,
        paths.report.display()
    );
    Ok(errors)
}

/// Write the correlation report and heatmap
pub fn write_correlation_artifacts(
    matrix: &CorrelationMatrix,
    report_path: &Path,
    plot_path: &Path,
) -> Result<()> {
    storage::write_text(report_path, &report::correlation_report(matrix))?;
    plots::correlation_plot(matrix, plot_path)?;
    info!(
        "Correlation across {} assets written to {}",
        matrix.assets.len(),
        report_path.display()
    );
    Ok(())
}
