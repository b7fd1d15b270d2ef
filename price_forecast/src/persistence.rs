//! Model, metrics and figures written after a forecast run

use crate::error::Result;
use crate::evaluation::EvaluationReport;
use crate::metrics::ForecastMetrics;
use crate::model::LstmModel;
use crate::trainer::TrainingHistory;
use log::warn;
use market_data::chart::{colors, ChartConfig, LineChart};
use market_data::storage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the artifacts of one asset go
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPaths {
    pub model: PathBuf,
    pub metrics: PathBuf,
    pub forecast_plot: PathBuf,
    pub training_plot: PathBuf,
}

/// Contents of `{asset}_metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub metrics: ForecastMetrics,
    pub baseline: ForecastMetrics,
    pub epochs: usize,
    pub best_epoch: usize,
    pub stopped_early: bool,
    /// One-step-ahead forecast from the latest window
    pub next_price: Option<f64>,
}

/// True vs. predicted prices over the test span
pub fn forecast_plot(report: &EvaluationReport, path: &Path) -> Result<()> {
    LineChart::new(ChartConfig::default())
        .line(&report.actual, colors::BLUE)
        .line(&report.predicted, colors::ORANGE)
        .save(path)?;
    Ok(())
}

/// Training and validation loss per epoch
pub fn training_plot(history: &TrainingHistory, path: &Path) -> Result<()> {
    let mut chart = LineChart::new(ChartConfig::default()).line(&history.loss, colors::BLUE);
    if !history.val_loss.is_empty() {
        chart = chart.line(&history.val_loss, colors::ORANGE);
    }
    chart.save(path)?;
    Ok(())
}

/// Write every artifact, collecting failures instead of stopping at
/// the first one
pub fn write_artifacts(
    model: &LstmModel,
    record: &MetricsRecord,
    report: &EvaluationReport,
    history: &TrainingHistory,
    paths: &ForecastPaths,
) -> Vec<String> {
    let attempts: [(&Path, Result<()>); 4] = [
        (paths.metrics.as_path(), storage::write_json(&paths.metrics, record).map_err(Into::into)),
        (paths.model.as_path(), model.save(&paths.model)),
        (paths.forecast_plot.as_path(), forecast_plot(report, &paths.forecast_plot)),
        (paths.training_plot.as_path(), training_plot(history, &paths.training_plot)),
    ];

    let mut errors = Vec::new();
    for (path, outcome) in attempts {
        if let Err(e) = outcome {
            warn!(
                "{}: could not write {}: {}",
                record.metrics.asset,
                path.display(),
                e
            );
            errors.push(format!("{}: {}", path.display(), e));
        }
    }
    errors
}
