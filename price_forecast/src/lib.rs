//! # Price Forecast
//!
//! One-step-ahead price forecasting with a stacked LSTM.
//!
//! ## Features
//!
//! - Sliding windows over a price series with a chronological train/test split
//! - Min-max scaling, fitted on the full series or on the training span only
//! - LSTM layers with backpropagation through time, dropout, dense head
//!   and the Adam optimizer, all on `ndarray`
//! - Mini-batch training with a trailing validation split and early stopping
//! - Hold-out evaluation (MSE, MAE, RMSE, R²) in original price units
//! - JSON model and metrics artifacts, forecast and training-loss plots
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use price_forecast::{forecast_asset, ForecastPaths, ForecastSettings};
//! use std::path::PathBuf;
//!
//! let prices: Vec<f64> = (100..300).map(f64::from).collect();
//! let paths = ForecastPaths {
//!     model: PathBuf::from("models/bitcoin_lstm.json"),
//!     metrics: PathBuf::from("models/bitcoin_metrics.json"),
//!     forecast_plot: PathBuf::from("plots/bitcoin_forecast.png"),
//!     training_plot: PathBuf::from("plots/bitcoin_training.png"),
//! };
//!
//! let outcome = forecast_asset("bitcoin", &prices, &ForecastSettings::default(), &paths)?;
//! println!("{}", outcome.report.metrics);
//! # Ok::<(), price_forecast::ForecastError>(())
//! ```

pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod model;
pub mod persistence;
pub mod scaler;
pub mod trainer;
pub mod window;

// Re-export commonly used types
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{evaluate, EvaluationReport};
pub use crate::metrics::ForecastMetrics;
pub use crate::model::{LstmModel, ModelConfig, SequenceModel};
pub use crate::persistence::{ForecastPaths, MetricsRecord};
pub use crate::scaler::{MinMaxScaler, ScalerFit};
pub use crate::trainer::{fit, TrainingConfig, TrainingHistory};
pub use crate::window::{chronological_split, make_windows, Windows};

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Everything the forecaster needs besides the prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub window_len: usize,
    pub test_fraction: f64,
    pub scaler_fit: ScalerFit,
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            window_len: 30,
            test_fraction: 0.2,
            scaler_fit: ScalerFit::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<()> {
        if self.window_len == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window length must be positive".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        self.model.validate()?;
        self.training.validate()
    }
}

/// Result of forecasting one asset
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub report: EvaluationReport,
    pub history: TrainingHistory,
    /// Forecast for the period after the last observed price
    pub next_price: Option<f64>,
    /// Artifacts that could not be written
    pub artifact_errors: Vec<String>,
}

/// Fit the scaler on the span chosen by `settings.scaler_fit`
fn fit_scaler(prices: &[f64], settings: &ForecastSettings, train_windows: usize) -> Result<MinMaxScaler> {
    let mut scaler = MinMaxScaler::default();
    match settings.scaler_fit {
        ScalerFit::FullSeries => scaler.fit(prices)?,
        // training windows read prices[..train_windows + L]
        ScalerFit::TrainOnly => scaler.fit(&prices[..train_windows + settings.window_len])?,
    }
    Ok(scaler)
}

/// Scale, window, train, evaluate and persist one asset's prices
pub fn forecast_asset(
    asset: &str,
    prices: &[f64],
    settings: &ForecastSettings,
    paths: &ForecastPaths,
) -> Result<ForecastOutcome> {
    settings.validate()?;
    let count = prices.len().saturating_sub(settings.window_len);
    if count == 0 {
        return Err(ForecastError::too_short(prices.len(), settings.window_len));
    }
    let train_windows = window::train_size(count, settings.test_fraction);
    if train_windows == 0 || train_windows == count {
        return Err(ForecastError::InsufficientData(format!(
            "{}: {} windows cannot be split with test fraction {}",
            asset, count, settings.test_fraction
        )));
    }
    info!(
        "{}: forecasting from {} prices, {} windows of {}",
        asset,
        prices.len(),
        count,
        settings.window_len
    );

    let scaler = fit_scaler(prices, settings, train_windows)?;
    let scaled = scaler.transform(prices)?;
    let windows = make_windows(&scaled, settings.window_len)?;
    windows.require_non_empty(prices.len())?;
    let (train, test) = chronological_split(&windows, settings.test_fraction)?;

    let mut model = LstmModel::new(settings.model.clone(), settings.window_len)?;
    let history = fit(&mut model, &train, &settings.training)?;
    let model = model.with_scaler(scaler.clone());

    let report = evaluate(asset, &model, &test, &scaler)?;
    let next_price = match model.forecast_next(prices) {
        Ok(price) => Some(price),
        Err(e) => {
            warn!("{}: no next-period forecast: {}", asset, e);
            None
        }
    };

    let record = MetricsRecord {
        metrics: report.metrics.clone(),
        baseline: report.baseline.clone(),
        epochs: history.epochs(),
        best_epoch: history.best_epoch,
        stopped_early: history.stopped_early,
        next_price,
    };
    let artifact_errors = persistence::write_artifacts(&model, &record, &report, &history, paths);

    Ok(ForecastOutcome {
        report,
        history,
        next_price,
        artifact_errors,
    })
}
