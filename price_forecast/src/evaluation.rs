//! Hold-out evaluation in original price units

use crate::error::{ForecastError, Result};
use crate::metrics::ForecastMetrics;
use crate::model::{LastValue, SequenceModel};
use crate::scaler::MinMaxScaler;
use crate::window::Windows;
use log::info;

/// Predictions and metrics over the test span
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub metrics: ForecastMetrics,
    /// Same metrics for predicting the last value of each window
    pub baseline: ForecastMetrics,
    /// Test targets, original units
    pub actual: Vec<f64>,
    /// Model predictions, original units
    pub predicted: Vec<f64>,
}

/// Predict the test windows, undo the scaling on both predictions and
/// truth, then score
pub fn evaluate<M: SequenceModel>(
    asset: &str,
    model: &M,
    test: &Windows,
    scaler: &MinMaxScaler,
) -> Result<EvaluationReport> {
    if test.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "{}: no test windows to evaluate on",
            asset
        )));
    }

    let predicted = scaler.inverse_transform(&model.predict(&test.inputs)?.to_vec())?;
    let actual = scaler.inverse_transform(&test.targets.to_vec())?;
    let naive = LastValue {
        window_len: test.window_len(),
    };
    let naive_predicted = scaler.inverse_transform(&naive.predict(&test.inputs)?.to_vec())?;

    let metrics = ForecastMetrics::compute(asset, &actual, &predicted)?;
    let baseline = ForecastMetrics::compute(asset, &actual, &naive_predicted)?;
    info!(
        "{}: {} test MAE {:.4} (last-value baseline {:.4}), R2 {:.4}",
        asset,
        model.name(),
        metrics.mae,
        baseline.mae,
        metrics.r2
    );

    Ok(EvaluationReport {
        metrics,
        baseline,
        actual,
        predicted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::make_windows;
    use approx::assert_relative_eq;

    #[test]
    fn test_baseline_scored_in_original_units() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + 10.0 * i as f64).collect();
        let mut scaler = MinMaxScaler::default();
        let scaled = scaler.fit_transform(&prices).unwrap();
        let windows = make_windows(&scaled, 4).unwrap();

        let model = LastValue { window_len: 4 };
        let report = evaluate("bitcoin", &model, &windows, &scaler).unwrap();

        assert_eq!(report.actual.len(), 16);
        assert_relative_eq!(report.actual[0], 140.0, epsilon = 1e-9);
        assert_relative_eq!(report.metrics.mae, 10.0, epsilon = 1e-9);
        assert_relative_eq!(report.metrics.rmse, 10.0, epsilon = 1e-9);
        assert_eq!(report.metrics, report.baseline);
    }

    #[test]
    fn test_empty_test_set() {
        let mut scaler = MinMaxScaler::default();
        scaler.fit(&[1.0, 2.0]).unwrap();
        let err = evaluate("eth", &LastValue { window_len: 3 }, &Windows::empty(3), &scaler).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
    }
}
