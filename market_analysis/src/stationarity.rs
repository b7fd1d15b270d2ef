//! Unit root and stationarity tests
//!
//! ADF and KPSS have opposite null hypotheses: ADF assumes a unit root,
//! KPSS assumes stationarity. Reporting both makes the conclusion less
//! dependent on either test's power.

use crate::error::{AnalysisError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use series_math::statistics::{mean, std_dev};

/// Outcome of a single hypothesis test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub statistic: f64,
    /// Interpolated from the critical value table, so coarse in the tails
    pub p_value: f64,
    pub critical_values: Vec<(String, f64)>,
    /// Conclusion at the 5% level
    pub stationary: bool,
}

/// Deterministic terms removed before the KPSS statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpssTrend {
    /// Level stationarity
    Constant,
    /// Trend stationarity
    Linear,
}

const ADF_CRITICAL: [(&str, f64); 3] = [("1%", -3.43), ("5%", -2.86), ("10%", -2.57)];

/// Augmented Dickey-Fuller test with a constant
///
/// Regresses `dy_t` on `[1, y_{t-1}, dy_{t-1}, ..., dy_{t-k}]` and reports
/// the t-statistic of the `y_{t-1}` coefficient. `max_lag` defaults to
/// `floor(2 * n^(1/3))`, capped at `n / 4`.
pub fn adf_test(data: &[f64], max_lag: Option<usize>) -> Result<TestOutcome> {
    let n = data.len();
    if n < 10 {
        return Err(AnalysisError::InsufficientData(format!(
            "ADF test needs at least 10 observations, have {}",
            n
        )));
    }

    let diff: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let lag = max_lag
        .unwrap_or_else(|| ((n as f64).powf(1.0 / 3.0) * 2.0) as usize)
        .min(n / 4)
        .max(1);

    let rows = diff.len() - lag;
    let cols = 2 + lag;
    if rows <= cols + 1 {
        return Err(AnalysisError::InsufficientData(format!(
            "ADF regression with {} lags needs more than {} observations",
            lag, n
        )));
    }

    let mut x_data = Vec::with_capacity(rows * cols);
    for t in lag..diff.len() {
        x_data.push(1.0);
        x_data.push(data[t]);
        for i in 1..=lag {
            x_data.push(diff[t - i]);
        }
    }
    let x = DMatrix::from_row_slice(rows, cols, &x_data);
    let y = DVector::from_column_slice(&diff[lag..]);

    let xtx_inv = (x.transpose() * &x).try_inverse().ok_or_else(|| {
        AnalysisError::CalculationError("ADF regression matrix is singular".to_string())
    })?;
    let beta = &xtx_inv * (x.transpose() * &y);
    let residuals = &y - &x * &beta;
    let sigma2 = residuals.norm_squared() / (rows - cols) as f64;
    let se = (sigma2 * xtx_inv[(1, 1)]).sqrt();
    if !(se > 0.0) {
        return Err(AnalysisError::CalculationError(
            "ADF coefficient has zero standard error".to_string(),
        ));
    }

    let statistic = beta[1] / se;
    let p_value = adf_p_value(statistic, n);

    Ok(TestOutcome {
        name: format!("ADF (lags={})", lag),
        statistic,
        p_value,
        critical_values: critical(&ADF_CRITICAL),
        stationary: p_value < 0.05,
    })
}

/// Piecewise interpolation between small-sample adjusted critical values
fn adf_p_value(t_stat: f64, n: usize) -> f64 {
    let n = n as f64;
    let cv_1 = -3.43 - 6.0 / n;
    let cv_5 = -2.86 - 4.0 / n;
    let cv_10 = -2.57 - 3.0 / n;

    if t_stat < cv_1 {
        0.01 * (-(cv_1 - t_stat)).exp()
    } else if t_stat < cv_5 {
        0.01 + 0.04 * (t_stat - cv_1) / (cv_5 - cv_1)
    } else if t_stat < cv_10 {
        0.05 + 0.05 * (t_stat - cv_5) / (cv_10 - cv_5)
    } else {
        0.10 + 0.90 * (1.0 - (-0.5 * (t_stat - cv_10)).exp())
    }
}

/// KPSS test with a Newey-West long-run variance
pub fn kpss_test(data: &[f64], trend: KpssTrend) -> Result<TestOutcome> {
    let n = data.len();
    if n < 10 {
        return Err(AnalysisError::InsufficientData(format!(
            "KPSS test needs at least 10 observations, have {}",
            n
        )));
    }

    let residuals: Vec<f64> = match trend {
        KpssTrend::Constant => {
            let m = mean(data)?;
            data.iter().map(|y| y - m).collect()
        }
        KpssTrend::Linear => {
            let t_mean = (n - 1) as f64 / 2.0;
            let y_mean = mean(data)?;
            let (num, den) = data.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
                let dt = i as f64 - t_mean;
                (num + dt * (y - y_mean), den + dt * dt)
            });
            let slope = num / den;
            let intercept = y_mean - slope * t_mean;
            data.iter()
                .enumerate()
                .map(|(i, y)| y - intercept - slope * i as f64)
                .collect()
        }
    };

    let lag = (4.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let mut long_run = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for l in 1..=lag.min(n - 1) {
        let weight = 1.0 - l as f64 / (lag + 1) as f64;
        let gamma: f64 = residuals[l..]
            .iter()
            .zip(&residuals[..n - l])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run += 2.0 * weight * gamma;
    }
    if !(long_run > 0.0) {
        return Err(AnalysisError::CalculationError(
            "KPSS long-run variance is not positive".to_string(),
        ));
    }

    let mut cumulative = 0.0;
    let partial_sq: f64 = residuals
        .iter()
        .map(|r| {
            cumulative += r;
            cumulative * cumulative
        })
        .sum();
    let statistic = partial_sq / (n * n) as f64 / long_run;

    let table: [(&str, f64); 3] = match trend {
        KpssTrend::Constant => [("1%", 0.739), ("5%", 0.463), ("10%", 0.347)],
        KpssTrend::Linear => [("1%", 0.216), ("5%", 0.146), ("10%", 0.119)],
    };
    let (cv_1, cv_5, cv_10) = (table[0].1, table[1].1, table[2].1);

    let p_value = if statistic < cv_10 {
        0.10 + 0.90 * (1.0 - statistic / cv_10)
    } else if statistic < cv_5 {
        0.05 + 0.05 * (cv_5 - statistic) / (cv_5 - cv_10)
    } else if statistic < cv_1 {
        0.01 + 0.04 * (cv_1 - statistic) / (cv_1 - cv_5)
    } else {
        0.01 * (1.0 - (statistic - cv_1) / cv_1).max(0.0)
    };

    Ok(TestOutcome {
        name: match trend {
            KpssTrend::Constant => "KPSS (level)".to_string(),
            KpssTrend::Linear => "KPSS (trend)".to_string(),
        },
        statistic,
        p_value,
        critical_values: critical(&table),
        stationary: statistic < cv_5,
    })
}

/// Drift of rolling mean and rolling volatility across a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStationarity {
    pub window: usize,
    /// Coefficient of variation of the rolling means
    pub mean_variation: f64,
    /// Coefficient of variation of the rolling standard deviations
    pub std_variation: f64,
    pub stable_mean: bool,
    pub stable_variance: bool,
}

/// Compare rolling statistics across the series
///
/// Means are considered stable below 10% variation, standard deviations
/// below 30%.
pub fn rolling_stationarity(data: &[f64], window: usize) -> Result<RollingStationarity> {
    if window < 2 {
        return Err(AnalysisError::InvalidParameter(format!(
            "Rolling window must be at least 2, got {}",
            window
        )));
    }
    if data.len() < window * 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Rolling check with window {} needs {} observations, have {}",
            window,
            window * 2,
            data.len()
        )));
    }

    let means = data.windows(window).map(mean).collect::<std::result::Result<Vec<_>, _>>()?;
    let stds = data.windows(window).map(std_dev).collect::<std::result::Result<Vec<_>, _>>()?;

    let mean_variation = std_dev(&means)? / mean(&means)?.abs().max(1e-10);
    let std_variation = std_dev(&stds)? / mean(&stds)?.max(1e-10);

    Ok(RollingStationarity {
        window,
        mean_variation,
        std_variation,
        stable_mean: mean_variation < 0.1,
        stable_variance: std_variation < 0.3,
    })
}

fn critical(table: &[(&str, f64)]) -> Vec<(String, f64)> {
    table.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..n).map(|_| rng.gen_range(-0.5..0.5)).collect()
    }

    /// Random walk with drift
    fn random_walk(n: usize) -> Vec<f64> {
        noise(n)
            .into_iter()
            .scan(100.0, |level, step| {
                *level += 0.3 + step;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn test_adf_separates_noise_from_random_walk() {
        let stationary = adf_test(&noise(300), None).unwrap();
        assert!(stationary.stationary, "{:?}", stationary);
        assert!(stationary.statistic < -2.86);

        let walk = adf_test(&random_walk(300), None).unwrap();
        assert!(!walk.stationary, "{:?}", walk);
    }

    #[test]
    fn test_kpss_flags_trend_as_non_stationary() {
        let trending: Vec<f64> = noise(200)
            .iter()
            .enumerate()
            .map(|(i, e)| i as f64 + e)
            .collect();
        let level = kpss_test(&trending, KpssTrend::Constant).unwrap();
        assert!(!level.stationary);

        let around_trend = kpss_test(&trending, KpssTrend::Linear).unwrap();
        assert!(around_trend.statistic < level.statistic);
    }

    #[rstest]
    #[case(vec![1.0; 5])]
    #[case(vec![])]
    fn test_short_input_rejected(#[case] data: Vec<f64>) {
        assert!(matches!(
            adf_test(&data, None),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(matches!(
            kpss_test(&data, KpssTrend::Constant),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_rolling_check_on_stable_noise() {
        let data: Vec<f64> = noise(200).into_iter().map(|v| v + 10.0).collect();
        let check = rolling_stationarity(&data, 30).unwrap();
        assert!(check.stable_mean);
        assert!(rolling_stationarity(&data[..40], 30).is_err());
    }

    #[test]
    fn test_adf_p_value_is_monotone() {
        let p: Vec<f64> = [-6.0, -3.5, -3.0, -2.7, 0.0]
            .iter()
            .map(|&t| adf_p_value(t, 200))
            .collect();
        assert!(p.windows(2).all(|w| w[0] <= w[1]));
    }
}
