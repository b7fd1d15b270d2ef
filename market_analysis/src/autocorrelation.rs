//! Autocorrelation, partial autocorrelation and the Ljung-Box test

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use series_math::statistics::mean;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Sample autocorrelation for lags `0..=max_lag`
///
/// Uses the biased (`1/n`) autocovariance so the sequence is positive
/// definite. Lag 0 is always 1; a constant series yields `NaN` beyond it.
pub fn acf(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let n = data.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "ACF needs at least 2 observations, have {}",
            n
        )));
    }

    let max_lag = max_lag.min(n - 1);
    let m = mean(data)?;
    let denom: f64 = data.iter().map(|v| (v - m).powi(2)).sum();

    Ok((0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                return 1.0;
            }
            if denom == 0.0 {
                return f64::NAN;
            }
            let num: f64 = data[lag..]
                .iter()
                .zip(&data[..n - lag])
                .map(|(a, b)| (a - m) * (b - m))
                .sum();
            num / denom
        })
        .collect())
}

/// Partial autocorrelation via the Durbin-Levinson recursion
pub fn pacf(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let rho = acf(data, max_lag)?;
    let max_lag = rho.len() - 1;
    let mut out = vec![f64::NAN; max_lag + 1];
    out[0] = 1.0;
    if max_lag == 0 || rho[1].is_nan() {
        return Ok(out);
    }

    let mut phi_prev = vec![0.0; max_lag + 1];
    phi_prev[1] = rho[1];
    out[1] = rho[1];

    for k in 2..=max_lag {
        let num = rho[k] - (1..k).map(|j| phi_prev[j] * rho[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi_prev[j] * rho[j]).sum::<f64>();
        if den.abs() < 1e-12 {
            break;
        }

        let phi_kk = num / den;
        let mut phi = vec![0.0; max_lag + 1];
        for j in 1..k {
            phi[j] = phi_prev[j] - phi_kk * phi_prev[k - j];
        }
        phi[k] = phi_kk;
        out[k] = phi_kk;
        phi_prev = phi;
    }

    Ok(out)
}

/// Half-width of the white-noise band for ACF/PACF at the given confidence
pub fn confidence_bound(n: usize, confidence: f64) -> f64 {
    let z = match confidence {
        c if c >= 0.99 => 2.576,
        c if c >= 0.95 => 1.96,
        c if c >= 0.90 => 1.645,
        _ => 1.96,
    };
    z / (n.max(1) as f64).sqrt()
}

/// Ljung-Box portmanteau test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LjungBox {
    pub lags: usize,
    pub statistic: f64,
    pub p_value: f64,
    /// Autocorrelation detected at the 5% level
    pub significant: bool,
}

/// `Q = n(n+2) * sum(rho_k^2 / (n-k))`, compared with chi-squared(lags)
pub fn ljung_box(data: &[f64], lags: usize) -> Result<LjungBox> {
    let n = data.len();
    if lags == 0 || lags >= n {
        return Err(AnalysisError::InvalidParameter(format!(
            "Ljung-Box lags must be in 1..{}, got {}",
            n, lags
        )));
    }

    let rho = acf(data, lags)?;
    let sum: f64 = rho
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, r)| r * r / (n - k) as f64)
        .sum();
    let statistic = n as f64 * (n + 2) as f64 * sum;
    if !statistic.is_finite() {
        return Err(AnalysisError::CalculationError(
            "Ljung-Box statistic undefined for a constant series".to_string(),
        ));
    }

    let chi2 = ChiSquared::new(lags as f64)
        .map_err(|e| AnalysisError::CalculationError(e.to_string()))?;
    let p_value = 1.0 - chi2.cdf(statistic);

    Ok(LjungBox {
        lags,
        statistic,
        p_value,
        significant: p_value < 0.05,
    })
}
