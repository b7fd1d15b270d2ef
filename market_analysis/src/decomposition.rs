//! Classical additive seasonal decomposition

use crate::error::{AnalysisError, Result};
use series_math::statistics::variance;

/// `y = trend + seasonal + residual`
///
/// The centered moving average leaves `period / 2` positions at each end
/// without a trend; those positions carry `None` for trend and residual.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub period: usize,
    pub trend: Vec<Option<f64>>,
    /// Seasonal index per position, zero mean over one period
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

impl Decomposition {
    /// Share of detrended variance explained by seasonality, in `[0, 1]`
    pub fn seasonal_strength(&self) -> Option<f64> {
        let residual: Vec<f64> = self.residual.iter().flatten().copied().collect();
        let detrended: Vec<f64> = self
            .residual
            .iter()
            .zip(&self.seasonal)
            .filter_map(|(r, s)| r.map(|r| r + s))
            .collect();

        let var_r = variance(&residual).ok()?;
        let var_sr = variance(&detrended).ok()?;
        if var_sr == 0.0 {
            return None;
        }
        Some((1.0 - var_r / var_sr).max(0.0))
    }
}

/// Decompose `data` with a season of `period` observations
///
/// Needs at least two full periods.
pub fn decompose(data: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(AnalysisError::InvalidParameter(format!(
            "Seasonal period must be at least 2, got {}",
            period
        )));
    }
    let n = data.len();
    if n < period * 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Decomposition with period {} needs {} observations, have {}",
            period,
            period * 2,
            n
        )));
    }

    let trend = centered_moving_average(data, period);

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, (y, t)) in data.iter().zip(&trend).enumerate() {
        if let Some(t) = t {
            sums[i % period] += y - t;
            counts[i % period] += 1;
        }
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|s| *s -= offset);

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let residual = data
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, t), s)| t.map(|t| y - t - s))
        .collect();

    Ok(Decomposition {
        period,
        trend,
        seasonal,
        residual,
    })
}

/// Moving average centered on each position; a 2xp average for even periods
fn centered_moving_average(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let half = period / 2;
    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            if period % 2 == 1 {
                let window = &data[i - half..=i + half];
                Some(window.iter().sum::<f64>() / period as f64)
            } else {
                // half weights on both ends of a period + 1 window
                let window = &data[i - half..=i + half];
                let inner: f64 = window[1..period].iter().sum();
                Some((inner + 0.5 * (window[0] + window[period])) / period as f64)
            }
        })
        .collect()
}
