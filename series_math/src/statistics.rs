//! Descriptive statistics and return calculations
//!
//! Variance and standard deviation use the sample (`n - 1`) denominator,
//! matching the rolling indicators.

use crate::{MathError, Result};

fn require_len(values: &[f64], min: usize, what: &str) -> Result<()> {
    if values.len() < min {
        return Err(MathError::InsufficientData(format!(
            "{} needs at least {} values, have {}",
            what,
            min,
            values.len()
        )));
    }
    Ok(())
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    require_len(values, 1, "Mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance
pub fn variance(values: &[f64]) -> Result<f64> {
    require_len(values, 2, "Variance")?;
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Ok(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation
pub fn std_dev(values: &[f64]) -> Result<f64> {
    Ok(variance(values)?.sqrt())
}

/// Linear-interpolated quantile, `q` in `[0, 1]`
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    require_len(values, 1, "Quantile")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Sample skewness (adjusted Fisher-Pearson)
pub fn skewness(values: &[f64]) -> Result<f64> {
    require_len(values, 3, "Skewness")?;
    let n = values.len() as f64;
    let m = mean(values)?;
    let s = std_dev(values)?;
    if s == 0.0 {
        return Ok(0.0);
    }
    let sum3: f64 = values.iter().map(|v| ((v - m) / s).powi(3)).sum();
    Ok(n / ((n - 1.0) * (n - 2.0)) * sum3)
}

/// Sample excess kurtosis (bias corrected)
pub fn excess_kurtosis(values: &[f64]) -> Result<f64> {
    require_len(values, 4, "Kurtosis")?;
    let n = values.len() as f64;
    let m = mean(values)?;
    let s = std_dev(values)?;
    if s == 0.0 {
        return Ok(0.0);
    }
    let sum4: f64 = values.iter().map(|v| ((v - m) / s).powi(4)).sum();
    let a = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
    let b = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Ok(a * sum4 - b)
}

/// Pearson correlation of two equally long series
///
/// Returns `NaN` when either series has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(MathError::InvalidInput(format!(
            "Series lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    require_len(a, 2, "Correlation")?;

    let ma = mean(a)?;
    let mb = mean(b)?;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }

    if va == 0.0 || vb == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(cov / (va.sqrt() * vb.sqrt()))
}

/// Percent change over `periods`, aligned with the input
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return None;
            }
            let base = values[i - periods];
            if base == 0.0 {
                None
            } else {
                Some(values[i] / base - 1.0)
            }
        })
        .collect()
}

/// Log returns `ln(p[i] / p[i-1])`, one shorter than the input
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if prices.iter().any(|p| *p <= 0.0) {
        return Err(MathError::InvalidInput(
            "Log returns need strictly positive prices".to_string(),
        ));
    }
    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Largest peak-to-trough decline of a price path, as a fraction
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for &p in prices {
        peak = peak.max(p);
        if peak > 0.0 {
            worst = worst.max((peak - p) / peak);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_mean_and_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&v).unwrap(), 5.0);
        assert_relative_eq!(variance(&v).unwrap(), 32.0 / 7.0, epsilon = 1e-12);
        assert!(variance(&[1.0]).is_err());
        assert!(mean(&[]).is_err());
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.5, 2.5)]
    #[case(0.25, 1.75)]
    #[case(1.0, 4.0)]
    fn test_quantile(#[case] q: f64, #[case] expected: f64) {
        assert_relative_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], q).unwrap(), expected);
    }

    #[test]
    fn test_symmetric_data_has_zero_skew() {
        assert_relative_eq!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson(&a, &b).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&a, &c).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&a, &[1.0; 4]).unwrap().is_nan());
        assert!(pearson(&a, &[1.0]).is_err());
    }

    #[test]
    fn test_pct_change() {
        let out = pct_change(&[100.0, 110.0, 99.0], 1);
        assert_eq!(out[0], None);
        assert_relative_eq!(out[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(out[2].unwrap(), -0.1, epsilon = 1e-12);
        assert_eq!(pct_change(&[1.0, 2.0], 2), vec![None, None]);
    }

    #[test]
    fn test_log_returns_and_drawdown() {
        let r = log_returns(&[1.0, std::f64::consts::E]).unwrap();
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-12);
        assert!(log_returns(&[1.0, 0.0]).is_err());
        assert_relative_eq!(max_drawdown(&[100.0, 120.0, 90.0, 130.0]), 0.25);
    }
}
