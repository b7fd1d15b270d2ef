//! Volatility indicator implementations
//!
//! Contains:
//! - Bollinger Bands (SMA ± k · rolling sample std)
//! - Annualized volatility of a return series

use crate::moving_averages::RollingStdDev;
use crate::statistics::std_dev;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// One Bollinger reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerPoint {
    /// Position of `price` inside the bands: 0 at the lower band, 1 at the upper
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width.abs() < f64::EPSILON {
            None
        } else {
            Some((price - self.lower) / width)
        }
    }
}

/// Bollinger Bands implementation
#[derive(Debug, Clone)]
pub struct BollingerBands {
    std_dev_multiplier: f64,
    rolling: RollingStdDev,
}

impl BollingerBands {
    /// Create a new Bollinger Bands with the specified parameters
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self> {
        if std_dev_multiplier <= 0.0 {
            return Err(MathError::InvalidInput(
                "Standard deviation multiplier must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            std_dev_multiplier,
            rolling: RollingStdDev::new(period)?,
        })
    }

    /// Update the Bollinger Bands with a new price value
    pub fn update(&mut self, price: f64) -> Result<()> {
        self.rolling.update(price)
    }

    /// Current bands
    pub fn point(&self) -> Result<BollingerPoint> {
        let middle = self.rolling.mean()?;
        let spread = self.rolling.value()? * self.std_dev_multiplier;
        Ok(BollingerPoint {
            upper: middle + spread,
            middle,
            lower: middle - spread,
        })
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.rolling.period()
    }

    /// Get the standard deviation multiplier
    pub fn std_dev_multiplier(&self) -> f64 {
        self.std_dev_multiplier
    }
}

/// Bollinger Bands over the whole series, aligned with the input
pub fn bollinger_series(
    series: &[f64],
    period: usize,
    std_dev_multiplier: f64,
) -> Result<Vec<Option<BollingerPoint>>> {
    let mut bands = BollingerBands::new(period, std_dev_multiplier)?;
    let mut out = Vec::with_capacity(series.len());
    for &price in series {
        bands.update(price)?;
        out.push(bands.point().ok());
    }
    Ok(out)
}

/// Annualized volatility: sample std of periodic returns times `sqrt(periods_per_year)`
///
/// Crypto markets trade every day, so daily data uses 365.
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> Result<f64> {
    if returns.len() < 2 {
        return Err(MathError::InsufficientData(
            "Need at least two returns to estimate volatility".to_string(),
        ));
    }
    Ok(std_dev(returns)? * periods_per_year.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bollinger_bands() {
        let out = bollinger_series(&[1.0, 2.0, 3.0], 3, 2.0).unwrap();
        assert!(out[0].is_none() && out[1].is_none());
        let point = out[2].unwrap();
        assert_relative_eq!(point.middle, 2.0);
        // sample std of [1, 2, 3] is 1
        assert_relative_eq!(point.upper, 4.0);
        assert_relative_eq!(point.lower, 0.0);
        assert_relative_eq!(point.percent_b(2.0).unwrap(), 0.5);
    }

    #[test]
    fn test_bollinger_invalid_multiplier() {
        assert!(BollingerBands::new(20, 0.0).is_err());
    }

    #[test]
    fn test_flat_series_has_no_percent_b() {
        let out = bollinger_series(&[3.0; 5], 5, 2.0).unwrap();
        assert!(out[4].unwrap().percent_b(3.0).is_none());
    }

    #[test]
    fn test_annualized_volatility() {
        let returns = [0.01, -0.01, 0.01, -0.01];
        let daily = std_dev(&returns).unwrap();
        assert_relative_eq!(
            annualized_volatility(&returns, 365.0).unwrap(),
            daily * 365.0_f64.sqrt()
        );
        assert!(annualized_volatility(&[0.1], 365.0).is_err());
    }
}
