//! Min-max scaling of price values

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Which values the scaler is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    /// The whole series, before the train/test split. Test values leak
    /// into the scaling range.
    #[default]
    FullSeries,
    /// Only the values that feed training windows
    TrainOnly,
}

/// Linear map of `[min, max]` onto a target range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    lower: f64,
    upper: f64,
    data_min: Option<f64>,
    data_max: Option<f64>,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
            data_min: None,
            data_max: None,
        }
    }
}

impl MinMaxScaler {
    /// Unfitted scaler onto `[lower, upper]`
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(ForecastError::InvalidParameter(format!(
                "Scaler range must satisfy lower < upper, got [{}, {}]",
                lower, upper
            )));
        }
        Ok(Self {
            lower,
            upper,
            ..Default::default()
        })
    }

    /// Learn the data range
    pub fn fit(&mut self, values: &[f64]) -> Result<()> {
        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .ok_or_else(|| {
                ForecastError::InsufficientData("No finite values to fit the scaler on".to_string())
            })?;
        self.data_min = Some(min);
        self.data_max = Some(max);
        Ok(())
    }

    /// Fit and transform in one call
    pub fn fit_transform(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        self.fit(values)?;
        self.transform(values)
    }

    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some()
    }

    fn range(&self) -> Result<(f64, f64)> {
        match (self.data_min, self.data_max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(ForecastError::InvalidParameter(
                "Scaler used before fit".to_string(),
            )),
        }
    }

    /// Map values into the target range. A constant fit maps everything
    /// to the lower bound.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let (min, max) = self.range()?;
        let span = max - min;
        Ok(values
            .iter()
            .map(|&v| {
                if span == 0.0 {
                    self.lower
                } else {
                    self.lower + (v - min) / span * (self.upper - self.lower)
                }
            })
            .collect())
    }

    /// Map scaled values back to original units
    pub fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let (min, max) = self.range()?;
        let span = max - min;
        Ok(values
            .iter()
            .map(|&v| {
                if span == 0.0 {
                    min
                } else {
                    min + (v - self.lower) / (self.upper - self.lower) * span
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_within_tolerance() {
        let values = vec![16_000.5, 17_250.0, 15_900.25, 21_000.0, 19_999.99];
        let mut scaler = MinMaxScaler::default();
        let scaled = scaler.fit_transform(&values).unwrap();

        assert_relative_eq!(scaled[2], 0.0);
        assert_relative_eq!(scaled[3], 1.0);
        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in values.iter().zip(&restored) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_custom_range() {
        let mut scaler = MinMaxScaler::new(-1.0, 1.0).unwrap();
        let scaled = scaler.fit_transform(&[0.0, 5.0, 10.0]).unwrap();
        assert_eq!(scaled, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constant_series() {
        let mut scaler = MinMaxScaler::default();
        let scaled = scaler.fit_transform(&[3.0, 3.0, 3.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.0, 0.0]);
        assert_eq!(scaler.inverse_transform(&[0.0, 0.7]).unwrap(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_unfitted_and_empty() {
        let scaler = MinMaxScaler::default();
        assert!(scaler.transform(&[1.0]).is_err());
        assert!(MinMaxScaler::default().fit(&[]).is_err());
        assert!(MinMaxScaler::new(1.0, 1.0).is_err());
    }
}
