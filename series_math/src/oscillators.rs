//! Oscillator indicator implementations
//!
//! Contains implementations of:
//! - Relative Strength Index (RSI) with Wilder smoothing
//! - Moving Average Convergence Divergence (MACD)

use crate::moving_averages::ExponentialMovingAverage;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Relative Strength Index (RSI) implementation
///
/// The first average gain/loss is the plain mean over `period` price
/// changes, so the first value appears after `period + 1` prices.
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    period: usize,
    previous_price: Option<f64>,
    warmup_gain: f64,
    warmup_loss: f64,
    changes_seen: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl RelativeStrengthIndex {
    /// Create a new RSI with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            previous_price: None,
            warmup_gain: 0.0,
            warmup_loss: 0.0,
            changes_seen: 0,
            avg_gain: None,
            avg_loss: None,
        })
    }

    /// Update the RSI with a new price value
    pub fn update(&mut self, price: f64) -> Result<()> {
        if let Some(prev_price) = self.previous_price {
            let change = price - prev_price;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            self.changes_seen += 1;

            match (self.avg_gain, self.avg_loss) {
                (Some(avg_gain), Some(avg_loss)) => {
                    // new_avg = (prev_avg * (period - 1) + current) / period
                    let p = self.period as f64;
                    self.avg_gain = Some((avg_gain * (p - 1.0) + gain) / p);
                    self.avg_loss = Some((avg_loss * (p - 1.0) + loss) / p);
                }
                _ => {
                    self.warmup_gain += gain;
                    self.warmup_loss += loss;
                    if self.changes_seen == self.period {
                        self.avg_gain = Some(self.warmup_gain / self.period as f64);
                        self.avg_loss = Some(self.warmup_loss / self.period as f64);
                    }
                }
            }
        }

        self.previous_price = Some(price);
        Ok(())
    }

    /// Get the current RSI value (0-100)
    pub fn value(&self) -> Result<f64> {
        match (self.avg_gain, self.avg_loss) {
            (Some(avg_gain), Some(avg_loss)) => {
                if avg_loss == 0.0 {
                    // No losses in the window; flat series reads as neutral
                    return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
                }
                let rs = avg_gain / avg_loss;
                Ok(100.0 - (100.0 / (1.0 + rs)))
            }
            _ => Err(MathError::InsufficientData(format!(
                "Not enough data for RSI calculation. Need {} values, have {}.",
                self.period + 1,
                self.changes_seen + usize::from(self.previous_price.is_some())
            ))),
        }
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the RSI, clearing all values
    pub fn reset(&mut self) {
        self.previous_price = None;
        self.warmup_gain = 0.0;
        self.warmup_loss = 0.0;
        self.changes_seen = 0;
        self.avg_gain = None;
        self.avg_loss = None;
    }
}

/// One MACD reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    /// Fast EMA minus slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    /// MACD line minus signal line
    pub histogram: f64,
}

/// Moving Average Convergence Divergence (MACD) implementation
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: ExponentialMovingAverage,
    slow_ema: ExponentialMovingAverage,
    signal_ema: ExponentialMovingAverage,
}

impl Macd {
    /// Create a new MACD with the specified parameters
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Result<Self> {
        if fast_period >= slow_period {
            return Err(MathError::InvalidInput(
                "Fast period must be smaller than slow period".to_string(),
            ));
        }

        Ok(Self {
            fast_ema: ExponentialMovingAverage::new(fast_period)?,
            slow_ema: ExponentialMovingAverage::new(slow_period)?,
            signal_ema: ExponentialMovingAverage::new(signal_period)?,
        })
    }

    /// Update the MACD with a new price value
    pub fn update(&mut self, price: f64) -> Result<()> {
        self.fast_ema.update(price)?;
        self.slow_ema.update(price)?;

        if let Ok(line) = self.macd_value() {
            self.signal_ema.update(line)?;
        }

        Ok(())
    }

    /// Get the current MACD line value (fast EMA - slow EMA)
    pub fn macd_value(&self) -> Result<f64> {
        match (self.fast_ema.value(), self.slow_ema.value()) {
            (Ok(fast), Ok(slow)) => Ok(fast - slow),
            _ => Err(MathError::InsufficientData(
                "Not enough data to calculate MACD line".to_string(),
            )),
        }
    }

    /// Get the current signal line value (EMA of MACD)
    pub fn signal_value(&self) -> Result<f64> {
        self.signal_ema.value().map_err(|_| {
            MathError::InsufficientData("Not enough data to calculate signal line".to_string())
        })
    }

    /// Full reading once both the line and the signal are available
    pub fn point(&self) -> Result<MacdPoint> {
        let macd = self.macd_value()?;
        let signal = self.signal_value()?;
        Ok(MacdPoint {
            macd,
            signal,
            histogram: macd - signal,
        })
    }

    /// Number of prices needed before the first full reading
    pub fn warmup(&self) -> usize {
        self.slow_ema.period() + self.signal_ema.period() - 1
    }

    /// Reset the MACD, clearing all values
    pub fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
    }
}

/// RSI over the whole series, aligned with the input
pub fn rsi_series(series: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut rsi = RelativeStrengthIndex::new(period)?;
    crate::collect_aligned(series, &mut rsi, |r, v| r.update(v), |r| r.value())
}

/// MACD over the whole series, aligned with the input
pub fn macd_series(
    series: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<Vec<Option<MacdPoint>>> {
    let mut macd = Macd::new(fast_period, slow_period, signal_period)?;
    let mut out = Vec::with_capacity(series.len());
    for &price in series {
        macd.update(price)?;
        out.push(macd.point().ok());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rsi_first_value_after_period_changes() {
        let prices = [1.0, 2.0, 3.0, 2.0, 3.0];
        let out = rsi_series(&prices, 4).unwrap();
        assert!(out[..4].iter().all(Option::is_none));
        // gains: 1 + 1 + 1 = 3, losses: 1 -> rs = 3
        assert_relative_eq!(out[4].unwrap(), 75.0);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi_series(&prices, 14).unwrap();
        assert_relative_eq!(out[19].unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_flat_series_is_neutral() {
        let out = rsi_series(&[5.0; 6], 3).unwrap();
        assert_relative_eq!(out[5].unwrap(), 50.0);
    }

    #[test]
    fn test_macd_warmup_and_constant_series() {
        let prices = vec![10.0; 40];
        let out = macd_series(&prices, 12, 26, 9).unwrap();
        let first = out.iter().position(Option::is_some).unwrap();
        assert_eq!(first, 26 + 9 - 2);
        let point = out[39].unwrap();
        assert_relative_eq!(point.macd, 0.0);
        assert_relative_eq!(point.histogram, 0.0);
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = macd_series(&prices, 12, 26, 9).unwrap();
        assert!(out[59].unwrap().macd > 0.0);
    }

    #[test]
    fn test_macd_invalid_periods() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert_eq!(Macd::new(12, 26, 9).unwrap().warmup(), 34);
    }
}
