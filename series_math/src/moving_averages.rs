//! Moving window calculations
//!
//! Contains streaming implementations of:
//! - Simple Moving Average (SMA)
//! - Exponential Moving Average (EMA)
//! - Rolling sample standard deviation
//!
//! and batch helpers (`sma_series`, `ema_series`, `rolling_std_series`)
//! that return output aligned with the input series.

use crate::{collect_aligned, MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "SMA input must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        Ok(())
    }

    /// Get the current SMA value
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Values currently inside the window, oldest first
    pub fn window(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Exponential Moving Average (EMA) implementation
///
/// The first value is the SMA of the first `period` inputs; afterwards
/// `ema = (value - ema) * 2 / (period + 1) + ema`.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    period: usize,
    multiplier: f64,
    current_ema: Option<f64>,
    seed: SimpleMovingAverage,
}

impl ExponentialMovingAverage {
    /// Create a new Exponential Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        let seed = SimpleMovingAverage::new(period)?;
        let multiplier = 2.0 / (period as f64 + 1.0);

        Ok(Self {
            period,
            multiplier,
            current_ema: None,
            seed,
        })
    }

    /// Update the EMA with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        match self.current_ema {
            Some(current) => {
                self.current_ema = Some((value - current) * self.multiplier + current);
            }
            None => {
                self.seed.update(value)?;
                if let Ok(initial) = self.seed.value() {
                    self.current_ema = Some(initial);
                }
            }
        }

        Ok(())
    }

    /// Get the current EMA value
    pub fn value(&self) -> Result<f64> {
        self.current_ema.ok_or_else(|| {
            MathError::InsufficientData(format!(
                "Not enough data for EMA calculation. Need at least {} values.",
                self.period
            ))
        })
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the EMA, clearing all values
    pub fn reset(&mut self) {
        self.current_ema = None;
        self.seed.reset();
    }
}

/// Rolling sample standard deviation (denominator `n - 1`)
#[derive(Debug, Clone)]
pub struct RollingStdDev {
    sma: SimpleMovingAverage,
}

impl RollingStdDev {
    /// Create a rolling standard deviation over `period` values.
    ///
    /// A sample deviation needs at least two values, so `period` must be
    /// 2 or more.
    pub fn new(period: usize) -> Result<Self> {
        if period < 2 {
            return Err(MathError::InvalidInput(
                "Rolling standard deviation needs a period of at least 2".to_string(),
            ));
        }

        Ok(Self {
            sma: SimpleMovingAverage::new(period)?,
        })
    }

    /// Push a new value into the window
    pub fn update(&mut self, value: f64) -> Result<()> {
        self.sma.update(value)
    }

    /// Current sample standard deviation of the window
    pub fn value(&self) -> Result<f64> {
        let mean = self.sma.value()?;
        let n = self.sma.period() as f64;
        let sum_sq: f64 = self.sma.window().map(|v| (v - mean).powi(2)).sum();
        Ok((sum_sq / (n - 1.0)).sqrt())
    }

    /// Mean of the current window
    pub fn mean(&self) -> Result<f64> {
        self.sma.value()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.sma.period()
    }
}

/// SMA over the whole series, aligned with the input
pub fn sma_series(series: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut sma = SimpleMovingAverage::new(period)?;
    collect_aligned(series, &mut sma, |s, v| s.update(v), |s| s.value())
}

/// EMA over the whole series, aligned with the input
pub fn ema_series(series: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut ema = ExponentialMovingAverage::new(period)?;
    collect_aligned(series, &mut ema, |e, v| e.update(v), |e| e.value())
}

/// Rolling sample standard deviation over the whole series, aligned with the input
pub fn rolling_std_series(series: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut std = RollingStdDev::new(period)?;
    collect_aligned(series, &mut std, |s, v| s.update(v), |s| s.value())
}
