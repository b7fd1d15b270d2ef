//! # Series Math
//!
//! Numeric building blocks for price series: streaming indicators that
//! are fed one value at a time, batch helpers that align indicator
//! output with the input series, and descriptive statistics.
//!
//! Batch helpers return `Vec<Option<f64>>` of the same length as the
//! input. `None` marks a position without enough history, which is what
//! the feature engineering stage uses to drop incomplete rows.

use thiserror::Error;

// Indicator modules
pub mod moving_averages;
pub mod oscillators;
pub mod statistics;
pub mod volatility;

pub use moving_averages::{
    ExponentialMovingAverage, RollingStdDev, SimpleMovingAverage,
};
pub use oscillators::{Macd, RelativeStrengthIndex};
pub use volatility::BollingerBands;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Feed every value of `series` into a streaming indicator and collect
/// its readiness-aware output.
///
/// `update` pushes one value, `read` returns `Ok` once the indicator has
/// enough history.
pub(crate) fn collect_aligned<I, U, R>(
    series: &[f64],
    indicator: &mut I,
    mut update: U,
    mut read: R,
) -> Result<Vec<Option<f64>>>
where
    U: FnMut(&mut I, f64) -> Result<()>,
    R: FnMut(&I) -> Result<f64>,
{
    let mut out = Vec::with_capacity(series.len());
    for &value in series {
        update(indicator, value)?;
        out.push(read(indicator).ok());
    }
    Ok(out)
}
