//! Summary statistics of prices and daily returns

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use series_math::{statistics, volatility};

/// Distribution of a price series and of its daily returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
    /// Mean simple daily return
    pub mean_return: f64,
    pub return_std: f64,
    pub return_skewness: f64,
    pub return_excess_kurtosis: f64,
    /// Standard deviation of log returns scaled to a year
    pub annualized_volatility: f64,
    /// Largest peak-to-trough decline, as a fraction
    pub max_drawdown: f64,
}

/// Describe `prices`; crypto trades every day so `periods_per_year` is usually 365
pub fn describe(prices: &[f64], periods_per_year: f64) -> Result<DescriptiveStats> {
    if prices.len() < 5 {
        return Err(AnalysisError::InsufficientData(format!(
            "Descriptive statistics need at least 5 prices, have {}",
            prices.len()
        )));
    }

    let returns: Vec<f64> = statistics::pct_change(prices, 1)
        .into_iter()
        .flatten()
        .collect();
    let log_returns = statistics::log_returns(prices)?;

    Ok(DescriptiveStats {
        count: prices.len(),
        mean: statistics::mean(prices)?,
        std_dev: statistics::std_dev(prices)?,
        min: statistics::quantile(prices, 0.0)?,
        q25: statistics::quantile(prices, 0.25)?,
        median: statistics::quantile(prices, 0.5)?,
        q75: statistics::quantile(prices, 0.75)?,
        max: statistics::quantile(prices, 1.0)?,
        mean_return: statistics::mean(&returns)?,
        return_std: statistics::std_dev(&returns)?,
        return_skewness: statistics::skewness(&returns)?,
        return_excess_kurtosis: statistics::excess_kurtosis(&returns)?,
        annualized_volatility: volatility::annualized_volatility(&log_returns, periods_per_year)?,
        max_drawdown: statistics::max_drawdown(prices),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_describe_basic_series() {
        let prices = [100.0, 110.0, 99.0, 120.0, 108.0];
        let stats = describe(&prices, 365.0).unwrap();
        assert_eq!(stats.count, 5);
        assert_relative_eq!(stats.mean, 107.4);
        assert_relative_eq!(stats.min, 99.0);
        assert_relative_eq!(stats.median, 108.0);
        assert_relative_eq!(stats.max, 120.0);
        // 110 -> 99 is the deepest fall from a running peak
        assert_relative_eq!(stats.max_drawdown, 0.1, epsilon = 1e-12);
        assert!(stats.annualized_volatility > 0.0);
    }

    #[test]
    fn test_short_series_rejected() {
        assert!(matches!(
            describe(&[1.0, 2.0], 365.0),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_non_positive_prices_rejected() {
        assert!(describe(&[1.0, 2.0, 0.0, 3.0, 4.0], 365.0).is_err());
    }
}
