//! Engineered feature columns over a cleaned price series
//!
//! Every column is computed aligned with the input, then rows where any
//! enabled column lacks history are dropped. What survives is fully
//! populated.

use crate::clean::CleanedSeries;
use crate::error::{PrepError, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use series_math::{moving_averages, oscillators, statistics, volatility};

/// Bollinger band settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerSettings {
    pub period: usize,
    pub std_dev: f64,
}

/// MACD settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSettings {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// Which features to compute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Window for the rolling mean and standard deviation of price
    pub rolling_window: usize,
    /// Percent change horizons
    pub pct_change_periods: Vec<usize>,
    /// Lagged price columns
    pub lags: Vec<usize>,
    /// Simple moving average periods; the first and last double as the
    /// short and long legs of the crossover signal
    pub moving_averages: Vec<usize>,
    pub rsi_period: Option<usize>,
    pub bollinger: Option<BollingerSettings>,
    pub macd: Option<MacdSettings>,
    /// |z| of a daily return above which a row is flagged
    pub outlier_z_threshold: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_window: 7,
            pct_change_periods: vec![1, 7],
            lags: vec![1, 2, 3, 7],
            moving_averages: vec![7, 30],
            rsi_period: Some(14),
            bollinger: Some(BollingerSettings {
                period: 20,
                std_dev: 2.0,
            }),
            macd: Some(MacdSettings {
                fast: 12,
                slow: 26,
                signal: 9,
            }),
            outlier_z_threshold: 3.0,
        }
    }
}

impl FeatureConfig {
    /// Rolling stats, percent changes and lags only, all bounded by `window`
    pub fn basic(window: usize) -> Self {
        Self {
            rolling_window: window,
            pct_change_periods: vec![1, window],
            lags: vec![1, window],
            moving_averages: Vec::new(),
            rsi_period: None,
            bollinger: None,
            macd: None,
            ..Default::default()
        }
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_moving_averages(mut self, periods: Vec<usize>) -> Self {
        self.moving_averages = periods;
        self
    }

    pub fn with_rsi(mut self, period: Option<usize>) -> Self {
        self.rsi_period = period;
        self
    }

    pub fn with_bollinger(mut self, settings: Option<BollingerSettings>) -> Self {
        self.bollinger = settings;
        self
    }

    pub fn with_macd(mut self, settings: Option<MacdSettings>) -> Self {
        self.macd = settings;
        self
    }

    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_z_threshold = threshold;
        self
    }

    /// Reject settings no indicator can work with
    pub fn validate(&self) -> Result<()> {
        if self.rolling_window < 2 {
            return Err(PrepError::InvalidParameter(format!(
                "Rolling window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        let zero_period = self
            .pct_change_periods
            .iter()
            .chain(&self.lags)
            .chain(&self.moving_averages)
            .chain(self.rsi_period.iter())
            .any(|&p| p == 0);
        if zero_period {
            return Err(PrepError::InvalidParameter(
                "Feature periods must be positive".to_string(),
            ));
        }
        if let Some(macd) = &self.macd {
            if macd.fast >= macd.slow {
                return Err(PrepError::InvalidParameter(format!(
                    "MACD fast period {} must be below slow period {}",
                    macd.fast, macd.slow
                )));
            }
        }
        Ok(())
    }

    /// Column names in the order they appear in every [`FeatureRow`]
    pub fn column_names(&self) -> Vec<String> {
        let w = self.rolling_window;
        let mut names = vec![format!("rolling_mean_{}", w), format!("rolling_std_{}", w)];
        names.extend(self.pct_change_periods.iter().map(|p| format!("pct_change_{}", p)));
        names.extend(self.lags.iter().map(|l| format!("lag_{}", l)));
        names.extend(self.moving_averages.iter().map(|p| format!("sma_{}", p)));
        if let Some(period) = self.rsi_period {
            names.push(format!("rsi_{}", period));
        }
        if self.bollinger.is_some() {
            names.extend(["bb_upper", "bb_middle", "bb_lower"].map(String::from));
        }
        if self.macd.is_some() {
            names.extend(["macd", "macd_signal", "macd_hist"].map(String::from));
        }
        names
    }
}

/// One cleaned record plus its derived values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub is_outlier: bool,
    /// Aligned with [`FeatureTable::columns`]
    pub values: Vec<f64>,
}

/// Feature rows of a single asset
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub asset: String,
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Values of a named column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn outlier_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_outlier).count()
    }
}

/// Compute the configured features and drop incomplete rows
pub fn build_features(cleaned: &CleanedSeries, config: &FeatureConfig) -> Result<FeatureTable> {
    config.validate()?;

    let prices = cleaned.series.prices();
    let columns = compute_columns(&prices, config)?;
    let names = config.column_names();

    let mut rows = Vec::new();
    for (i, record) in cleaned.series.records.iter().enumerate() {
        let values: Option<Vec<f64>> = columns.iter().map(|c| c[i]).collect();
        if let Some(values) = values {
            rows.push(FeatureRow {
                timestamp: record.timestamp,
                price: record.price,
                volume: record.volume,
                market_cap: record.market_cap,
                is_outlier: cleaned.outliers.get(i).copied().unwrap_or(false),
                values,
            });
        }
    }

    if rows.is_empty() {
        return Err(PrepError::InsufficientData(format!(
            "{}: {} rows leave no row with every feature populated",
            cleaned.series.asset,
            prices.len()
        )));
    }

    info!(
        "{}: {} feature rows ({} dropped for warm-up), {} columns",
        cleaned.series.asset,
        rows.len(),
        prices.len() - rows.len(),
        names.len()
    );

    Ok(FeatureTable {
        asset: cleaned.series.asset.clone(),
        columns: names,
        rows,
    })
}

fn compute_columns(prices: &[f64], config: &FeatureConfig) -> Result<Vec<Vec<Option<f64>>>> {
    let mut columns = vec![
        moving_averages::sma_series(prices, config.rolling_window)?,
        moving_averages::rolling_std_series(prices, config.rolling_window)?,
    ];

    for &p in &config.pct_change_periods {
        columns.push(statistics::pct_change(prices, p));
    }
    for &lag in &config.lags {
        columns.push(lagged(prices, lag));
    }
    for &p in &config.moving_averages {
        columns.push(moving_averages::sma_series(prices, p)?);
    }
    if let Some(period) = config.rsi_period {
        columns.push(oscillators::rsi_series(prices, period)?);
    }
    if let Some(bb) = &config.bollinger {
        let points = volatility::bollinger_series(prices, bb.period, bb.std_dev)?;
        columns.push(points.iter().map(|p| p.map(|p| p.upper)).collect());
        columns.push(points.iter().map(|p| p.map(|p| p.middle)).collect());
        columns.push(points.iter().map(|p| p.map(|p| p.lower)).collect());
    }
    if let Some(m) = &config.macd {
        let points = oscillators::macd_series(prices, m.fast, m.slow, m.signal)?;
        columns.push(points.iter().map(|p| p.map(|p| p.macd)).collect());
        columns.push(points.iter().map(|p| p.map(|p| p.signal)).collect());
        columns.push(points.iter().map(|p| p.map(|p| p.histogram)).collect());
    }

    Ok(columns)
}

fn lagged(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).map(|j| values[j]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lagged_alignment() {
        assert_eq!(
            lagged(&[1.0, 2.0, 3.0], 2),
            vec![None, None, Some(1.0)]
        );
    }

    #[test]
    fn test_column_names_follow_config() {
        let names = FeatureConfig::basic(7).column_names();
        assert_eq!(
            names,
            vec![
                "rolling_mean_7",
                "rolling_std_7",
                "pct_change_1",
                "pct_change_7",
                "lag_1",
                "lag_7"
            ]
        );
        let full = FeatureConfig::default().column_names();
        assert!(full.contains(&"macd_hist".to_string()));
        assert!(full.contains(&"rsi_14".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_periods() {
        assert!(FeatureConfig::basic(1).validate().is_err());
        assert!(FeatureConfig::default()
            .with_moving_averages(vec![0])
            .validate()
            .is_err());
        assert!(FeatureConfig::default()
            .with_macd(Some(MacdSettings {
                fast: 26,
                slow: 12,
                signal: 9
            }))
            .validate()
            .is_err());
    }
}
