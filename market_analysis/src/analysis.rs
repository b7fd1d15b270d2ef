//! Per-asset exploratory analysis
//!
//! Only the descriptive statistics are required. The remaining tests
//! each need a minimum amount of history; a test that cannot run is
//! recorded in `skipped` with its reason instead of failing the asset.

use crate::autocorrelation::{acf, confidence_bound, ljung_box, pacf, LjungBox};
use crate::decomposition::{decompose, Decomposition};
use crate::descriptive::{describe, DescriptiveStats};
use crate::error::Result;
use crate::stationarity::{adf_test, kpss_test, rolling_stationarity, KpssTrend, RollingStationarity, TestOutcome};
use chrono::{DateTime, Utc};
use feature_prep::FeatureTable;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use series_math::statistics::log_returns;

/// Settings for the analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lags shown in the ACF/PACF
    pub acf_lags: usize,
    pub ljung_box_lags: usize,
    /// Season length for the decomposition, in days
    pub seasonal_period: usize,
    pub rolling_window: usize,
    /// ADF augmentation lags; chosen from the sample size when unset
    pub adf_max_lag: Option<usize>,
    pub periods_per_year: f64,
    /// Confidence level of the ACF band
    pub confidence: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            acf_lags: 30,
            ljung_box_lags: 10,
            seasonal_period: 7,
            rolling_window: 30,
            adf_max_lag: None,
            periods_per_year: 365.0,
            confidence: 0.95,
        }
    }
}

impl AnalysisConfig {
    pub fn with_acf_lags(mut self, lags: usize) -> Self {
        self.acf_lags = lags;
        self
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }
}

/// A stationarity test run on one transformation of the series
#[derive(Debug, Clone, PartialEq)]
pub struct StationarityCheck {
    /// `prices` or `log returns`
    pub subject: String,
    pub outcome: TestOutcome,
}

/// Everything the analyzer learned about one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetAnalysis {
    pub asset: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub prices: Vec<f64>,
    pub stats: DescriptiveStats,
    pub outliers: usize,
    pub stationarity: Vec<StationarityCheck>,
    pub rolling: Option<RollingStationarity>,
    /// ACF of daily log returns
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    /// Half-width of the white-noise band around zero
    pub acf_bound: f64,
    pub ljung_box: Option<LjungBox>,
    pub decomposition: Option<Decomposition>,
    /// Tests that did not run, with the reason
    pub skipped: Vec<String>,
}

/// Analyze the price column of a feature table
pub fn analyze_table(table: &FeatureTable, config: &AnalysisConfig) -> Result<AssetAnalysis> {
    let timestamps = table.timestamps();
    analyze_prices(
        &table.asset,
        &table.prices(),
        timestamps.first().copied(),
        timestamps.last().copied(),
        table.outlier_count(),
        config,
    )
}

/// Analyze a price series
pub fn analyze_prices(
    asset: &str,
    prices: &[f64],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    outliers: usize,
    config: &AnalysisConfig,
) -> Result<AssetAnalysis> {
    info!("{}: analyzing {} observations", asset, prices.len());

    let stats = describe(prices, config.periods_per_year)?;
    let returns = log_returns(prices)?;
    let mut skipped = Vec::new();

    let mut stationarity = Vec::new();
    for (subject, data) in [("prices", prices), ("log returns", returns.as_slice())] {
        match adf_test(data, config.adf_max_lag) {
            Ok(outcome) => stationarity.push(StationarityCheck {
                subject: subject.to_string(),
                outcome,
            }),
            Err(e) => skipped.push(format!("ADF on {}: {}", subject, e)),
        }
        match kpss_test(data, KpssTrend::Constant) {
            Ok(outcome) => stationarity.push(StationarityCheck {
                subject: subject.to_string(),
                outcome,
            }),
            Err(e) => skipped.push(format!("KPSS on {}: {}", subject, e)),
        }
    }

    let rolling = rolling_stationarity(prices, config.rolling_window)
        .map_err(|e| skipped.push(format!("Rolling stationarity: {}", e)))
        .ok();
    let (acf_values, pacf_values) = match (
        acf(&returns, config.acf_lags),
        pacf(&returns, config.acf_lags),
    ) {
        (Ok(a), Ok(p)) => (a, p),
        (Err(e), _) | (_, Err(e)) => {
            skipped.push(format!("Autocorrelation: {}", e));
            (Vec::new(), Vec::new())
        }
    };
    let ljung = ljung_box(&returns, config.ljung_box_lags)
        .map_err(|e| skipped.push(format!("Ljung-Box: {}", e)))
        .ok();
    let decomposition = decompose(prices, config.seasonal_period)
        .map_err(|e| skipped.push(format!("Decomposition: {}", e)))
        .ok();

    for reason in &skipped {
        debug!("{}: skipped {}", asset, reason);
    }

    Ok(AssetAnalysis {
        asset: asset.to_string(),
        start,
        end,
        prices: prices.to_vec(),
        stats,
        outliers,
        stationarity,
        rolling,
        acf: acf_values,
        pacf: pacf_values,
        acf_bound: confidence_bound(returns.len(), config.confidence),
        ljung_box: ljung,
        decomposition,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn prices(n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(3);
        (0..n)
            .scan(1000.0, |p, _| {
                *p += 0.5 + rng.gen_range(-5.0..5.0);
                Some(*p)
            })
            .collect()
    }

    #[test]
    fn test_full_analysis_on_long_series() {
        let data = prices(200);
        let a = analyze_prices("btc", &data, None, None, 2, &AnalysisConfig::default()).unwrap();
        assert_eq!(a.stats.count, 200);
        assert_eq!(a.stationarity.len(), 4);
        assert_eq!(a.acf.len(), 31);
        assert!(a.ljung_box.is_some());
        assert!(a.decomposition.is_some());
        assert!(a.rolling.is_some());
        assert!(a.skipped.is_empty(), "{:?}", a.skipped);
    }

    #[test]
    fn test_short_series_skips_instead_of_failing() {
        let data = prices(16);
        let a = analyze_prices("eth", &data, None, None, 0, &AnalysisConfig::default()).unwrap();
        // 30-day rolling windows need 60 observations
        assert!(a.rolling.is_none());
        assert!(a.skipped.iter().any(|s| s.starts_with("Rolling")));
        assert!(a.decomposition.is_some());
    }
}
