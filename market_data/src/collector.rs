//! Historical price collection from a CoinGecko-compatible HTTP API
//!
//! The client is blocking: the pipeline runs one asset at a time and
//! collection is one of its only two blocking phases.

use crate::error::{DataError, Result};
use crate::record::{PriceRecord, PriceSeries};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

/// Public CoinGecko API root
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Settings for the price collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Quote currency
    pub vs_currency: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Attempts after the first failed one, for transient failures only
    pub max_retries: u32,
    /// Pause before a retry
    pub retry_delay_secs: u64,
    /// Pause between assets, to stay under public rate limits
    pub request_pause_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            vs_currency: "usd".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 3,
            request_pause_ms: 1500,
        }
    }
}

impl CollectorConfig {
    /// Point the collector at another API root (tests, mirrors, paid tiers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the quote currency
    pub fn with_vs_currency(mut self, vs_currency: &str) -> Self {
        self.vs_currency = vs_currency.to_string();
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// `market_chart` payload: every array holds `[epoch_ms, value]` pairs
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
    #[serde(default)]
    market_caps: Vec<(f64, f64)>,
    #[serde(default)]
    total_volumes: Vec<(f64, f64)>,
}

/// Client for the `coins/{id}/market_chart` endpoint
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: reqwest::blocking::Client,
    config: CollectorConfig,
}

impl CoinGeckoClient {
    /// Build a client with the configured timeout
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("crypto_owl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Collector settings in use
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Fetch `days` of history for `asset`, retrying transient failures
    pub fn fetch_history(&self, asset: &str, days: u32) -> Result<PriceSeries> {
        if asset.trim().is_empty() {
            return Err(DataError::InvalidParameter(
                "Asset identifier must not be empty".to_string(),
            ));
        }
        if days == 0 {
            return Err(DataError::InvalidParameter(
                "Lookback must be at least one day".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(asset, days) {
                Ok(series) => {
                    info!(
                        "Collected {} price points for {} ({} days)",
                        series.len(),
                        asset,
                        days
                    );
                    return Ok(series);
                }
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {}s.",
                        attempt,
                        self.config.max_retries + 1,
                        asset,
                        err,
                        self.config.retry_delay_secs
                    );
                    thread::sleep(Duration::from_secs(self.config.retry_delay_secs));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sleep for the configured inter-request pause
    pub fn pause(&self) {
        if self.config.request_pause_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.request_pause_ms));
        }
    }

    fn fetch_once(&self, asset: &str, days: u32) -> Result<PriceSeries> {
        let url = format!("{}/coins/{}/market_chart", self.config.base_url, asset);
        let days_param = days.to_string();
        debug!("Requesting {} (days={})", url, days);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", self.config.vs_currency.as_str()),
                ("days", days_param.as_str()),
                ("interval", "daily"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(DataError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text()?;
        parse_market_chart(asset, &body)
    }
}

/// Turn a `market_chart` JSON body into a price series
///
/// Volumes and market caps are matched to prices by timestamp; a price
/// without a matching entry keeps `None` for that column.
pub fn parse_market_chart(asset: &str, body: &str) -> Result<PriceSeries> {
    let payload: MarketChartResponse = serde_json::from_str(body)?;

    let caps: HashMap<i64, f64> = payload
        .market_caps
        .iter()
        .map(|&(ts, v)| (ts as i64, v))
        .collect();
    let volumes: HashMap<i64, f64> = payload
        .total_volumes
        .iter()
        .map(|&(ts, v)| (ts as i64, v))
        .collect();

    let mut records = Vec::with_capacity(payload.prices.len());
    for (ts, price) in payload.prices {
        let millis = ts as i64;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            DataError::ParseError(format!("Timestamp out of range: {}", millis))
        })?;
        records.push(PriceRecord {
            asset: asset.to_string(),
            timestamp,
            price,
            volume: volumes.get(&millis).copied(),
            market_cap: caps.get(&millis).copied(),
        });
    }

    Ok(PriceSeries::new(asset, records))
}
