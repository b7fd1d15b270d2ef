//! Price records and per-asset series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of an asset's price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Asset identifier as used by the price source (e.g. `bitcoin`)
    pub asset: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Price in the quote currency
    pub price: f64,
    /// Traded volume over the period
    pub volume: Option<f64>,
    /// Market capitalisation at the observation time
    pub market_cap: Option<f64>,
}

impl PriceRecord {
    /// Create a record with only a price
    pub fn new(asset: &str, timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            asset: asset.to_string(),
            timestamp,
            price,
            volume: None,
            market_cap: None,
        }
    }

    /// Attach volume
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Attach market capitalisation
    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }
}

/// Chronological price history of a single asset
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub asset: String,
    pub records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Wrap records belonging to `asset`
    pub fn new(asset: &str, records: Vec<PriceRecord>) -> Self {
        Self {
            asset: asset.to_string(),
            records,
        }
    }

    /// Get the prices as a vector
    pub fn prices(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.price).collect()
    }

    /// Get the timestamps as a vector
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    /// Latest record, if any
    pub fn last(&self) -> Option<&PriceRecord> {
        self.records.last()
    }

    /// True when every timestamp is strictly greater than the previous one
    pub fn is_strictly_increasing(&self) -> bool {
        self.records
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_series_accessors() {
        let series = PriceSeries::new(
            "bitcoin",
            vec![
                PriceRecord::new("bitcoin", day(1), 100.0).with_volume(5.0),
                PriceRecord::new("bitcoin", day(2), 101.0).with_market_cap(9.0),
            ],
        );
        assert_eq!(series.prices(), vec![100.0, 101.0]);
        assert_eq!(series.len(), 2);
        assert!(series.is_strictly_increasing());
        assert_eq!(series.last().unwrap().market_cap, Some(9.0));
    }

    #[test]
    fn test_duplicate_timestamps_are_not_increasing() {
        let series = PriceSeries::new(
            "eth",
            vec![
                PriceRecord::new("eth", day(1), 1.0),
                PriceRecord::new("eth", day(1), 2.0),
            ],
        );
        assert!(!series.is_strictly_increasing());
    }
}
