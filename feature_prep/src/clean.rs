//! Ordering, de-duplication, gap filling and outlier flags

use crate::error::{PrepError, Result};
use log::{debug, warn};
use market_data::{PriceRecord, PriceSeries};
use series_math::statistics;

/// What cleaning changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub prices_filled: usize,
    pub volumes_filled: usize,
    pub market_caps_filled: usize,
    pub outliers: usize,
}

/// A cleaned series with one outlier flag per record
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSeries {
    pub series: PriceSeries,
    pub outliers: Vec<bool>,
    pub report: CleaningReport,
}

/// Clean one asset's raw records
///
/// Records are sorted by timestamp and a repeated timestamp keeps the
/// last record seen. Non-finite prices and absent volume/market cap are
/// forward filled, then back filled at the head of the series. Outliers
/// are only flagged; no row is removed for being unusual.
pub fn clean_series(series: PriceSeries, outlier_z_threshold: f64) -> Result<CleanedSeries> {
    if !(outlier_z_threshold > 0.0) {
        return Err(PrepError::InvalidParameter(format!(
            "Outlier threshold must be positive, got {}",
            outlier_z_threshold
        )));
    }

    let asset = series.asset.clone();
    let mut report = CleaningReport {
        input_rows: series.len(),
        ..Default::default()
    };

    let mut records: Vec<PriceRecord> = series
        .records
        .into_iter()
        .filter(|r| r.asset == asset)
        .collect();
    records.sort_by_key(|r| r.timestamp);

    let mut deduped: Vec<PriceRecord> = Vec::with_capacity(records.len());
    for record in records {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == record.timestamp => {
                *prev = record;
                report.duplicates_removed += 1;
            }
            _ => deduped.push(record),
        }
    }

    let mut prices: Vec<Option<f64>> = deduped
        .iter()
        .map(|r| Some(r.price).filter(|p| p.is_finite()))
        .collect();
    if prices.iter().all(Option::is_none) {
        return Err(PrepError::InsufficientData(format!(
            "{} has no usable prices",
            asset
        )));
    }
    report.prices_filled = fill_gaps(&mut prices);

    let mut volumes: Vec<Option<f64>> = deduped.iter().map(|r| r.volume).collect();
    report.volumes_filled = fill_gaps(&mut volumes);
    let mut caps: Vec<Option<f64>> = deduped.iter().map(|r| r.market_cap).collect();
    report.market_caps_filled = fill_gaps(&mut caps);

    for (i, record) in deduped.iter_mut().enumerate() {
        // fill_gaps leaves no hole once one value exists
        record.price = prices[i].unwrap_or(record.price);
        record.volume = volumes[i];
        record.market_cap = caps[i];
    }

    let cleaned = PriceSeries::new(&asset, deduped);
    let outliers = flag_outliers(&cleaned.prices(), outlier_z_threshold);
    report.outliers = outliers.iter().filter(|&&o| o).count();

    if report.outliers > 0 {
        warn!(
            "{}: {} daily returns beyond {} standard deviations",
            asset, report.outliers, outlier_z_threshold
        );
    }
    debug!("{}: cleaning report {:?}", asset, report);

    Ok(CleanedSeries {
        series: cleaned,
        outliers,
        report,
    })
}

/// Forward fill then back fill in place, returning how many slots were filled
///
/// A column with no values at all is left untouched.
pub fn fill_gaps(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;

    let mut last = None;
    for slot in values.iter_mut() {
        match slot {
            Some(v) => last = Some(*v),
            None => {
                if let Some(v) = last {
                    *slot = Some(v);
                    filled += 1;
                }
            }
        }
    }

    if let Some(first) = values.iter().flatten().next().copied() {
        for slot in values.iter_mut().take_while(|s| s.is_none()) {
            *slot = Some(first);
            filled += 1;
        }
    }

    filled
}

/// Flag records whose daily return has `|z| > threshold`
///
/// The first record has no return and is never flagged. A series whose
/// returns do not vary flags nothing.
pub fn flag_outliers(prices: &[f64], threshold: f64) -> Vec<bool> {
    let returns = statistics::pct_change(prices, 1);
    let valid: Vec<f64> = returns.iter().flatten().copied().collect();

    let (mean, std) = match (statistics::mean(&valid), statistics::std_dev(&valid)) {
        (Ok(m), Ok(s)) if s > 0.0 => (m, s),
        _ => return vec![false; prices.len()],
    };

    returns
        .iter()
        .map(|r| r.map_or(false, |r| ((r - mean) / std).abs() > threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(day: u32, price: f64) -> PriceRecord {
        PriceRecord::new("btc", Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(), price)
    }

    #[test]
    fn test_sorts_and_keeps_last_duplicate() {
        let series = PriceSeries::new(
            "btc",
            vec![record(3, 30.0), record(1, 10.0), record(2, 20.0), record(1, 11.0)],
        );
        let cleaned = clean_series(series, 3.0).unwrap();
        assert_eq!(cleaned.series.prices(), vec![11.0, 20.0, 30.0]);
        assert!(cleaned.series.is_strictly_increasing());
        assert_eq!(cleaned.report.duplicates_removed, 1);
        assert_eq!(cleaned.report.input_rows, 4);
    }

    #[test]
    fn test_fill_gaps_forward_then_backward() {
        let mut values = vec![None, Some(1.0), None, None, Some(4.0), None];
        assert_eq!(fill_gaps(&mut values), 4);
        assert_eq!(
            values,
            vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0)]
        );

        let mut empty = vec![None, None];
        assert_eq!(fill_gaps(&mut empty), 0);
    }

    #[test]
    fn test_nan_prices_are_filled() {
        let series = PriceSeries::new(
            "btc",
            vec![record(1, f64::NAN), record(2, 5.0), record(3, f64::NAN)],
        );
        let cleaned = clean_series(series, 3.0).unwrap();
        assert_eq!(cleaned.series.prices(), vec![5.0, 5.0, 5.0]);
        assert_eq!(cleaned.report.prices_filled, 2);
    }

    #[test]
    fn test_all_missing_prices_is_an_error() {
        let series = PriceSeries::new("btc", vec![record(1, f64::NAN)]);
        assert!(matches!(
            clean_series(series, 3.0),
            Err(PrepError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_outlier_flagged_not_removed() {
        let mut prices: Vec<f64> = (0..40).map(|i| 100.0 + (i % 2) as f64).collect();
        prices[30] = 300.0;
        let flags = flag_outliers(&prices, 3.0);
        assert_eq!(flags.len(), prices.len());
        assert!(flags[30]);
        assert!(!flags[0]);
    }

    #[test]
    fn test_flat_series_has_no_outliers() {
        assert!(flag_outliers(&[5.0; 10], 3.0).iter().all(|f| !f));
    }
}
