//! Latest technical indicator readings per asset

use crate::error::Result;
use crate::features::FeatureConfig;
use chrono::{DateTime, Utc};
use market_data::PriceSeries;
use serde::{Deserialize, Serialize};
use series_math::{moving_averages, oscillators, volatility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiState {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiState {
    /// Classic 70/30 thresholds
    pub fn classify(rsi: f64) -> Self {
        if rsi >= 70.0 {
            RsiState::Overbought
        } else if rsi <= 30.0 {
            RsiState::Oversold
        } else {
            RsiState::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
}

/// Position of the short moving average against the long one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaCrossover {
    /// Short crossed above long on the latest bar
    GoldenCross,
    /// Short crossed below long on the latest bar
    DeathCross,
    Above,
    Below,
}

/// One row of `{asset}_indicators.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub asset: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub rsi: Option<f64>,
    pub rsi_state: Option<RsiState>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub macd_trend: Option<Trend>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_percent_b: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub ma_crossover: Option<MaCrossover>,
}

/// Summarize the latest indicator state of a cleaned series
///
/// Indicators without enough history are left empty. Returns `None` for
/// an empty series.
pub fn summarize_indicators(
    series: &PriceSeries,
    config: &FeatureConfig,
) -> Result<Option<IndicatorSummary>> {
    let last = match series.last() {
        Some(last) => last,
        None => return Ok(None),
    };
    let prices = series.prices();

    let rsi = match config.rsi_period {
        Some(period) => latest(&oscillators::rsi_series(&prices, period)?),
        None => None,
    };

    let macd = match &config.macd {
        Some(m) => oscillators::macd_series(&prices, m.fast, m.slow, m.signal)?
            .last()
            .copied()
            .flatten(),
        None => None,
    };

    let bands = match &config.bollinger {
        Some(bb) => volatility::bollinger_series(&prices, bb.period, bb.std_dev)?
            .last()
            .copied()
            .flatten(),
        None => None,
    };

    let (sma_short, sma_long, ma_crossover) = crossover(&prices, &config.moving_averages)?;

    Ok(Some(IndicatorSummary {
        asset: series.asset.clone(),
        timestamp: last.timestamp,
        price: last.price,
        rsi,
        rsi_state: rsi.map(RsiState::classify),
        macd: macd.map(|m| m.macd),
        macd_signal: macd.map(|m| m.signal),
        macd_histogram: macd.map(|m| m.histogram),
        macd_trend: macd.map(|m| {
            if m.histogram > 0.0 {
                Trend::Bullish
            } else {
                Trend::Bearish
            }
        }),
        bb_upper: bands.map(|b| b.upper),
        bb_middle: bands.map(|b| b.middle),
        bb_lower: bands.map(|b| b.lower),
        bb_percent_b: bands.and_then(|b| b.percent_b(last.price)),
        sma_short,
        sma_long,
        ma_crossover,
    }))
}

fn latest(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

type CrossoverReading = (Option<f64>, Option<f64>, Option<MaCrossover>);

fn crossover(prices: &[f64], periods: &[usize]) -> Result<CrossoverReading> {
    let (short, long) = match (periods.first(), periods.last()) {
        (Some(&s), Some(&l)) if s != l => (s.min(l), s.max(l)),
        _ => return Ok((None, None, None)),
    };

    let short_ma = moving_averages::sma_series(prices, short)?;
    let long_ma = moving_averages::sma_series(prices, long)?;
    let n = prices.len();

    let now = match (latest(&short_ma), latest(&long_ma)) {
        (Some(s), Some(l)) => (s, l),
        (s, l) => return Ok((s, l, None)),
    };
    let before = if n >= 2 {
        short_ma[n - 2].zip(long_ma[n - 2])
    } else {
        None
    };

    let state = match before {
        Some((s, l)) if s <= l && now.0 > now.1 => MaCrossover::GoldenCross,
        Some((s, l)) if s >= l && now.0 < now.1 => MaCrossover::DeathCross,
        _ if now.0 >= now.1 => MaCrossover::Above,
        _ => MaCrossover::Below,
    };

    Ok((Some(now.0), Some(now.1), Some(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use market_data::PriceRecord;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::new(
            "btc",
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PriceRecord::new("btc", start + chrono::Duration::days(i as i64), p))
                .collect(),
        )
    }

    #[test]
    fn test_rsi_state_thresholds() {
        assert_eq!(RsiState::classify(75.0), RsiState::Overbought);
        assert_eq!(RsiState::classify(25.0), RsiState::Oversold);
        assert_eq!(RsiState::classify(50.0), RsiState::Neutral);
    }

    #[test]
    fn test_short_history_leaves_indicators_empty() {
        let summary = summarize_indicators(&series(&[1.0, 2.0, 3.0]), &FeatureConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(summary.price, 3.0);
        assert!(summary.rsi.is_none());
        assert!(summary.macd.is_none());
        assert!(summary.ma_crossover.is_none());
    }

    #[test]
    fn test_rising_series_reads_bullish() {
        let prices: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let summary = summarize_indicators(&series(&prices), &FeatureConfig::default())
            .unwrap()
            .unwrap();
        assert_relative_eq!(summary.rsi.unwrap(), 100.0);
        assert_eq!(summary.rsi_state, Some(RsiState::Overbought));
        assert_eq!(summary.ma_crossover, Some(MaCrossover::Above));
        // 7-day mean of 54..=60
        assert_relative_eq!(summary.sma_short.unwrap(), 57.0);
        assert!(summary.macd_trend.is_some());
    }

    #[test]
    fn test_crossovers_on_latest_bar() {
        // sma2 2.0 <= sma3 2.33, then 5.5 > 4.67
        let (_, _, golden) = crossover(&[3.0, 3.0, 3.0, 1.0, 10.0], &[2, 3]).unwrap();
        assert_eq!(golden, Some(MaCrossover::GoldenCross));

        // sma2 4.0 >= sma3 3.67, then 2.5 < 2.67
        let (_, _, death) = crossover(&[3.0, 3.0, 3.0, 5.0, 0.0], &[3, 2]).unwrap();
        assert_eq!(death, Some(MaCrossover::DeathCross));
    }

    #[test]
    fn test_empty_series() {
        let empty = PriceSeries::new("btc", Vec::new());
        assert!(summarize_indicators(&empty, &FeatureConfig::default())
            .unwrap()
            .is_none());
    }
}
