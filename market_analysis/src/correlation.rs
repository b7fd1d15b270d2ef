//! Cross-asset correlation of daily returns

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use feature_prep::FeatureTable;
use series_math::statistics;
use std::collections::{BTreeMap, BTreeSet};

/// Dated prices of one asset
#[derive(Debug, Clone, PartialEq)]
pub struct PricePath {
    pub asset: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub prices: Vec<f64>,
}

impl PricePath {
    pub fn new(asset: &str, timestamps: Vec<DateTime<Utc>>, prices: Vec<f64>) -> Self {
        Self {
            asset: asset.to_string(),
            timestamps,
            prices,
        }
    }

    pub fn from_table(table: &FeatureTable) -> Self {
        Self::new(&table.asset, table.timestamps(), table.prices())
    }

    /// Last price per calendar day
    fn by_date(&self) -> BTreeMap<NaiveDate, f64> {
        self.timestamps
            .iter()
            .zip(&self.prices)
            .map(|(ts, p)| (ts.date_naive(), *p))
            .collect()
    }
}

/// Pearson correlation of daily returns between assets
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    /// Square, symmetric, unit diagonal; `NaN` where a series is flat
    pub values: Vec<Vec<f64>>,
    /// Returns per asset after aligning on common dates
    pub observations: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.assets.iter().position(|x| x == a)?;
        let j = self.assets.iter().position(|x| x == b)?;
        Some(self.values[i][j])
    }
}

/// Correlate daily returns on the dates every asset has a price for
pub fn return_correlation(paths: &[PricePath]) -> Result<CorrelationMatrix> {
    if paths.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Correlation needs at least 2 assets, have {}",
            paths.len()
        )));
    }

    let dated: Vec<BTreeMap<NaiveDate, f64>> = paths.iter().map(PricePath::by_date).collect();
    let mut common: BTreeSet<NaiveDate> = dated[0].keys().copied().collect();
    for map in &dated[1..] {
        common.retain(|d| map.contains_key(d));
    }
    if common.len() < 3 {
        return Err(AnalysisError::InsufficientData(format!(
            "Only {} dates shared by all assets",
            common.len()
        )));
    }

    let returns: Vec<Vec<f64>> = dated
        .iter()
        .map(|map| {
            let aligned: Vec<f64> = common.iter().map(|d| map[d]).collect();
            statistics::pct_change(&aligned, 1)
                .into_iter()
                .map(|r| r.unwrap_or(f64::NAN))
                .skip(1)
                .collect()
        })
        .collect();

    let n = paths.len();
    let mut values = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let rho = statistics::pearson(&returns[i], &returns[j])?;
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }

    Ok(CorrelationMatrix {
        assets: paths.iter().map(|p| p.asset.clone()).collect(),
        values,
        observations: common.len() - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn path(asset: &str, start_day: i64, prices: &[f64]) -> PricePath {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PricePath::new(
            asset,
            (0..prices.len())
                .map(|i| start + Duration::days(start_day + i as i64))
                .collect(),
            prices.to_vec(),
        )
    }

    #[test]
    fn test_scaled_copy_is_perfectly_correlated() {
        let a = [1.0, 2.0, 1.5, 3.0, 2.5, 4.0];
        let b: Vec<f64> = a.iter().map(|p| p * 10.0).collect();
        let m = return_correlation(&[path("a", 0, &a), path("b", 0, &b)]).unwrap();
        assert_relative_eq!(m.get("a", "b").unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.values[0][0], 1.0);
        assert_eq!(m.observations, 5);
    }

    #[test]
    fn test_aligns_on_shared_dates() {
        let a = path("a", 0, &[1.0, 2.0, 4.0, 2.0, 1.0, 2.0]);
        // starts two days later, so four dates overlap
        let b = path("b", 2, &[4.0, 2.0, 1.0, 2.0, 9.0]);
        let m = return_correlation(&[a, b]).unwrap();
        assert_eq!(m.observations, 3);
        assert_relative_eq!(m.get("b", "a").unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_needs_two_assets_and_overlap() {
        assert!(return_correlation(&[path("a", 0, &[1.0, 2.0, 3.0])]).is_err());
        let far = return_correlation(&[path("a", 0, &[1.0, 2.0, 3.0]), path("b", 10, &[1.0, 2.0, 3.0])]);
        assert!(matches!(far, Err(AnalysisError::InsufficientData(_))));
    }
}
