//! # Feature Prep
//!
//! Turns raw price records into a model-ready feature table:
//!
//! - [`clean`]: ordering, de-duplication, gap filling, z-score outlier flags
//! - [`features`]: rolling statistics, percent changes, lags, moving
//!   averages, RSI, Bollinger bands and MACD
//! - [`indicators`]: latest indicator readings for the summary CSV
//! - [`table_io`]: feature table CSV persistence

pub mod clean;
pub mod error;
pub mod features;
pub mod indicators;
pub mod table_io;

pub use crate::clean::{clean_series, CleanedSeries, CleaningReport};
pub use crate::error::{PrepError, Result};
pub use crate::features::{build_features, FeatureConfig, FeatureRow, FeatureTable};
pub use crate::indicators::{summarize_indicators, IndicatorSummary};

use log::info;
use market_data::{storage, PriceSeries};
use std::path::Path;

/// Everything the preprocessing stage produces for one asset
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub table: FeatureTable,
    pub indicators: Option<IndicatorSummary>,
    pub report: CleaningReport,
}

/// Clean a raw series and derive its features and indicator summary
pub fn preprocess(raw: PriceSeries, config: &FeatureConfig) -> Result<Preprocessed> {
    config.validate()?;
    let cleaned = clean_series(raw, config.outlier_z_threshold)?;
    let table = build_features(&cleaned, config)?;
    let indicators = summarize_indicators(&cleaned.series, config)?;
    Ok(Preprocessed {
        table,
        indicators,
        report: cleaned.report,
    })
}

/// Write the feature table and indicator summary
pub fn persist(output: &Preprocessed, processed_csv: &Path, indicators_csv: &Path) -> Result<()> {
    table_io::write_feature_table(processed_csv, &output.table)?;
    let summary: Vec<&IndicatorSummary> = output.indicators.iter().collect();
    storage::write_csv(indicators_csv, &summary)?;
    info!(
        "{}: wrote {} and {}",
        output.table.asset,
        processed_csv.display(),
        indicators_csv.display()
    );
    Ok(())
}
