//! Pipeline configuration
//!
//! Every section has defaults, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! assets = ["bitcoin", "ethereum"]
//! lookback_days = 180
//!
//! [forecast]
//! window_len = 20
//!
//! [forecast.training]
//! max_epochs = 50
//! ```

use crate::error::{PipelineError, Result};
use feature_prep::FeatureConfig;
use market_analysis::AnalysisConfig;
use market_data::collector::CollectorConfig;
use market_data::DataLayout;
use price_forecast::ForecastSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a whole run, handed to each stage explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CoinGecko coin ids
    pub assets: Vec<String>,
    /// Days of history to collect
    pub lookback_days: u32,
    /// Root of the raw/processed/plots/reports/models tree
    pub data_dir: PathBuf,
    pub collector: CollectorConfig,
    pub features: FeatureConfig,
    pub analysis: AnalysisConfig,
    pub forecast: ForecastSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assets: ["bitcoin", "ethereum", "cardano", "solana", "ripple"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lookback_days: 365,
            data_dir: PathBuf::from("data"),
            collector: CollectorConfig::default(),
            features: FeatureConfig::default(),
            analysis: AnalysisConfig::default(),
            forecast: ForecastSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, data_dir: P) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }

    /// Reject settings no stage could run with
    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(PipelineError::Config("asset list is empty".to_string()));
        }
        if let Some(blank) = self.assets.iter().find(|a| a.trim().is_empty()) {
            return Err(PipelineError::Config(format!(
                "blank asset identifier {:?}",
                blank
            )));
        }
        if self.lookback_days == 0 {
            return Err(PipelineError::Config(
                "lookback_days must be positive".to_string(),
            ));
        }
        self.features.validate()?;
        self.forecast.validate()?;
        Ok(())
    }
}
