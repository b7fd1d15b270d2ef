//! Per-asset orchestration of the collect, preprocess, analyze and
//! forecast stages
//!
//! Stages talk to each other only through files under the data root.
//! Every asset runs in isolation: the first stage that fails ends that
//! asset's run and is recorded in the [`RunSummary`], and the next asset
//! starts from scratch.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::summary::{AssetFailure, AssetSuccess, RunSummary, Stage};
use feature_prep::table_io::read_feature_table;
use feature_prep::FeatureTable;
use log::{debug, info, warn};
use market_analysis::{AnalysisPaths, PricePath};
use market_data::collector::CoinGeckoClient;
use market_data::{storage, DataLayout, LoadOutcome};
use price_forecast::{ForecastOutcome, ForecastPaths};
use std::path::PathBuf;

/// What a single stage produced for the summary
#[derive(Debug, Default)]
struct StageReport {
    outcome: Option<ForecastOutcome>,
    warnings: Vec<String>,
}

/// Runs the configured stages over the configured assets
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    layout: DataLayout,
}

impl Pipeline {
    /// Validate `config` and derive the data layout from it
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();
        Ok(Self { config, layout })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn analysis_paths(&self, asset: &str) -> AnalysisPaths {
        AnalysisPaths {
            report: self.layout.report(&format!("{}_analysis.txt", asset)),
            price_plot: self.layout.plot(&format!("{}_price", asset)),
            acf_plot: self.layout.plot(&format!("{}_acf", asset)),
            decomposition_plot: self.layout.plot(&format!("{}_decomposition", asset)),
        }
    }

    pub fn forecast_paths(&self, asset: &str) -> ForecastPaths {
        ForecastPaths {
            model: self.layout.model_json(asset),
            metrics: self.layout.metrics_json(asset),
            forecast_plot: self.layout.plot(&format!("{}_forecast", asset)),
            training_plot: self.layout.plot(&format!("{}_training", asset)),
        }
    }

    /// Fetch one asset's history and write it to `raw/{asset}_raw.csv`
    pub fn collect(&self, client: &CoinGeckoClient, asset: &str) -> Result<PathBuf> {
        let series = client.fetch_history(asset, self.config.lookback_days)?;
        let path = self.layout.raw_csv(asset);
        storage::write_records(&path, &series.records)?;
        info!("{}: wrote {} records to {}", asset, series.len(), path.display());
        Ok(path)
    }

    /// Clean the raw records and write the feature table and indicators
    pub fn preprocess(&self, asset: &str) -> Result<FeatureTable> {
        let raw = storage::load_series(&self.layout.raw_csv(asset), asset)?.require()?;
        let output = feature_prep::preprocess(raw, &self.config.features)?;
        feature_prep::persist(
            &output,
            &self.layout.processed_csv(asset),
            &self.layout.indicators_csv(asset),
        )?;
        Ok(output.table)
    }

    /// Analyze the processed table; returns the plots that failed to render
    pub fn analyze(&self, asset: &str) -> Result<Vec<String>> {
        let table = self.load_table(asset)?.require()?;
        let analysis = market_analysis::analyze_table(&table, &self.config.analysis)?;
        let errors = market_analysis::write_asset_artifacts(&analysis, &self.analysis_paths(asset))?;
        Ok(errors)
    }

    /// Train, evaluate and persist the forecaster on the processed prices
    pub fn forecast(&self, asset: &str) -> Result<ForecastOutcome> {
        let table = self.load_table(asset)?.require()?;
        let outcome = price_forecast::forecast_asset(
            asset,
            &table.prices(),
            &self.config.forecast,
            &self.forecast_paths(asset),
        )?;
        info!("{}", outcome.report.metrics);
        Ok(outcome)
    }

    /// Correlate daily returns of every asset whose processed table loads
    ///
    /// Returns the assets in the matrix.
    pub fn correlate(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for asset in &self.config.assets {
            match self.load_table(asset) {
                Ok(LoadOutcome::Loaded(table)) => paths.push(PricePath::from_table(&table)),
                Ok(LoadOutcome::NotFound(path)) => {
                    debug!("{}: no processed data at {}", asset, path.display())
                }
                Err(e) => warn!("{}: left out of the correlation: {}", asset, e),
            }
        }

        let matrix = market_analysis::return_correlation(&paths)?;
        market_analysis::write_correlation_artifacts(
            &matrix,
            &self.layout.report("correlation.txt"),
            &self.layout.plot("correlation"),
        )?;
        Ok(matrix.assets)
    }

    /// Run `stages` for every asset, then the correlation step when the
    /// analyze stage is included, and write the run summary
    pub fn run(&self, stages: &[Stage]) -> Result<RunSummary> {
        self.layout.ensure_dirs()?;
        let client = if stages.contains(&Stage::Collect) {
            Some(CoinGeckoClient::new(self.config.collector.clone())?)
        } else {
            None
        };

        let mut summary = RunSummary::default();
        let count = self.config.assets.len();
        for (i, asset) in self.config.assets.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, count, asset);
            match self.run_asset(asset, stages, client.as_ref()) {
                Ok(success) => summary.successes.push(success),
                Err(failure) => {
                    warn!(
                        "{}: failed at {} ({}): {}",
                        failure.asset, failure.stage, failure.category, failure.message
                    );
                    summary.failures.push(failure);
                }
            }
            if let Some(client) = &client {
                if i + 1 < count {
                    client.pause();
                }
            }
        }

        if stages.contains(&Stage::Analyze) {
            match self.correlate() {
                Ok(assets) => summary.correlated = assets,
                Err(e) => {
                    warn!("Correlation skipped: {}", e);
                    summary.correlation_error = Some(e.to_string());
                }
            }
        }

        // the in-memory summary outlives a failed report write
        if let Err(e) = summary.write(&self.layout) {
            warn!("Run summary not written: {}", e);
            summary.report_error = Some(e.to_string());
        }
        info!(
            "Run finished: {} succeeded, {} failed",
            summary.successes.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    fn run_asset(
        &self,
        asset: &str,
        stages: &[Stage],
        client: Option<&CoinGeckoClient>,
    ) -> std::result::Result<AssetSuccess, AssetFailure> {
        let mut success = AssetSuccess {
            asset: asset.to_string(),
            stages: Vec::new(),
            metrics: None,
            next_price: None,
            warnings: Vec::new(),
        };

        for &stage in stages {
            info!("{}: {}", asset, stage);
            let report = self
                .run_stage(asset, stage, client)
                .map_err(|e| AssetFailure::new(asset, stage, &e))?;
            if let Some(outcome) = report.outcome {
                success.metrics = Some(outcome.report.metrics);
                success.next_price = outcome.next_price;
                success.warnings.extend(outcome.artifact_errors);
            }
            success.warnings.extend(report.warnings);
            success.stages.push(stage);
        }
        Ok(success)
    }

    fn run_stage(
        &self,
        asset: &str,
        stage: Stage,
        client: Option<&CoinGeckoClient>,
    ) -> Result<StageReport> {
        let mut report = StageReport::default();
        match stage {
            Stage::Collect => {
                if let Some(client) = client {
                    self.collect(client, asset)?;
                }
            }
            Stage::Preprocess => {
                self.preprocess(asset)?;
            }
            Stage::Analyze => report.warnings = self.analyze(asset)?,
            Stage::Forecast => report.outcome = Some(self.forecast(asset)?),
        }
        Ok(report)
    }

    fn load_table(&self, asset: &str) -> Result<LoadOutcome<FeatureTable>> {
        Ok(read_feature_table(&self.layout.processed_csv(asset), asset)?)
    }
}
