//! Aggregated outcome of a pipeline run

use crate::error::{FailureCategory, PipelineError, Result};
use market_data::{storage, DataLayout};
use price_forecast::ForecastMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the per-asset pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Preprocess,
    Analyze,
    Forecast,
}

impl Stage {
    /// Every stage, in execution order
    pub const ALL: [Stage; 4] = [Stage::Collect, Stage::Preprocess, Stage::Analyze, Stage::Forecast];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collect => "collect",
            Stage::Preprocess => "preprocess",
            Stage::Analyze => "analyze",
            Stage::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

/// The stage at which an asset stopped, and why
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFailure {
    pub asset: String,
    pub stage: Stage,
    pub category: FailureCategory,
    pub message: String,
}

impl AssetFailure {
    pub fn new(asset: &str, stage: Stage, error: &PipelineError) -> Self {
        Self {
            asset: asset.to_string(),
            stage,
            category: error.category(),
            message: error.to_string(),
        }
    }
}

/// An asset that went through every requested stage
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSuccess {
    pub asset: String,
    pub stages: Vec<Stage>,
    /// Hold-out metrics when the forecast stage ran
    pub metrics: Option<ForecastMetrics>,
    pub next_price: Option<f64>,
    /// Plots or artifacts that could not be written
    pub warnings: Vec<String>,
}

/// Successes and failures of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub successes: Vec<AssetSuccess>,
    pub failures: Vec<AssetFailure>,
    /// Assets in the correlation matrix, if one was computed
    pub correlated: Vec<String>,
    /// Why the correlation step did not produce a matrix
    pub correlation_error: Option<String>,
    /// Why the summary report files could not be written
    pub report_error: Option<String>,
}

impl RunSummary {
    /// True when assets were attempted and none succeeded
    pub fn all_failed(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }

    pub fn failure(&self, asset: &str) -> Option<&AssetFailure> {
        self.failures.iter().find(|f| f.asset == asset)
    }

    pub fn success(&self, asset: &str) -> Option<&AssetSuccess> {
        self.successes.iter().find(|s| s.asset == asset)
    }

    /// Metrics of every asset that was forecast
    pub fn metrics(&self) -> Vec<&ForecastMetrics> {
        self.successes.iter().filter_map(|s| s.metrics.as_ref()).collect()
    }

    /// Plain-text report
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write `reports/run_summary.txt` and, when any asset was forecast,
    /// `reports/forecast_metrics.csv`
    pub fn write(&self, layout: &DataLayout) -> Result<()> {
        storage::write_text(&layout.report("run_summary.txt"), &self.render())?;
        let metrics = self.metrics();
        if !metrics.is_empty() {
            storage::write_csv(&layout.report("forecast_metrics.csv"), &metrics)?;
        }
        Ok(())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.successes.len() + self.failures.len();
        writeln!(f, "Pipeline run summary")?;
        writeln!(f, "====================")?;
        writeln!(
            f,
            "{} of {} assets succeeded, {} failed",
            self.successes.len(),
            total,
            self.failures.len()
        )?;

        if !self.successes.is_empty() {
            writeln!(f, "\nSucceeded:")?;
            for s in &self.successes {
                let stages: Vec<String> = s.stages.iter().map(Stage::to_string).collect();
                writeln!(f, "  {} [{}]", s.asset, stages.join(", "))?;
                if let Some(m) = &s.metrics {
                    writeln!(
                        f,
                        "    MSE {:.4}  MAE {:.4}  RMSE {:.4}  R2 {:.4}",
                        m.mse, m.mae, m.rmse, m.r2
                    )?;
                }
                if let Some(next) = s.next_price {
                    writeln!(f, "    next price {:.4}", next)?;
                }
                for w in &s.warnings {
                    writeln!(f, "    warning: {}", w)?;
                }
            }
        }

        if !self.failures.is_empty() {
            writeln!(f, "\nFailed:")?;
            for x in &self.failures {
                writeln!(f, "  {} at {} ({}): {}", x.asset, x.stage, x.category, x.message)?;
            }
        }

        if !self.correlated.is_empty() {
            writeln!(f, "\nCorrelation: {}", self.correlated.join(", "))?;
        } else if let Some(reason) = &self.correlation_error {
            writeln!(f, "\nCorrelation skipped: {}", reason)?;
        }

        if let Some(reason) = &self.report_error {
            writeln!(f, "\nReport files not written: {}", reason)?;
        }
        Ok(())
    }
}
