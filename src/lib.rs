//! # Crypto Owl
//!
//! Batch pipeline for cryptocurrency prices: collection from a
//! CoinGecko-compatible API, cleaning and feature engineering,
//! exploratory statistics, and one-step-ahead LSTM forecasting.
//!
//! The stage crates do the work; this crate wires them together:
//!
//! - [`config`]: one [`PipelineConfig`] handed to every stage
//! - [`pipeline`]: per-asset stage runs with isolated failures
//! - [`summary`]: the aggregated [`RunSummary`] and its report files
//! - [`error`]: [`PipelineError`] and the failure categories
//!
//! ## Example
//!
//! ```rust,no_run
//! use crypto_owl::{Pipeline, PipelineConfig, Stage};
//!
//! let config = PipelineConfig::default().with_data_dir("data");
//! let summary = Pipeline::new(config)?.run(&Stage::ALL)?;
//! println!("{}", summary.render());
//! # Ok::<(), crypto_owl::PipelineError>(())
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod summary;

pub use crate::config::PipelineConfig;
pub use crate::error::{FailureCategory, PipelineError, Result};
pub use crate::pipeline::Pipeline;
pub use crate::summary::{AssetFailure, AssetSuccess, RunSummary, Stage};
