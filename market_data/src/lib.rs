//! # Market Data
//!
//! Everything that touches the outside world for the crypto_owl pipeline:
//!
//! - [`record`]: price records and per-asset series
//! - [`collector`]: historical prices from a CoinGecko-compatible HTTP API
//! - [`storage`]: CSV persistence, the on-disk layout, and [`LoadOutcome`]
//! - [`chart`]: minimal PNG line, bar and heatmap rendering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use market_data::collector::{CoinGeckoClient, CollectorConfig};
//! use market_data::storage::{write_records, DataLayout};
//!
//! let client = CoinGeckoClient::new(CollectorConfig::default())?;
//! let series = client.fetch_history("bitcoin", 365)?;
//!
//! let layout = DataLayout::new("data");
//! layout.ensure_dirs()?;
//! write_records(&layout.raw_csv("bitcoin"), &series.records)?;
//! # Ok::<(), market_data::DataError>(())
//! ```

pub mod chart;
pub mod collector;
pub mod error;
pub mod record;
pub mod storage;

// Re-export commonly used types
pub use crate::error::{DataError, Result};
pub use crate::record::{PriceRecord, PriceSeries};
pub use crate::storage::{DataLayout, LoadOutcome};
