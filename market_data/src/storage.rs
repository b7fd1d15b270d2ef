//! CSV persistence and the on-disk layout shared by all stages
//!
//! Stages never hardcode paths: the orchestrator builds a [`DataLayout`]
//! and hands each stage the exact files it reads and writes.

use crate::error::{DataError, Result};
use crate::record::{PriceRecord, PriceSeries};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Result of looking for an input file
///
/// Absence is an expected outcome (an asset whose collection failed or
/// never ran), so it is a value the caller must handle, not a `None`
/// hiding behind a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// File existed and parsed
    Loaded(T),
    /// Nothing at this path
    NotFound(PathBuf),
}

impl<T> LoadOutcome<T> {
    /// Convert absence into [`DataError::MissingFile`]
    pub fn require(self) -> Result<T> {
        match self {
            LoadOutcome::Loaded(value) => Ok(value),
            LoadOutcome::NotFound(path) => Err(DataError::MissingFile(path)),
        }
    }

    /// Whether the file was found
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    /// Transform the loaded value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LoadOutcome<U> {
        match self {
            LoadOutcome::Loaded(value) => LoadOutcome::Loaded(f(value)),
            LoadOutcome::NotFound(path) => LoadOutcome::NotFound(path),
        }
    }
}

/// Directory layout under a data root
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Layout rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create every directory the pipeline writes into
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.raw_dir(),
            self.processed_dir(),
            self.plots_dir(),
            self.reports_dir(),
            self.models_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join("plots")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Collector output for an asset
    pub fn raw_csv(&self, asset: &str) -> PathBuf {
        self.raw_dir().join(format!("{}_raw.csv", asset))
    }

    /// Feature table for an asset
    pub fn processed_csv(&self, asset: &str) -> PathBuf {
        self.processed_dir().join(format!("{}_processed.csv", asset))
    }

    /// Technical indicator summary for an asset
    pub fn indicators_csv(&self, asset: &str) -> PathBuf {
        self.processed_dir().join(format!("{}_indicators.csv", asset))
    }

    /// A plot, e.g. `plot("bitcoin_price")`
    pub fn plot(&self, name: &str) -> PathBuf {
        self.plots_dir().join(format!("{}.png", name))
    }

    /// A report file, e.g. `report("bitcoin_analysis.txt")`
    pub fn report(&self, file_name: &str) -> PathBuf {
        self.reports_dir().join(file_name)
    }

    /// Persisted model for an asset
    pub fn model_json(&self, asset: &str) -> PathBuf {
        self.models_dir().join(format!("{}_lstm.json", asset))
    }

    /// Persisted metrics for an asset
    pub fn metrics_json(&self, asset: &str) -> PathBuf {
        self.models_dir().join(format!("{}_metrics.json", asset))
    }
}

/// Write serializable rows to a CSV file with a header
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a CSV file written by [`write_csv`]
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<LoadOutcome<Vec<T>>> {
    if !path.exists() {
        return Ok(LoadOutcome::NotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;
    Ok(LoadOutcome::Loaded(rows))
}

/// Persist raw price records
pub fn write_records(path: &Path, records: &[PriceRecord]) -> Result<()> {
    write_csv(path, records)
}

/// Load one asset's raw records
///
/// Rows for other assets are ignored so a combined file also works.
pub fn load_series(path: &Path, asset: &str) -> Result<LoadOutcome<PriceSeries>> {
    let outcome = read_csv::<PriceRecord>(path)?;
    Ok(outcome.map(|records| {
        let records = records.into_iter().filter(|r| r.asset == asset).collect();
        PriceSeries::new(asset, records)
    }))
}

/// Write a plain-text report
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Write a value as pretty JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body)?;
    Ok(())
}

/// Read JSON written by [`write_json`]
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<LoadOutcome<T>> {
    if !path.exists() {
        return Ok(LoadOutcome::NotFound(path.to_path_buf()));
    }
    let body = fs::read_to_string(path)?;
    Ok(LoadOutcome::Loaded(serde_json::from_str(&body)?))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
