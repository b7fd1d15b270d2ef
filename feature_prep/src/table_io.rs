//! CSV persistence of feature tables
//!
//! The column set depends on the [`FeatureConfig`](crate::FeatureConfig),
//! so rows are written record by record rather than through a fixed
//! serde struct.

use crate::error::{PrepError, Result};
use crate::features::{FeatureRow, FeatureTable};
use chrono::{DateTime, Utc};
use market_data::LoadOutcome;
use std::fs;
use std::path::Path;

const FIXED_COLUMNS: [&str; 5] = ["timestamp", "price", "volume", "market_cap", "is_outlier"];

/// Write a feature table with a header row
pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let header: Vec<&str> = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(table.columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![
            row.timestamp.to_rfc3339(),
            row.price.to_string(),
            optional(row.volume),
            optional(row.market_cap),
            row.is_outlier.to_string(),
        ];
        record.extend(row.values.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a table written by [`write_feature_table`]
pub fn read_feature_table(path: &Path, asset: &str) -> Result<LoadOutcome<FeatureTable>> {
    if !path.exists() {
        return Ok(LoadOutcome::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let fixed: Vec<&str> = headers.iter().take(FIXED_COLUMNS.len()).collect();
    if fixed != FIXED_COLUMNS {
        return Err(PrepError::ParseError(format!(
            "{} does not start with {:?}",
            path.display(),
            FIXED_COLUMNS
        )));
    }
    let columns: Vec<String> = headers
        .iter()
        .skip(FIXED_COLUMNS.len())
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");
        let timestamp = DateTime::parse_from_rfc3339(field(0))
            .map_err(|e| parse_error(line, "timestamp", e))?
            .with_timezone(&Utc);
        let is_outlier = field(4)
            .parse::<bool>()
            .map_err(|e| parse_error(line, "is_outlier", e))?;

        let values = (FIXED_COLUMNS.len()..record.len())
            .map(|i| parse_number(field(i), line, &headers[i]))
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != columns.len() {
            return Err(PrepError::ParseError(format!(
                "row {} has {} feature values, expected {}",
                line + 1,
                values.len(),
                columns.len()
            )));
        }

        rows.push(FeatureRow {
            timestamp,
            price: parse_number(field(1), line, "price")?,
            volume: parse_optional(field(2), line, "volume")?,
            market_cap: parse_optional(field(3), line, "market_cap")?,
            is_outlier,
            values,
        });
    }

    Ok(LoadOutcome::Loaded(FeatureTable {
        asset: asset.to_string(),
        columns,
        rows,
    }))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_number(raw: &str, line: usize, column: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| parse_error(line, column, e))
}

fn parse_optional(raw: &str, line: usize, column: &str) -> Result<Option<f64>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_number(raw, line, column).map(Some)
    }
}

fn parse_error<E: std::fmt::Display>(line: usize, column: &str, err: E) -> PrepError {
    PrepError::ParseError(format!("row {}, column {}: {}", line + 1, column, err))
}
