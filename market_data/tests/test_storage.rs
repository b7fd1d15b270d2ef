use chrono::{TimeZone, Utc};
use market_data::chart::{colors, ChartConfig, LineChart};
use market_data::storage::{load_series, read_json, write_json, write_records, write_text};
use market_data::{DataError, DataLayout, LoadOutcome, PriceRecord};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn sample_records() -> Vec<PriceRecord> {
    (1..=3)
        .map(|d| {
            PriceRecord::new("bitcoin", Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap(), 100.0 + d as f64)
                .with_volume(10.0 * d as f64)
        })
        .collect()
}

#[test]
fn test_layout_paths() {
    let layout = DataLayout::new("/data");
    assert_eq!(
        layout.raw_csv("bitcoin").to_str().unwrap(),
        "/data/raw/bitcoin_raw.csv"
    );
    assert_eq!(
        layout.processed_csv("ethereum").to_str().unwrap(),
        "/data/processed/ethereum_processed.csv"
    );
    assert_eq!(
        layout.indicators_csv("ethereum").to_str().unwrap(),
        "/data/processed/ethereum_indicators.csv"
    );
    assert_eq!(
        layout.plot("correlation").to_str().unwrap(),
        "/data/plots/correlation.png"
    );
    assert_eq!(
        layout.model_json("solana").to_str().unwrap(),
        "/data/models/solana_lstm.json"
    );
}

#[test]
fn test_records_survive_a_write_and_reload() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.ensure_dirs().unwrap();

    let records = sample_records();
    let path = layout.raw_csv("bitcoin");
    write_records(&path, &records).unwrap();

    let series = load_series(&path, "bitcoin").unwrap().require().unwrap();
    assert_eq!(series.records, records);
    assert_eq!(series.records[0].market_cap, None);
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw").join("nope_raw.csv");

    let outcome = load_series(&path, "nope").unwrap();
    assert!(!outcome.is_loaded());
    assert_eq!(outcome.clone(), LoadOutcome::NotFound(path.clone()));
    assert!(matches!(outcome.require(), Err(DataError::MissingFile(p)) if p == path));
}

#[test]
fn test_load_filters_other_assets() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "asset,timestamp,price,volume,market_cap").unwrap();
    writeln!(file, "bitcoin,2024-01-01T00:00:00Z,42000.0,1.0,").unwrap();
    writeln!(file, "ethereum,2024-01-01T00:00:00Z,2300.0,,").unwrap();
    writeln!(file, "bitcoin,2024-01-02T00:00:00Z,43000.0,,5.0").unwrap();
    file.flush().unwrap();

    let series = load_series(file.path(), "bitcoin")
        .unwrap()
        .require()
        .unwrap();
    assert_eq!(series.prices(), vec![42000.0, 43000.0]);
    assert_eq!(series.records[1].market_cap, Some(5.0));
}

#[test]
fn test_malformed_csv_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "asset,timestamp,price,volume,market_cap").unwrap();
    writeln!(file, "bitcoin,not-a-date,abc,,").unwrap();
    file.flush().unwrap();

    assert!(matches!(
        load_series(file.path(), "bitcoin"),
        Err(DataError::CsvError(_))
    ));
}

#[test]
fn test_text_and_json_helpers_create_parents() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path().join("nested"));

    let report = layout.report("summary.txt");
    write_text(&report, "hello\n").unwrap();
    assert_eq!(std::fs::read_to_string(&report).unwrap(), "hello\n");

    let json = layout.metrics_json("bitcoin");
    write_json(&json, &vec![1.5, 2.5]).unwrap();
    let back: Vec<f64> = read_json(&json).unwrap().require().unwrap();
    assert_eq!(back, vec![1.5, 2.5]);
}

#[test]
fn test_chart_written_as_png() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let path = layout.plot("bitcoin_price");

    LineChart::new(ChartConfig::sized(160, 90))
        .line(&[1.0, 2.0, 1.5, 3.0], colors::BLUE)
        .save(&path)
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}
