use chrono::{Duration, TimeZone, Utc};
use feature_prep::{build_features, clean_series, FeatureConfig, FeatureTable};
use market_analysis::{
    analyze_table, return_correlation, write_asset_artifacts, write_correlation_artifacts,
    AnalysisConfig, AnalysisPaths, PricePath,
};
use market_data::{DataLayout, PriceRecord, PriceSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

fn table(asset: &str, seed: u64, n: usize) -> FeatureTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let mut price = 500.0;
    let records = (0..n)
        .map(|i| {
            price *= 1.0 + rng.gen_range(-0.03..0.035);
            PriceRecord::new(asset, start + Duration::days(i as i64), price)
        })
        .collect();
    let cleaned = clean_series(PriceSeries::new(asset, records), 3.0).unwrap();
    build_features(&cleaned, &FeatureConfig::basic(7)).unwrap()
}

fn paths(layout: &DataLayout, asset: &str) -> AnalysisPaths {
    AnalysisPaths {
        report: layout.report(&format!("{}_analysis.txt", asset)),
        price_plot: layout.plot(&format!("{}_price", asset)),
        acf_plot: layout.plot(&format!("{}_acf", asset)),
        decomposition_plot: layout.plot(&format!("{}_decomposition", asset)),
    }
}

#[test]
fn test_asset_report_and_plots_written() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let t = table("bitcoin", 1, 150);

    let analysis = analyze_table(&t, &AnalysisConfig::default()).unwrap();
    let out = paths(&layout, "bitcoin");
    let errors = write_asset_artifacts(&analysis, &out).unwrap();

    assert!(errors.is_empty(), "{:?}", errors);
    assert!(out.price_plot.exists());
    assert!(out.acf_plot.exists());
    assert!(out.decomposition_plot.exists());

    let report = std::fs::read_to_string(&out.report).unwrap();
    assert!(report.starts_with("Analysis report: bitcoin"));
    assert!(report.contains("Stationarity"));
    assert!(report.contains("Ljung-Box(10)"));
    assert!(report.contains("Seasonal decomposition (additive, period 7)"));
}

#[test]
fn test_missing_figures_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    // 20 rows: too short to decompose with a 14-day season
    let t = table("cardano", 2, 27);
    let config = AnalysisConfig::default().with_seasonal_period(14);

    let analysis = analyze_table(&t, &config).unwrap();
    assert!(analysis.decomposition.is_none());

    let out = paths(&layout, "cardano");
    let errors = write_asset_artifacts(&analysis, &out).unwrap();
    assert_eq!(errors.len(), 1);
    assert!(out.report.exists());
    assert!(!out.decomposition_plot.exists());
}

#[test]
fn test_correlation_across_assets() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let tables = [table("bitcoin", 1, 90), table("ethereum", 2, 90), table("solana", 3, 90)];
    let paths: Vec<PricePath> = tables.iter().map(PricePath::from_table).collect();

    let matrix = return_correlation(&paths).unwrap();
    assert_eq!(matrix.assets, vec!["bitcoin", "ethereum", "solana"]);
    assert_eq!(matrix.observations, 82);
    for i in 0..3 {
        for j in 0..3 {
            assert!((matrix.values[i][j] - matrix.values[j][i]).abs() < 1e-12);
            assert!(matrix.values[i][j].abs() <= 1.0 + 1e-12);
        }
    }

    let report = layout.report("correlation.txt");
    let plot = layout.plot("correlation");
    write_correlation_artifacts(&matrix, &report, &plot).unwrap();
    assert!(report.exists() && plot.exists());
}
