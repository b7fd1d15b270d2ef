use approx::assert_relative_eq;
use market_data::{DataLayout, LoadOutcome};
use price_forecast::{
    forecast_asset, ForecastError, ForecastPaths, ForecastSettings, LstmModel, MetricsRecord,
    ModelConfig, ScalerFit, SequenceModel, TrainingConfig,
};
use std::fs;
use tempfile::tempdir;

fn paths(layout: &DataLayout, asset: &str) -> ForecastPaths {
    ForecastPaths {
        model: layout.model_json(asset),
        metrics: layout.metrics_json(asset),
        forecast_plot: layout.plot(&format!("{}_forecast", asset)),
        training_plot: layout.plot(&format!("{}_training", asset)),
    }
}

/// Narrow network for the tests that only exercise the plumbing
fn reduced() -> ForecastSettings {
    ForecastSettings {
        window_len: 30,
        test_fraction: 0.2,
        scaler_fit: ScalerFit::FullSeries,
        model: ModelConfig::default()
            .with_lstm_units(vec![16, 16])
            .with_dense_units(16)
            .with_dropout(0.0)
            .with_seed(7),
        training: TrainingConfig::default()
            .with_max_epochs(150)
            .with_batch_size(16)
            .with_patience(150)
            .with_learning_rate(0.005),
    }
}

#[test]
fn test_linear_series_end_to_end() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let prices: Vec<f64> = (100..=299).map(f64::from).collect();
    let out = paths(&layout, "linear");

    let outcome = forecast_asset("linear", &prices, &ForecastSettings::default(), &out).unwrap();

    // 170 windows: 136 train, 34 test
    assert_eq!(outcome.report.actual.len(), 34);
    assert_relative_eq!(outcome.report.actual[0], 266.0, epsilon = 1e-9);
    assert_relative_eq!(outcome.report.actual[33], 299.0, epsilon = 1e-9);

    let history = &outcome.history;
    assert!(history.loss.last().unwrap() < &history.loss[0]);
    assert_eq!(history.val_loss.len(), history.epochs());

    let metrics = &outcome.report.metrics;
    assert!(metrics.mae < 5.0, "MAE {}", metrics.mae);
    assert!(metrics.rmse >= metrics.mae);
    assert!(outcome.next_price.map_or(false, f64::is_finite));
    assert!(outcome.artifact_errors.is_empty(), "{:?}", outcome.artifact_errors);

    assert!(out.forecast_plot.exists());
    assert!(out.training_plot.exists());
    let record: MetricsRecord = serde_json::from_str(&fs::read_to_string(&out.metrics).unwrap()).unwrap();
    assert_eq!(&record.metrics, metrics);
    assert_eq!(record.epochs, history.epochs());
}

#[test]
fn test_saved_model_reloads() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let prices: Vec<f64> = (0..80).map(|i| 50.0 + (i as f64 * 0.4).sin() * 5.0).collect();
    let mut settings = reduced();
    settings.window_len = 10;
    settings.model = settings.model.with_lstm_units(vec![4]).with_dense_units(4);
    settings.training = settings.training.with_max_epochs(3);
    let out = paths(&layout, "cardano");

    let outcome = forecast_asset("cardano", &prices, &settings, &out).unwrap();

    let model = match LstmModel::load(&out.model).unwrap() {
        LoadOutcome::Loaded(model) => model,
        LoadOutcome::NotFound(path) => panic!("model missing at {}", path.display()),
    };
    assert_eq!(model.window_len(), 10);
    let next = model.forecast_next(&prices).unwrap();
    assert_relative_eq!(next, outcome.next_price.unwrap(), max_relative = 1e-12);

    let missing = LstmModel::load(&layout.model_json("nothing")).unwrap();
    assert!(!missing.is_loaded());
}

#[test]
fn test_series_shorter_than_window() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let prices = vec![100.0; 25];

    let err = forecast_asset("solana", &prices, &reduced(), &paths(&layout, "solana")).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientData(_)));
    let message = err.to_string();
    assert!(message.contains("25"), "{}", message);
    assert!(message.contains("30"), "{}", message);
}

#[test]
fn test_train_only_scaling() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let prices: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
    let mut settings = reduced();
    settings.window_len = 5;
    settings.scaler_fit = ScalerFit::TrainOnly;
    settings.model = settings.model.with_lstm_units(vec![4]).with_dense_units(4);
    settings.training = settings.training.with_max_epochs(2);
    let out = paths(&layout, "ripple");

    forecast_asset("ripple", &prices, &settings, &out).unwrap();

    // 55 windows, 44 train: the scaler sees prices[..49]
    let model = LstmModel::load(&out.model).unwrap().require().unwrap();
    let scaler = model.scaler().unwrap();
    assert_eq!(scaler.transform(&[10.0, 58.0]).unwrap(), vec![0.0, 1.0]);
}

#[test]
fn test_artifact_failures_do_not_lose_metrics() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let prices: Vec<f64> = (0..50).map(|i| 20.0 + i as f64 * 0.5).collect();
    let mut settings = reduced();
    settings.window_len = 5;
    settings.model = settings.model.with_lstm_units(vec![4]).with_dense_units(4);
    settings.training = settings.training.with_max_epochs(2);
    let out = ForecastPaths {
        model: dir.path().join("models").join("eth_lstm.json"),
        metrics: dir.path().join("models").join("eth_metrics.json"),
        forecast_plot: blocker.join("eth_forecast.png"),
        training_plot: blocker.join("eth_training.png"),
    };

    let outcome = forecast_asset("ethereum", &prices, &settings, &out).unwrap();
    assert_eq!(outcome.artifact_errors.len(), 2);
    assert!(outcome.report.metrics.mae.is_finite());
    assert!(out.metrics.exists());
    assert!(out.model.exists());
}
