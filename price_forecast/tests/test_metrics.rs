use approx::assert_relative_eq;
use price_forecast::metrics::{
    mean_absolute_error, mean_squared_error, r2_score, root_mean_squared_error,
};
use price_forecast::ForecastMetrics;

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    assert_relative_eq!(mean_absolute_error(&actual, &predicted).unwrap(), 2.4, epsilon = 1e-12);
    assert_relative_eq!(mean_squared_error(&actual, &predicted).unwrap(), 6.0, epsilon = 1e-12);
    assert_relative_eq!(
        root_mean_squared_error(&actual, &predicted).unwrap(),
        6.0_f64.sqrt(),
        epsilon = 1e-12
    );
    // ss_res = 30, ss_tot = 1000
    assert_relative_eq!(r2_score(&actual, &predicted).unwrap(), 0.97, epsilon = 1e-12);
}

#[test]
fn test_invariant_under_shared_permutation() {
    let actual = [101.0, 98.5, 110.2, 95.0, 104.4, 99.9];
    let predicted = [100.0, 99.0, 108.0, 97.5, 103.0, 101.2];
    let order = [4, 0, 5, 2, 1, 3];
    let actual_p: Vec<f64> = order.iter().map(|&i| actual[i]).collect();
    let predicted_p: Vec<f64> = order.iter().map(|&i| predicted[i]).collect();

    let a = ForecastMetrics::compute("btc", &actual, &predicted).unwrap();
    let b = ForecastMetrics::compute("btc", &actual_p, &predicted_p).unwrap();
    assert_relative_eq!(a.mse, b.mse, epsilon = 1e-9);
    assert_relative_eq!(a.mae, b.mae, epsilon = 1e-9);
    assert_relative_eq!(a.rmse, b.rmse, epsilon = 1e-9);
    assert_relative_eq!(a.r2, b.r2, epsilon = 1e-9);
}

#[test]
fn test_perfect_prediction() {
    let actual = [1.0, 2.5, 4.0, 3.0];
    let m = ForecastMetrics::compute("eth", &actual, &actual).unwrap();
    assert_eq!(m.mse, 0.0);
    assert_eq!(m.mae, 0.0);
    assert_eq!(m.r2, 1.0);
}

#[test]
fn test_r2_undefined_for_constant_truth() {
    let actual = [5.0, 5.0, 5.0];
    assert!(r2_score(&actual, &[4.0, 5.0, 6.0]).unwrap().is_nan());
    let m = ForecastMetrics::compute("ada", &actual, &[5.0, 5.0, 5.0]).unwrap();
    assert!(m.r2.is_nan());
    assert_eq!(m.mae, 0.0);
}

#[test]
fn test_error_handling() {
    let empty: Vec<f64> = vec![];
    assert!(mean_squared_error(&empty, &empty).is_err());
    assert!(mean_absolute_error(&[1.0, 2.0], &[1.0]).is_err());
    assert!(ForecastMetrics::compute("sol", &[1.0], &[]).is_err());
}

#[test]
fn test_display() {
    let m = ForecastMetrics::compute("bitcoin", &[1.0, 2.0], &[1.5, 2.5]).unwrap();
    let text = m.to_string();
    assert!(text.contains("bitcoin"));
    assert!(text.contains("MAE:  0.5000"));
}
