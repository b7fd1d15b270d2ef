//! Sliding windows over a single price series

use crate::error::{ForecastError, Result};
use ndarray::{s, Array1, Array2, Axis};

/// Supervised pairs: each row of `inputs` is `L` consecutive values and
/// the matching entry of `targets` is the value that follows them
#[derive(Debug, Clone, PartialEq)]
pub struct Windows {
    /// `count x L`
    pub inputs: Array2<f64>,
    pub targets: Array1<f64>,
}

impl Windows {
    /// A set with no pairs but the given window length
    pub fn empty(window_len: usize) -> Self {
        Self {
            inputs: Array2::zeros((0, window_len)),
            targets: Array1::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn window_len(&self) -> usize {
        self.inputs.ncols()
    }

    /// Rows `start..end` as a new set
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            inputs: self.inputs.slice(s![start..end, ..]).to_owned(),
            targets: self.targets.slice(s![start..end]).to_owned(),
        }
    }

    /// Rows picked by index, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            inputs: self.inputs.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }

    /// Fail when there is nothing to train on
    pub fn require_non_empty(&self, series_len: usize) -> Result<()> {
        if self.is_empty() {
            return Err(ForecastError::too_short(series_len, self.window_len()));
        }
        Ok(())
    }
}

/// Build `(series[i..i+L], series[i+L])` for every `i` in `0..N-L`
///
/// A series no longer than the window gives an empty set.
pub fn make_windows(series: &[f64], window_len: usize) -> Result<Windows> {
    if window_len == 0 {
        return Err(ForecastError::InvalidParameter(
            "Window length must be positive".to_string(),
        ));
    }
    if series.len() <= window_len {
        return Ok(Windows::empty(window_len));
    }

    let count = series.len() - window_len;
    let inputs = Array2::from_shape_fn((count, window_len), |(i, j)| series[i + j]);
    let targets = Array1::from_iter(series[window_len..].iter().copied());
    Ok(Windows { inputs, targets })
}

/// Split in time order: the first `floor(count * (1 - test_fraction))`
/// pairs train, the rest test
pub fn chronological_split(windows: &Windows, test_fraction: f64) -> Result<(Windows, Windows)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let train_len = train_size(windows.len(), test_fraction);
    Ok((
        windows.slice(0, train_len),
        windows.slice(train_len, windows.len()),
    ))
}

/// Number of leading pairs kept for training
pub fn train_size(count: usize, test_fraction: f64) -> usize {
    (count as f64 * (1.0 - test_fraction)).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 3)]
    #[case(31, 30)]
    #[case(200, 30)]
    fn test_window_count_and_alignment(#[case] n: usize, #[case] l: usize) {
        let series: Vec<f64> = (0..n).map(|i| i as f64 * 1.5).collect();
        let w = make_windows(&series, l).unwrap();

        assert_eq!(w.len(), n - l);
        assert_eq!(w.window_len(), l);
        for i in 0..w.len() {
            assert_eq!(w.targets[i], series[i + l]);
            assert_eq!(w.inputs[[i, 0]], series[i]);
            assert_eq!(w.inputs[[i, l - 1]], series[i + l - 1]);
        }
    }

    #[rstest]
    #[case(0)]
    #[case(5)]
    #[case(30)]
    fn test_short_series_gives_no_windows(#[case] n: usize) {
        let series = vec![1.0; n];
        let w = make_windows(&series, 30).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.inputs.dim(), (0, 30));

        let err = w.require_non_empty(n).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
        assert!(err.to_string().contains(&format!("length {}", n)));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(make_windows(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_split_keeps_time_order() {
        let series: Vec<f64> = (0..50).map(f64::from).collect();
        let w = make_windows(&series, 5).unwrap();
        let (train, test) = chronological_split(&w, 0.25).unwrap();

        assert_eq!(train.len(), 33);
        assert_eq!(test.len(), 12);
        let last_train = train.targets[train.len() - 1];
        assert!(test.targets.iter().all(|&t| t > last_train));
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    #[case(-0.3)]
    fn test_split_fraction_bounds(#[case] fraction: f64) {
        let w = make_windows(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert!(chronological_split(&w, fraction).is_err());
    }
}
