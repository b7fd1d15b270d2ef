//! Error types for the price_forecast crate

use market_data::DataError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series is too short for the requested windows or split
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Arrays of mismatched shape were combined
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Training diverged or produced non-finite values
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Storage or chart failure from the shared data layer
    #[error(transparent)]
    DataError(#[from] DataError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Model artifact could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ForecastError {
    /// Windowing produced nothing to train on
    pub fn too_short(series_len: usize, window_len: usize) -> Self {
        ForecastError::InsufficientData(format!(
            "series of length {} yields no windows of length {}",
            series_len, window_len
        ))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::ShapeError(err.to_string())
    }
}
