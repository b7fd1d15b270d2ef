//! Error types for the feature_prep crate

use market_data::DataError;
use series_math::MathError;
use thiserror::Error;

/// Errors raised while cleaning or engineering features
#[derive(Debug, Error)]
pub enum PrepError {
    /// An indicator could not be computed
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Storage failure from the shared data layer
    #[error(transparent)]
    DataError(#[from] DataError),

    /// Error reading or writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Too few rows for the requested features
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A feature file has an unexpected shape or value
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PrepError>;
