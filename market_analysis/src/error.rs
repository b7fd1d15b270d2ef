//! Error types for the market_analysis crate

use market_data::DataError;
use series_math::MathError;
use thiserror::Error;

/// Errors raised by the statistical analysis stage
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A statistic could not be computed
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Storage or chart failure from the shared data layer
    #[error(transparent)]
    DataError(#[from] DataError),

    /// Too few observations for a test
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numeric failure such as a singular regression
    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnalysisError>;
