//! Error types for the market_data crate

use thiserror::Error;

/// Custom error types for the market_data crate
#[derive(Debug, Error)]
pub enum DataError {
    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reading or writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The price API answered with a non-success status
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Payload could not be interpreted
    #[error("Parse error: {0}")]
    ParseError(String),

    /// An expected input file is absent
    #[error("No data file at {}", .0.display())]
    MissingFile(std::path::PathBuf),

    /// Error related to data validation
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error encoding or writing an image
    #[error("Image error: {0}")]
    ImageError(String),
}

impl DataError {
    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::HttpError(err) => err.is_timeout() || err.is_connect(),
            DataError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DataError>;

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

impl From<image::ImageError> for DataError {
    fn from(err: image::ImageError) -> Self {
        DataError::ImageError(err.to_string())
    }
}
