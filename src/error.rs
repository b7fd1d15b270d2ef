//! Pipeline-level errors and their user-facing categories

use feature_prep::PrepError;
use market_analysis::AnalysisError;
use market_data::DataError;
use price_forecast::ForecastError;
use serde::{Deserialize, Serialize};
use series_math::MathError;
use std::fmt;
use thiserror::Error;

/// Any failure a stage can report
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Prep(#[from] PrepError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Configuration rejected before any stage ran
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Coarse classification shown in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    /// An input file the stage needs is absent
    DataAvailability,
    /// Too few observations for the requested computation
    InsufficientData,
    Io,
    Network,
    InvalidInput,
    Parse,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureCategory::DataAvailability => "data availability",
            FailureCategory::InsufficientData => "insufficient data",
            FailureCategory::Io => "io",
            FailureCategory::Network => "network",
            FailureCategory::InvalidInput => "invalid input",
            FailureCategory::Parse => "parse",
        };
        f.write_str(name)
    }
}

fn math_category(err: &MathError) -> FailureCategory {
    match err {
        MathError::InsufficientData(_) => FailureCategory::InsufficientData,
        MathError::InvalidInput(_) | MathError::CalculationError(_) => FailureCategory::InvalidInput,
    }
}

fn data_category(err: &DataError) -> FailureCategory {
    match err {
        DataError::MissingFile(_) | DataError::DataError(_) => FailureCategory::DataAvailability,
        DataError::IoError(_) | DataError::ImageError(_) => FailureCategory::Io,
        DataError::HttpError(_) | DataError::ApiError { .. } => FailureCategory::Network,
        DataError::CsvError(_) | DataError::ParseError(_) => FailureCategory::Parse,
        DataError::InvalidParameter(_) => FailureCategory::InvalidInput,
    }
}

impl PipelineError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PipelineError::Data(e) => data_category(e),
            PipelineError::Prep(e) => match e {
                PrepError::MathError(m) => math_category(m),
                PrepError::DataError(d) => data_category(d),
                PrepError::CsvError(_) | PrepError::ParseError(_) => FailureCategory::Parse,
                PrepError::IoError(_) => FailureCategory::Io,
                PrepError::InsufficientData(_) => FailureCategory::InsufficientData,
                PrepError::InvalidParameter(_) => FailureCategory::InvalidInput,
            },
            PipelineError::Analysis(e) => match e {
                AnalysisError::MathError(m) => math_category(m),
                AnalysisError::DataError(d) => data_category(d),
                AnalysisError::InsufficientData(_) => FailureCategory::InsufficientData,
                AnalysisError::InvalidParameter(_) | AnalysisError::CalculationError(_) => {
                    FailureCategory::InvalidInput
                }
            },
            PipelineError::Forecast(e) => match e {
                ForecastError::InsufficientData(_) | ForecastError::TrainingError(_) => {
                    FailureCategory::InsufficientData
                }
                ForecastError::InvalidParameter(_) | ForecastError::ShapeError(_) => {
                    FailureCategory::InvalidInput
                }
                ForecastError::DataError(d) => data_category(d),
                ForecastError::IoError(_) => FailureCategory::Io,
                ForecastError::SerializationError(_) => FailureCategory::Parse,
            },
            PipelineError::Config(_) | PipelineError::Toml(_) => FailureCategory::InvalidInput,
            PipelineError::Io(_) => FailureCategory::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_categories() {
        let missing = PipelineError::from(DataError::MissingFile(PathBuf::from("raw/x.csv")));
        assert_eq!(missing.category(), FailureCategory::DataAvailability);

        let nested = PipelineError::from(PrepError::DataError(DataError::ApiError {
            status: 503,
            message: "busy".to_string(),
        }));
        assert_eq!(nested.category(), FailureCategory::Network);

        let short = PipelineError::from(ForecastError::too_short(20, 30));
        assert_eq!(short.category(), FailureCategory::InsufficientData);

        let math = PipelineError::from(AnalysisError::MathError(MathError::InsufficientData(
            "n < 2".to_string(),
        )));
        assert_eq!(math.category(), FailureCategory::InsufficientData);
        assert_eq!(FailureCategory::DataAvailability.to_string(), "data availability");
    }
}
