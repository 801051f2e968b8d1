//! Error types for the forecast_engine crate

use thiserror::Error;
use trade_math::MathError;

/// Errors raised while fitting, forecasting or diagnosing models
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed input: empty or ragged matrices, mismatched lengths, NaN,
    /// parameters outside their range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The series is too short for the requested order, window or season
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The fit produced an undefined quantity (singular design, zero variance,
    /// exploding recursion)
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Engine settings that no model can use
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InvalidArgument(msg) => ForecastError::InvalidArgument(msg),
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::NumericalDegeneracy(msg) => ForecastError::NumericalDegeneracy(msg),
            MathError::Config(msg) => ForecastError::Config(msg),
        }
    }
}
