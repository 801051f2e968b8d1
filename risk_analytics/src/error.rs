//! Error types for the risk_analytics crate

use thiserror::Error;
use trade_math::MathError;

/// Errors raised by return, risk, VaR, portfolio and indicator calculations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    /// Malformed input: empty where data is required, NaN, mismatched lengths,
    /// out-of-range parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer observations than the calculation needs
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The result is mathematically undefined for this input
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Engine settings that no calculation can use
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, RiskError>;

impl From<MathError> for RiskError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InvalidArgument(msg) => RiskError::InvalidArgument(msg),
            MathError::InsufficientData(msg) => RiskError::InsufficientData(msg),
            MathError::NumericalDegeneracy(msg) => RiskError::NumericalDegeneracy(msg),
            MathError::Config(msg) => RiskError::Config(msg),
        }
    }
}
