//! Error type for the combined engine

use forecast_engine::ForecastError;
use risk_analytics::RiskError;
use thiserror::Error;
use trade_math::MathError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Unreadable or malformed price file
    #[error("Data error: {0}")]
    Data(String),
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::Data(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
