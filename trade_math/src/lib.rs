//! # Trade Math
//!
//! Mathematical building blocks shared by the return/risk calculator and the
//! forecasting engine:
//!
//! - descriptive statistics, quantiles and autocorrelation ([`stats`])
//! - least-squares solves on a QR factorization ([`linalg`])
//! - streaming technical indicators ([`moving_averages`], [`oscillators`], [`volatility`])
//! - the TTL result cache ([`cache`]) and engine configuration ([`config`])

use thiserror::Error;

pub mod cache;
pub mod config;
pub mod linalg;
pub mod moving_averages;
pub mod oscillators;
pub mod series;
pub mod stats;
pub mod volatility;

pub use cache::{CacheKey, CacheStore, Clock, ManualClock, SystemClock, TtlCache};
pub use config::EngineConfig;
pub use series::Frequency;

/// Errors that can occur in statistical and indicator calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for trading math operations
pub type Result<T> = std::result::Result<T, MathError>;
