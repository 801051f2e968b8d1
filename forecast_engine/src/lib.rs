//! # Forecast Engine
//!
//! Time series forecasting and regression models:
//!
//! - ARIMA(p,d,q) by Hannan-Rissanen regression ([`models::arima`])
//! - simple, Holt and Holt-Winters exponential smoothing ([`models::exponential_smoothing`])
//! - multiple regression with coefficient inference ([`models::regression`])
//! - random forest ensembles ([`models::random_forest`])
//! - forecast accuracy ([`metrics`]) and residual diagnostics ([`diagnostics`])
//!
//! Every model produces a [`ForecastResult`] with 95% intervals that widen
//! with the horizon. [`ForecastEngine`] memoizes results in the same TTL cache
//! the risk calculator uses.
//!
//! ## Quick Start
//!
//! ```rust
//! use forecast_engine::{ArimaOrder, ForecastEngine, SmoothingMode};
//! use trade_math::EngineConfig;
//!
//! let engine = ForecastEngine::new(EngineConfig::default())?;
//! let series: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 + (i as f64).sin()).collect();
//!
//! let arima = engine.forecast_arima(&series, ArimaOrder::new(1, 1, 0), Some(5))?;
//! assert_eq!(arima.forecasts.len(), 5);
//!
//! let holt = engine.exponential_smoothing(&series, 0.5, SmoothingMode::Double { beta: 0.2 }, None)?;
//! assert_eq!(holt.horizon(), 12);
//! # Ok::<(), forecast_engine::ForecastError>(())
//! ```

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;

pub use diagnostics::{LjungBoxResult, NormalityTest, ResidualDiagnostics};
pub use engine::ForecastEngine;
pub use error::{ForecastError, Result};
pub use metrics::AccuracyMetrics;
pub use models::arima::ArimaOrder;
pub use models::exponential_smoothing::SmoothingMode;
pub use models::random_forest::{ForestParams, RandomForestResult};
pub use models::regression::{CoefficientStats, RegressionResult};
pub use models::{
    Components, FittedModel, ForecastModel, ForecastPoint, ForecastResult, Forecaster,
    InformationCriteria,
};
