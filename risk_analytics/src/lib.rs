//! # Risk Analytics
//!
//! Return and risk statistics for price and return series:
//!
//! - return statistics, volatility (sample, rolling, EWMA) ([`returns`])
//! - Sharpe, Sortino, Calmar, drawdown and benchmark-relative measures ([`risk`])
//! - historical, parametric and Monte-Carlo Value-at-Risk ([`var`])
//! - portfolio volatility, risk decomposition, correlation and stress tests ([`portfolio`])
//! - moving averages, RSI, Bollinger Bands and MACD ([`indicators`])
//!
//! [`RiskCalculator`] wraps all of it behind a time-bounded result cache.
//!
//! ## Quick Start
//!
//! ```rust
//! use risk_analytics::{RiskCalculator, VarMethod};
//! use trade_math::EngineConfig;
//!
//! let calc = RiskCalculator::new(EngineConfig::default())?;
//! let returns = [0.01, -0.02, 0.015, 0.003, -0.007, 0.012];
//!
//! let stats = calc.calculate_returns(&returns, None)?;
//! let var = calc.calculate_var(&returns, 0.95, VarMethod::Historical)?;
//! assert!(var.var99 <= var.var95);
//! println!("{}", stats);
//! # Ok::<(), risk_analytics::RiskError>(())
//! ```

pub mod calculator;
pub mod error;
pub mod indicators;
pub mod portfolio;
pub mod returns;
pub mod risk;
pub mod var;

pub use calculator::RiskCalculator;
pub use error::{Result, RiskError};
pub use indicators::{IndicatorParams, IndicatorSet};
pub use portfolio::{
    AssetImpact, CorrelationMatrix, PortfolioAnalysis, PortfolioAsset, PortfolioMetrics,
    RiskContribution, StressResult, StressScenario,
};
pub use returns::ReturnStats;
pub use risk::{DrawdownBasis, RiskMetrics};
pub use var::{VarMethod, VarResult};
