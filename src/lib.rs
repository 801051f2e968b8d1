//! # Quant Engine
//!
//! One configuration and one result cache shared by the return & risk
//! calculator ([`risk_analytics`]) and the forecasting engine
//! ([`forecast_engine`]).
//!
//! ## Example
//!
//! ```
//! use quant_engine::QuantEngine;
//! use risk_analytics::VarMethod;
//! use trade_math::EngineConfig;
//!
//! let engine = QuantEngine::new(EngineConfig::default())?;
//! let returns = [0.01, -0.02, 0.015, 0.0, 0.004, -0.006];
//!
//! let var = engine.calculator().calculate_var(&returns, 0.95, VarMethod::Parametric)?;
//! assert!(var.var99 <= var.var95);
//!
//! engine.clear_cache();
//! # Ok::<(), quant_engine::EngineError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use forecast_engine::ForecastEngine;
use risk_analytics::RiskCalculator;
use trade_math::cache::CachedValue;
use trade_math::{CacheStore, EngineConfig, TtlCache};
use tracing::debug;

pub mod data;
pub mod error;
pub mod report;

pub use error::{EngineError, Result};
pub use report::{AnalysisReport, ReportOptions};

/// Calculator and forecaster over one shared cache
#[derive(Debug, Clone)]
pub struct QuantEngine {
    config: EngineConfig,
    cache: Arc<TtlCache>,
    calculator: RiskCalculator,
    forecaster: ForecastEngine,
}

impl QuantEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(TtlCache::new(config.cache_timeout()));
        let calculator = RiskCalculator::with_cache(config.clone(), cache.clone())?;
        let forecaster = ForecastEngine::with_cache(config.clone(), cache.clone())?;
        Ok(Self {
            config,
            cache,
            calculator,
            forecaster,
        })
    }

    /// Engine configured from a TOML file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(EngineConfig::from_file(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculator(&self) -> &RiskCalculator {
        &self.calculator
    }

    pub fn forecaster(&self) -> &ForecastEngine {
        &self.forecaster
    }

    /// Raw lookup in the shared cache
    pub fn get_cache(&self, key: &str) -> Option<CachedValue> {
        self.cache.get(key)
    }

    /// Evict every result from both components
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop expired entries now rather than on their next lookup
    pub fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired();
        debug!(purged, "purged expired cache entries");
        purged
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
