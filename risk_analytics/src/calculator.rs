//! Cached front end over the return, risk, VaR, portfolio and indicator
//! functions
//!
//! Every expensive call is memoized under a [`CacheKey`] built from the
//! operation name, the input series and every parameter that affects the
//! result, including configuration defaults that were filled in.

use std::collections::BTreeMap;
use std::sync::Arc;

use trade_math::cache::{memoize, CachedValue};
use trade_math::oscillators::MacdSeries;
use trade_math::volatility::BandSeries;
use trade_math::{CacheKey, CacheStore, EngineConfig, Frequency, TtlCache};
use tracing::debug;

use crate::error::Result;
use crate::indicators::{self, IndicatorParams, IndicatorSet};
use crate::portfolio::{
    self, CorrelationMatrix, PortfolioAnalysis, PortfolioAsset, StressResult, StressScenario,
};
use crate::returns::{self, ReturnStats};
use crate::risk::{self, DrawdownBasis, RiskMetrics};
use crate::var::{self, Simulation, VarMethod, VarResult};

/// Return & risk calculator bound to one configuration and one cache
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    config: EngineConfig,
    cache: Arc<dyn CacheStore>,
}

impl RiskCalculator {
    /// Calculator with its own TTL cache
    pub fn new(config: EngineConfig) -> Result<Self> {
        let cache = Arc::new(TtlCache::new(config.cache_timeout()));
        Self::with_cache(config, cache)
    }

    /// Calculator on a caller-supplied (possibly shared) cache
    pub fn with_cache(config: EngineConfig, cache: Arc<dyn CacheStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Raw cache lookup; `None` on miss or expiry
    pub fn get_cache(&self, key: &str) -> Option<CachedValue> {
        self.cache.get(key)
    }

    /// Evict every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn frequency(&self, frequency: Option<Frequency>) -> Frequency {
        frequency.unwrap_or(self.config.frequency)
    }

    fn simulation(&self) -> Simulation {
        Simulation {
            draws: self.config.monte_carlo_simulations,
            seed: self.config.seed,
        }
    }

    pub fn calculate_returns(
        &self,
        returns: &[f64],
        frequency: Option<Frequency>,
    ) -> Result<Arc<ReturnStats>> {
        let frequency = self.frequency(frequency);
        let key = CacheKey::new("returns")
            .series(returns)
            .param("freq", frequency);
        memoize(self.cache.as_ref(), &key, || {
            returns::calculate_returns(returns, frequency)
        })
    }

    pub fn calculate_returns_from_prices(
        &self,
        prices: &[f64],
        frequency: Option<Frequency>,
    ) -> Result<Arc<ReturnStats>> {
        let frequency = self.frequency(frequency);
        let key = CacheKey::new("returns_from_prices")
            .series(prices)
            .param("freq", frequency);
        memoize(self.cache.as_ref(), &key, || {
            returns::calculate_returns_from_prices(prices, frequency)
        })
    }

    /// Standard deviation of returns, annualized at the configured frequency
    /// when `annualize` is set; zero for an empty series
    pub fn calculate_volatility(&self, returns: &[f64], annualize: bool) -> Result<f64> {
        returns::calculate_volatility(returns, annualize.then_some(self.config.frequency))
    }

    /// Sharpe ratio against `risk_free_rate` (default from config), or against
    /// `benchmark_return` when one is given, annualized at `frequency`
    /// (default from config)
    pub fn calculate_sharpe_ratio(
        &self,
        returns: &[f64],
        frequency: Option<Frequency>,
        risk_free_rate: Option<f64>,
        benchmark_return: Option<f64>,
    ) -> Result<f64> {
        let frequency = self.frequency(frequency);
        let rf = risk_free_rate.unwrap_or(self.config.risk_free_rate);
        let key = CacheKey::new("sharpe")
            .series(returns)
            .param("freq", frequency)
            .param("rf", rf)
            .param("bench", format!("{:?}", benchmark_return));
        memoize(self.cache.as_ref(), &key, || {
            risk::calculate_sharpe_ratio(returns, frequency, rf, benchmark_return)
        })
        .map(|sharpe| *sharpe)
    }

    pub fn calculate_max_drawdown(&self, curve: &[f64], basis: DrawdownBasis) -> Result<f64> {
        risk::calculate_max_drawdown(curve, basis)
    }

    pub fn calculate_risk_metrics(
        &self,
        returns: &[f64],
        frequency: Option<Frequency>,
        risk_free_rate: Option<f64>,
        benchmark: Option<&[f64]>,
    ) -> Result<Arc<RiskMetrics>> {
        let frequency = self.frequency(frequency);
        let rf = risk_free_rate.unwrap_or(self.config.risk_free_rate);
        let mut key = CacheKey::new("risk_metrics")
            .series(returns)
            .param("freq", frequency)
            .param("rf", rf);
        if let Some(bench) = benchmark {
            key = key.series(bench);
        }
        memoize(self.cache.as_ref(), &key, || {
            risk::calculate_risk_metrics(returns, frequency, rf, benchmark)
        })
    }

    pub fn calculate_var(
        &self,
        returns: &[f64],
        confidence: f64,
        method: VarMethod,
    ) -> Result<Arc<VarResult>> {
        let simulation = self.simulation();
        let mut key = CacheKey::new("var")
            .series(returns)
            .param("c", confidence)
            .param("method", method);
        if method == VarMethod::MonteCarlo {
            key = key
                .param("draws", simulation.draws)
                .param("seed", simulation.seed);
        }
        memoize(self.cache.as_ref(), &key, || {
            var::calculate_var(returns, confidence, method, simulation)
        })
    }

    /// Analyze a portfolio with explicit weights, or each asset's own weight
    /// when `weights` is `None`
    pub fn analyze_portfolio(
        &self,
        assets: &[PortfolioAsset],
        weights: Option<&[f64]>,
    ) -> Result<Arc<PortfolioAnalysis>> {
        let weights: Vec<f64> = match weights {
            Some(w) => w.to_vec(),
            None => assets.iter().map(|a| a.weight).collect(),
        };
        let key = asset_key("portfolio", assets)
            .series(&weights)
            .param("freq", self.config.frequency)
            .param("rf", self.config.risk_free_rate);
        memoize(self.cache.as_ref(), &key, || {
            portfolio::analyze_portfolio(
                assets,
                &weights,
                self.config.frequency,
                self.config.risk_free_rate,
            )
        })
    }

    pub fn calculate_correlation_matrix(
        &self,
        assets: &[PortfolioAsset],
    ) -> Result<Arc<CorrelationMatrix>> {
        let key = asset_key("correlation", assets);
        memoize(self.cache.as_ref(), &key, || {
            portfolio::calculate_correlation_matrix(assets)
        })
    }

    /// Not cached; scenarios are cheap and usually one-off
    pub fn stress_test_portfolio(
        &self,
        assets: &[PortfolioAsset],
        weights: &[f64],
        scenarios: &[StressScenario],
    ) -> Result<Vec<StressResult>> {
        debug!(scenarios = scenarios.len(), "running stress scenarios");
        portfolio::stress_test_portfolio(assets, weights, scenarios)
    }

    pub fn calculate_moving_averages(
        &self,
        prices: &[f64],
        windows: &[usize],
    ) -> Result<Arc<BTreeMap<usize, Vec<f64>>>> {
        let key = CacheKey::new("moving_averages")
            .series(prices)
            .param("windows", format!("{:?}", windows));
        memoize(self.cache.as_ref(), &key, || {
            indicators::calculate_moving_averages(prices, windows)
        })
    }

    pub fn calculate_rsi(&self, prices: &[f64], period: usize) -> Result<Arc<Vec<f64>>> {
        let key = CacheKey::new("rsi").series(prices).param("period", period);
        memoize(self.cache.as_ref(), &key, || {
            indicators::calculate_rsi(prices, period)
        })
    }

    pub fn calculate_bollinger_bands(
        &self,
        prices: &[f64],
        period: usize,
        k: f64,
    ) -> Result<Arc<BandSeries>> {
        let key = CacheKey::new("bollinger")
            .series(prices)
            .param("period", period)
            .param("k", k);
        memoize(self.cache.as_ref(), &key, || {
            indicators::calculate_bollinger_bands(prices, period, k)
        })
    }

    pub fn calculate_macd(
        &self,
        prices: &[f64],
        fast: usize,
        slow: usize,
        signal: usize,
    ) -> Result<Arc<MacdSeries>> {
        let key = CacheKey::new("macd")
            .series(prices)
            .param("fast", fast)
            .param("slow", slow)
            .param("signal", signal);
        memoize(self.cache.as_ref(), &key, || {
            indicators::calculate_macd(prices, fast, slow, signal)
        })
    }

    pub fn calculate_indicators(
        &self,
        prices: &[f64],
        params: &IndicatorParams,
    ) -> Result<Arc<IndicatorSet>> {
        let key = CacheKey::new("indicators")
            .series(prices)
            .param("params", format!("{:?}", params));
        memoize(self.cache.as_ref(), &key, || {
            indicators::calculate_indicators(prices, params)
        })
    }
}

fn asset_key(operation: &str, assets: &[PortfolioAsset]) -> CacheKey {
    let symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();
    let returns: Vec<Vec<f64>> = assets.iter().map(|a| a.returns.clone()).collect();
    let vols: Vec<f64> = assets.iter().map(|a| a.volatility).collect();
    CacheKey::new(operation)
        .param("symbols", symbols.join(","))
        .matrix(&returns)
        .series(&vols)
}
