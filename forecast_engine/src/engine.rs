//! Cached front end over the forecasting models and diagnostics

use std::sync::Arc;

use trade_math::cache::{memoize, CachedValue};
use trade_math::{CacheKey, CacheStore, EngineConfig, TtlCache};

use crate::diagnostics::{self, LjungBoxResult, ResidualDiagnostics};
use crate::error::Result;
use crate::metrics::{self, AccuracyMetrics};
use crate::models::arima::ArimaOrder;
use crate::models::exponential_smoothing::SmoothingMode;
use crate::models::random_forest::{self, ForestParams, RandomForestResult};
use crate::models::regression::{self, RegressionResult};
use crate::models::{validate_horizon, ForecastModel, ForecastResult};

/// Forecasting engine bound to one configuration and one cache
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: EngineConfig,
    cache: Arc<dyn CacheStore>,
}

impl ForecastEngine {
    /// Engine with its own TTL cache
    pub fn new(config: EngineConfig) -> Result<Self> {
        let cache = Arc::new(TtlCache::new(config.cache_timeout()));
        Self::with_cache(config, cache)
    }

    /// Engine on a caller-supplied (possibly shared) cache
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

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn horizon(&self, horizon: Option<usize>) -> Result<usize> {
        let horizon = horizon.unwrap_or(self.config.forecast_horizon);
        validate_horizon(horizon)?;
        Ok(horizon)
    }

    /// Fill in the configured seed so forest results are reproducible
    fn resolve_seed(&self, params: &ForestParams) -> ForestParams {
        ForestParams {
            seed: Some(params.seed.unwrap_or(self.config.seed)),
            ..params.clone()
        }
    }

    /// Fit `model` to `series` and project `horizon` periods (default from
    /// config)
    pub fn forecast(
        &self,
        series: &[f64],
        model: &ForecastModel,
        horizon: Option<usize>,
    ) -> Result<Arc<ForecastResult>> {
        let horizon = self.horizon(horizon)?;
        let model = match model {
            ForecastModel::RandomForest { params, lags } => ForecastModel::RandomForest {
                params: self.resolve_seed(params),
                lags: *lags,
            },
            other => other.clone(),
        };
        let key = CacheKey::new("forecast")
            .series(series)
            .param("model", format!("{:?}", model))
            .param("h", horizon);
        memoize(self.cache.as_ref(), &key, || {
            model.fit(series)?.forecast_result(horizon)
        })
    }

    pub fn forecast_arima(
        &self,
        series: &[f64],
        order: ArimaOrder,
        horizon: Option<usize>,
    ) -> Result<Arc<ForecastResult>> {
        self.forecast(series, &ForecastModel::Arima(order), horizon)
    }

    pub fn exponential_smoothing(
        &self,
        series: &[f64],
        alpha: f64,
        mode: SmoothingMode,
        horizon: Option<usize>,
    ) -> Result<Arc<ForecastResult>> {
        self.forecast(
            series,
            &ForecastModel::ExponentialSmoothing { alpha, mode },
            horizon,
        )
    }

    /// Regress `y` on the columns of `x`
    pub fn multiple_regression(&self, y: &[f64], x: &[Vec<f64>]) -> Result<Arc<RegressionResult>> {
        let key = CacheKey::new("regression").series(y).matrix(x);
        memoize(self.cache.as_ref(), &key, || {
            regression::multiple_regression(y, x)
        })
    }

    /// Train a forest on `features` (rows are observations); a `None` seed in
    /// `params` takes the configured seed
    pub fn random_forest(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        params: &ForestParams,
    ) -> Result<Arc<RandomForestResult>> {
        let params = self.resolve_seed(params);
        let key = CacheKey::new("random_forest")
            .matrix(features)
            .series(targets)
            .param("params", format!("{:?}", params));
        memoize(self.cache.as_ref(), &key, || {
            random_forest::random_forest(features, targets, &params)
        })
    }

    pub fn calculate_forecast_accuracy(
        &self,
        actual: &[f64],
        predicted: &[f64],
    ) -> Result<AccuracyMetrics> {
        metrics::calculate_forecast_accuracy(actual, predicted)
    }

    pub fn perform_residual_diagnostics(
        &self,
        residuals: &[f64],
    ) -> Result<Arc<ResidualDiagnostics>> {
        let key = CacheKey::new("residual_diagnostics").series(residuals);
        memoize(self.cache.as_ref(), &key, || {
            diagnostics::perform_residual_diagnostics(residuals)
        })
    }

    /// Ljung-Box test at `lags`, or `min(10, n / 5)` lags when `None`
    pub fn ljung_box_test(&self, data: &[f64], lags: Option<usize>) -> Result<LjungBoxResult> {
        let lags = lags.unwrap_or_else(|| diagnostics::default_lags(data.len()));
        diagnostics::ljung_box_test(data, lags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_resolution_enters_the_key() {
        let engine = ForecastEngine::new(EngineConfig::default()).unwrap();
        let resolved = engine.resolve_seed(&ForestParams::default());
        assert_eq!(resolved.seed, Some(42));

        let explicit = ForestParams {
            seed: Some(7),
            ..ForestParams::default()
        };
        assert_eq!(engine.resolve_seed(&explicit).seed, Some(7));
    }

    #[test]
    fn test_horizon_defaults_to_config() {
        let engine = ForecastEngine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.horizon(None).unwrap(), 12);
        assert!(engine.horizon(Some(0)).is_err());
    }
}
