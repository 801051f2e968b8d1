//! Full analysis of one price series
//!
//! Return statistics, risk metrics, VaR and indicators come from the
//! calculator; each requested model is fitted and diagnosed by the
//! forecaster. A model that cannot be fitted is reported with its error
//! instead of failing the whole report.

use forecast_engine::{
    ArimaOrder, ForecastModel, ForecastResult, ForestParams, ResidualDiagnostics, SmoothingMode,
};
use risk_analytics::{IndicatorParams, IndicatorSet, ReturnStats, RiskMetrics, VarMethod, VarResult};
use serde::{Deserialize, Serialize};
use trade_math::series::round_to;
use trade_math::Frequency;
use tracing::{info, warn};

use crate::error::Result;
use crate::QuantEngine;

/// What to compute for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub confidence: f64,
    pub var_method: VarMethod,
    /// Defaults to the engine's configured frequency
    pub frequency: Option<Frequency>,
    /// Defaults to the engine's configured horizon
    pub horizon: Option<usize>,
    pub indicators: IndicatorParams,
    pub models: Vec<ForecastModel>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            var_method: VarMethod::Historical,
            frequency: None,
            horizon: None,
            indicators: IndicatorParams::default(),
            models: vec![
                ForecastModel::Arima(ArimaOrder::new(1, 1, 1)),
                ForecastModel::ExponentialSmoothing {
                    alpha: 0.3,
                    mode: SmoothingMode::Double { beta: 0.1 },
                },
                ForecastModel::MultipleRegression { lags: 5 },
                ForecastModel::RandomForest {
                    params: ForestParams {
                        n_estimators: 50,
                        max_depth: 8,
                        ..ForestParams::default()
                    },
                    lags: 5,
                },
            ],
        }
    }
}

/// Outcome of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: ForecastModel,
    pub forecast: Option<ForecastResult>,
    pub diagnostics: Option<ResidualDiagnostics>,
    /// Why the model could not be fitted
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub observations: usize,
    pub returns: ReturnStats,
    pub risk: RiskMetrics,
    pub var: VarResult,
    pub indicators: IndicatorSet,
    pub models: Vec<ModelReport>,
}

impl AnalysisReport {
    /// Human-readable digest, values rounded to `precision` places
    pub fn summary(&self, precision: u32) -> String {
        let r = |v: f64| round_to(v, precision);
        let mut lines = vec![
            format!("observations: {}", self.observations),
            self.returns.summary(precision),
            format!(
                "sharpe: {}  max drawdown: {}",
                r(self.risk.sharpe_ratio),
                r(self.risk.max_drawdown)
            ),
            format!(
                "{} VaR {}: {}  ES: {}",
                self.var.method,
                self.var.confidence_level,
                r(self.var.var),
                r(self.var.expected_shortfall)
            ),
        ];
        for model in &self.models {
            match (&model.forecast, &model.error) {
                (Some(f), _) => lines.push(format!(
                    "{}: rmse {}  next {:?}",
                    f.method,
                    r(f.accuracy.rmse),
                    f.forecasts.first().map(|p| r(p.value))
                )),
                (None, Some(e)) => lines.push(format!("{:?}: failed ({})", model.model, e)),
                (None, None) => {}
            }
        }
        lines.join("\n")
    }
}

impl QuantEngine {
    /// Run every analysis on a price series (oldest first)
    pub fn analyze_prices(&self, prices: &[f64], options: &ReportOptions) -> Result<AnalysisReport> {
        let calc = self.calculator();
        let returns = calc.calculate_returns_from_prices(prices, options.frequency)?;
        let risk = calc.calculate_risk_metrics(&returns.returns, options.frequency, None, None)?;
        let var = calc.calculate_var(&returns.returns, options.confidence, options.var_method)?;
        let indicators = calc.calculate_indicators(prices, &options.indicators)?;

        let models = options
            .models
            .iter()
            .map(|model| self.model_report(prices, model, options.horizon))
            .collect();

        info!(
            observations = prices.len(),
            models = options.models.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            observations: prices.len(),
            returns: (*returns).clone(),
            risk: (*risk).clone(),
            var: (*var).clone(),
            indicators: (*indicators).clone(),
            models,
        })
    }

    fn model_report(
        &self,
        prices: &[f64],
        model: &ForecastModel,
        horizon: Option<usize>,
    ) -> ModelReport {
        match self.forecaster().forecast(prices, model, horizon) {
            Ok(result) => {
                let diagnostics = self
                    .forecaster()
                    .perform_residual_diagnostics(&result.residuals)
                    .map(|d| (*d).clone())
                    .ok();
                ModelReport {
                    model: model.clone(),
                    forecast: Some((*result).clone()),
                    diagnostics,
                    error: None,
                }
            }
            Err(e) => {
                warn!(model = ?model, error = %e, "model skipped");
                ModelReport {
                    model: model.clone(),
                    forecast: None,
                    diagnostics: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
