//! Forecasting models for time series data
//!
//! Every model follows the same two-step shape: a parameter struct implements
//! [`Forecaster`] and fits into a [`FittedModel`], which can project any
//! horizon and report in-sample fit. [`ForecastModel`] is the closed set of
//! model families, used for dispatch and as a cache-key input.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::metrics::{calculate_forecast_accuracy, AccuracyMetrics};

pub mod arima;
pub mod exponential_smoothing;
pub mod random_forest;
pub mod regression;

use arima::{Arima, ArimaOrder};
use exponential_smoothing::{ExponentialSmoothing, SmoothingMode};
use random_forest::{ForestParams, LaggedForest};
use regression::LaggedRegression;

/// Two-sided 95% standard-normal quantile used for forecast intervals
pub const INTERVAL_Z: f64 = 1.959_963_984_540_054;

/// One projected period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// 95% interval `value ± z·se`
    ///
    /// The standard error is floored so that the bounds strictly enclose the
    /// value even for a perfect in-sample fit.
    pub fn with_standard_error(value: f64, standard_error: f64) -> Self {
        let floor = 1e-9 * value.abs().max(1.0);
        let margin = INTERVAL_Z * standard_error.max(floor);
        Self {
            value,
            lower_bound: value - margin,
            upper_bound: value + margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    pub aic: f64,
    pub bic: f64,
}

/// Internal state of a smoothing model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Level after each update
    pub level: Vec<f64>,
    /// Trend after each update
    pub trend: Option<Vec<f64>>,
    /// Final seasonal index for each position in the season
    pub seasonal: Option<Vec<f64>>,
}

/// Fitted model plus projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub method: String,
    pub parameters: BTreeMap<String, f64>,
    pub forecasts: Vec<ForecastPoint>,
    /// In-sample one-step predictions, aligned to the tail of the input
    pub fitted: Vec<f64>,
    /// Actual minus fitted, aligned like `fitted`
    pub residuals: Vec<f64>,
    /// In-sample accuracy of `fitted`
    pub accuracy: AccuracyMetrics,
    pub information_criteria: Option<InformationCriteria>,
    pub components: Option<Components>,
}

impl ForecastResult {
    /// Point forecasts only
    pub fn values(&self) -> Vec<f64> {
        self.forecasts.iter().map(|p| p.value).collect()
    }

    pub fn horizon(&self) -> usize {
        self.forecasts.len()
    }
}

/// A fitted model
pub trait FittedModel: Debug + Send + Sync {
    /// Name including the order or mode, e.g. `ARIMA(1,1,0)`
    fn name(&self) -> String;

    /// Estimated parameters by name
    fn parameters(&self) -> BTreeMap<String, f64>;

    /// Observed values the fitted values line up with
    fn actual(&self) -> &[f64];

    /// In-sample one-step predictions
    fn fitted(&self) -> &[f64];

    /// Project `horizon` periods past the end of the training series
    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>>;

    fn residuals(&self) -> Vec<f64> {
        self.actual()
            .iter()
            .zip(self.fitted())
            .map(|(a, f)| a - f)
            .collect()
    }

    fn information_criteria(&self) -> Option<InformationCriteria> {
        None
    }

    fn components(&self) -> Option<Components> {
        None
    }

    /// Forecast and summarize the fit
    fn forecast_result(&self, horizon: usize) -> Result<ForecastResult> {
        validate_horizon(horizon)?;
        Ok(ForecastResult {
            method: self.name(),
            parameters: self.parameters(),
            forecasts: self.forecast(horizon)?,
            fitted: self.fitted().to_vec(),
            residuals: self.residuals(),
            accuracy: calculate_forecast_accuracy(self.actual(), self.fitted())?,
            information_criteria: self.information_criteria(),
            components: self.components(),
        })
    }
}

/// A model family with its parameters, ready to fit to a series
pub trait Forecaster: Debug {
    /// The type of fitted model produced
    type Fitted: FittedModel + 'static;

    fn fit(&self, series: &[f64]) -> Result<Self::Fitted>;
}

pub(crate) fn validate_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::InvalidArgument(
            "Forecast horizon must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Model family and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ForecastModel {
    Arima(ArimaOrder),
    ExponentialSmoothing { alpha: f64, mode: SmoothingMode },
    /// Least squares on the previous `lags` values plus an intercept
    MultipleRegression { lags: usize },
    /// Random forest on the previous `lags` values
    RandomForest { params: ForestParams, lags: usize },
}

impl ForecastModel {
    /// Fit the model, returning it behind the common interface
    pub fn fit(&self, series: &[f64]) -> Result<Box<dyn FittedModel>> {
        Ok(match self {
            ForecastModel::Arima(order) => Box::new(Arima::new(*order).fit(series)?),
            ForecastModel::ExponentialSmoothing { alpha, mode } => {
                Box::new(ExponentialSmoothing::new(*alpha, *mode)?.fit(series)?)
            }
            ForecastModel::MultipleRegression { lags } => {
                Box::new(LaggedRegression::new(*lags)?.fit(series)?)
            }
            ForecastModel::RandomForest { params, lags } => {
                Box::new(LaggedForest::new(params.clone(), *lags)?.fit(series)?)
            }
        })
    }
}

/// Lagged design: row `t` holds `series[t-1], ..., series[t-lags]`, target
/// `series[t]`, for `t = lags..n`
pub(crate) fn lag_matrix(series: &[f64], lags: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    (lags..series.len())
        .map(|t| ((1..=lags).map(|j| series[t - j]).collect(), series[t]))
        .unzip()
}

/// Most recent `lags` values, newest first
pub(crate) fn latest_lags(history: &[f64], lags: usize) -> Vec<f64> {
    history.iter().rev().take(lags).copied().collect()
}
