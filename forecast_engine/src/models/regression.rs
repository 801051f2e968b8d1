//! Ordinary least-squares regression
//!
//! [`multiple_regression`] reports the full coefficient table for explicit
//! regressors. [`LaggedRegression`] applies the same solver to a series'
//! own lags so it can forecast like the other models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trade_math::linalg::{design_from_columns, design_from_rows, least_squares};
use trade_math::series::{ensure_finite, ensure_min_len};
use trade_math::stats;
use tracing::info;

use crate::error::{ForecastError, Result};
use crate::models::{lag_matrix, latest_lags, FittedModel, ForecastPoint, Forecaster};

/// Estimate and inference for one regressor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientStats {
    pub estimate: f64,
    pub standard_error: f64,
    pub t_statistic: f64,
    /// Two-sided, Student-t with `df_residual` degrees of freedom
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// One entry per column of `X`, in input order
    pub coefficients: Vec<CoefficientStats>,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    /// `sqrt(RSS / df_residual)`
    pub residual_std_error: f64,
    pub df_model: usize,
    pub df_residual: usize,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Some column of `X` is all ones
    pub has_intercept: bool,
}

impl RegressionResult {
    pub fn estimates(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }
}

fn is_intercept(column: &[f64]) -> bool {
    column.iter().all(|v| *v == 1.0)
}

/// Regress `y` on the columns of `x`
///
/// No intercept is added; pass a column of ones to include one. R² is
/// centred when an intercept is present and uncentred otherwise.
pub fn multiple_regression(y: &[f64], x: &[Vec<f64>]) -> Result<RegressionResult> {
    if y.is_empty() || x.is_empty() {
        return Err(ForecastError::InvalidArgument(
            "Regression needs a non-empty response and at least one regressor".to_string(),
        ));
    }
    if let Some(bad) = x.iter().position(|c| c.len() != y.len()) {
        return Err(ForecastError::InvalidArgument(format!(
            "Regressor {} has length {}, response has {}",
            bad,
            x[bad].len(),
            y.len()
        )));
    }
    ensure_finite(y, "y")?;
    for column in x {
        ensure_finite(column, "regressor")?;
    }

    let n = y.len();
    let k = x.len();
    if n <= k {
        return Err(ForecastError::InsufficientData(format!(
            "Regression with {} coefficients needs more than {} observations, got {}",
            k, k, n
        )));
    }

    let design = design_from_columns(x)?;
    let fit = least_squares(&design, y)?;

    let has_intercept = x.iter().any(|c| is_intercept(c));
    let rss = fit.rss();
    let tss: f64 = if has_intercept {
        let mean = stats::mean(y);
        y.iter().map(|v| (v - mean).powi(2)).sum()
    } else {
        y.iter().map(|v| v * v).sum()
    };
    if tss <= 0.0 {
        return Err(ForecastError::NumericalDegeneracy(
            "Response has no variation to explain".to_string(),
        ));
    }
    if rss <= f64::EPSILON * tss {
        return Err(ForecastError::NumericalDegeneracy(
            "Perfect fit leaves no residual variance for standard errors".to_string(),
        ));
    }

    let df_residual = n - k;
    let df_model = if has_intercept { k - 1 } else { k };
    let sigma2 = rss / df_residual as f64;

    let coefficients = fit
        .coefficients
        .iter()
        .enumerate()
        .map(|(j, &estimate)| {
            let standard_error = (sigma2 * fit.xtx_inverse[(j, j)]).max(0.0).sqrt();
            let t_statistic = estimate / standard_error;
            CoefficientStats {
                estimate,
                standard_error,
                t_statistic,
                p_value: stats::t_two_sided_p(t_statistic, df_residual as f64),
            }
        })
        .collect();

    let r_squared = 1.0 - rss / tss;
    let denominator = if has_intercept { n - 1 } else { n };
    let adjusted_r_squared =
        1.0 - (1.0 - r_squared) * denominator as f64 / df_residual as f64;

    let (f_statistic, f_p_value) = if df_model == 0 {
        (0.0, 1.0)
    } else {
        let f = (r_squared / df_model as f64) / ((1.0 - r_squared) / df_residual as f64);
        (f, stats::f_sf(f, df_model as f64, df_residual as f64))
    };

    info!(n, k, r_squared, f_statistic, "fitted multiple regression");

    Ok(RegressionResult {
        coefficients,
        r_squared,
        adjusted_r_squared,
        f_statistic,
        f_p_value,
        residual_std_error: sigma2.sqrt(),
        df_model,
        df_residual,
        fitted: fit.fitted,
        residuals: fit.residuals,
        has_intercept,
    })
}

/// Autoregression by least squares on the previous `lags` values
#[derive(Debug, Clone)]
pub struct LaggedRegression {
    lags: usize,
}

#[derive(Debug, Clone)]
pub struct FittedLaggedRegression {
    lags: usize,
    /// Intercept first, then lag 1..=lags
    coefficients: Vec<f64>,
    sigma: f64,
    history: Vec<f64>,
    actual: Vec<f64>,
    fitted: Vec<f64>,
}

impl LaggedRegression {
    pub fn new(lags: usize) -> Result<Self> {
        if lags == 0 {
            return Err(ForecastError::InvalidArgument(
                "Lagged regression needs at least one lag".to_string(),
            ));
        }
        Ok(Self { lags })
    }

    /// Enough rows to leave one residual degree of freedom
    pub fn min_observations(&self) -> usize {
        2 * self.lags + 2
    }
}

impl Forecaster for LaggedRegression {
    type Fitted = FittedLaggedRegression;

    fn fit(&self, series: &[f64]) -> Result<FittedLaggedRegression> {
        ensure_min_len(series, self.min_observations(), "series")?;

        let (rows, targets) = lag_matrix(series, self.lags);
        let rows: Vec<Vec<f64>> = rows
            .into_iter()
            .map(|lags| std::iter::once(1.0).chain(lags).collect())
            .collect();
        let design = design_from_rows(&rows)?;
        let fit = least_squares(&design, &targets)?;

        let df_residual = targets.len() - rows[0].len();
        let sigma = (fit.rss() / df_residual as f64).sqrt();

        info!(lags = self.lags, n = series.len(), sigma, "fitted lagged regression");

        Ok(FittedLaggedRegression {
            lags: self.lags,
            coefficients: fit.coefficients,
            sigma,
            history: series.to_vec(),
            actual: targets,
            fitted: fit.fitted,
        })
    }
}

impl FittedLaggedRegression {
    fn predict_next(&self, history: &[f64]) -> f64 {
        latest_lags(history, self.lags)
            .iter()
            .zip(&self.coefficients[1..])
            .fold(self.coefficients[0], |acc, (x, b)| acc + x * b)
    }
}

impl FittedModel for FittedLaggedRegression {
    fn name(&self) -> String {
        format!("Multiple Regression (lags={})", self.lags)
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("intercept".to_string(), self.coefficients[0]);
        params.insert("sigma".to_string(), self.sigma);
        for (j, b) in self.coefficients[1..].iter().enumerate() {
            params.insert(format!("lag{}", j + 1), *b);
        }
        params
    }

    fn actual(&self) -> &[f64] {
        &self.actual
    }

    fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    /// Recursive forecasts; the interval treats errors as independent across
    /// steps, so `se_h = σ√h`
    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let mut history = self.history.clone();
        Ok((1..=horizon)
            .map(|h| {
                let value = self.predict_next(&history);
                history.push(value);
                ForecastPoint::with_standard_error(value, self.sigma * (h as f64).sqrt())
            })
            .collect())
    }
}
