//! Residual adequacy checks
//!
//! A well-specified model leaves residuals that look like white noise:
//! centred on zero, roughly normal, and free of autocorrelation.

use serde::{Deserialize, Serialize};
use trade_math::series::ensure_min_len;
use trade_math::stats;

use crate::error::{ForecastError, Result};

/// Significance level for rejecting the null hypothesis
pub const SIGNIFICANCE: f64 = 0.05;

/// Jarque-Bera normality test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

/// Ljung-Box portmanteau test for joint autocorrelation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LjungBoxResult {
    pub lb_statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    /// Autocorrelation is significant at [`SIGNIFICANCE`]
    pub reject_null: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    pub mean: f64,
    pub std: f64,
    pub normality_test: NormalityTest,
    /// Computed at `min(10, n / 5)` lags; `None` when the series is too short
    /// or constant
    pub ljung_box: Option<LjungBoxResult>,
}

/// `JB = n/6 · (S² + K²/4)`, chi-squared with 2 degrees of freedom
pub fn jarque_bera(data: &[f64]) -> Result<NormalityTest> {
    ensure_min_len(data, 4, "residuals")?;
    let n = data.len() as f64;
    let skewness = stats::skewness(data);
    let excess_kurtosis = stats::excess_kurtosis(data);
    let statistic = n / 6.0 * (skewness.powi(2) + excess_kurtosis.powi(2) / 4.0);
    Ok(NormalityTest {
        statistic,
        p_value: stats::chi_squared_sf(statistic, 2.0),
        skewness,
        excess_kurtosis,
    })
}

/// `Q = n(n+2) Σ ρ̂ₖ² / (n − k)` over `k = 1..=lags`
pub fn ljung_box_test(data: &[f64], lags: usize) -> Result<LjungBoxResult> {
    if lags == 0 {
        return Err(ForecastError::InvalidArgument(
            "Ljung-Box test needs at least one lag".to_string(),
        ));
    }
    ensure_min_len(data, lags + 2, "data")?;
    if stats::population_variance(data) <= 0.0 {
        return Err(ForecastError::NumericalDegeneracy(
            "Ljung-Box test is undefined for a constant series".to_string(),
        ));
    }

    let n = data.len() as f64;
    let q = n
        * (n + 2.0)
        * (1..=lags)
            .map(|k| stats::autocorrelation(data, k).powi(2) / (n - k as f64))
            .sum::<f64>();
    let p_value = stats::chi_squared_sf(q, lags as f64);

    Ok(LjungBoxResult {
        lb_statistic: q,
        p_value,
        lags,
        reject_null: p_value < SIGNIFICANCE,
    })
}

/// Lag count used by [`perform_residual_diagnostics`]
pub fn default_lags(n: usize) -> usize {
    (n / 5).min(10)
}

pub fn perform_residual_diagnostics(residuals: &[f64]) -> Result<ResidualDiagnostics> {
    let normality_test = jarque_bera(residuals)?;

    let lags = default_lags(residuals.len());
    let ljung_box = if lags > 0 && stats::population_variance(residuals) > 0.0 {
        Some(ljung_box_test(residuals, lags)?)
    } else {
        None
    };

    Ok(ResidualDiagnostics {
        mean: stats::mean(residuals),
        std: stats::std_dev(residuals),
        normality_test,
        ljung_box,
    })
}
