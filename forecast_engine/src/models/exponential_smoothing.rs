//! Exponential smoothing models for time series forecasting
//!
//! Three nested recursions: simple smoothing tracks a level, Holt's method
//! adds a linear trend, and additive Holt-Winters adds a seasonal index per
//! position in the season.
//!
//! Updates are written in error-correction form, so a one-step error of zero
//! leaves every component untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use trade_math::series::ensure_min_len;
use trade_math::stats;
use tracing::info;

use crate::error::{ForecastError, Result};
use crate::models::{Components, FittedModel, ForecastPoint, Forecaster};

/// Which components are smoothed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Level only
    Simple,
    /// Level and trend (Holt)
    Double { beta: f64 },
    /// Level, trend and additive season (Holt-Winters)
    Triple {
        beta: f64,
        gamma: f64,
        season_length: usize,
    },
}

impl SmoothingMode {
    fn beta(&self) -> f64 {
        match self {
            SmoothingMode::Simple => 0.0,
            SmoothingMode::Double { beta } | SmoothingMode::Triple { beta, .. } => *beta,
        }
    }
}

impl fmt::Display for SmoothingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingMode::Simple => write!(f, "simple"),
            SmoothingMode::Double { beta } => write!(f, "double(beta={})", beta),
            SmoothingMode::Triple {
                beta,
                gamma,
                season_length,
            } => write!(
                f,
                "triple(beta={},gamma={},m={})",
                beta, gamma, season_length
            ),
        }
    }
}

/// Exponential smoothing model
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    mode: SmoothingMode,
}

/// Trained exponential smoothing model
#[derive(Debug, Clone)]
pub struct FittedExponentialSmoothing {
    alpha: f64,
    mode: SmoothingMode,
    level: f64,
    trend: f64,
    /// Seasonal indices by position `t mod m`
    seasonal: Vec<f64>,
    /// Length of the training series
    n: usize,
    sigma2: f64,
    actual: Vec<f64>,
    fitted: Vec<f64>,
    level_path: Vec<f64>,
    trend_path: Vec<f64>,
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "{} must be in (0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing model
    pub fn new(alpha: f64, mode: SmoothingMode) -> Result<Self> {
        check_unit("alpha", alpha)?;
        match mode {
            SmoothingMode::Simple => {}
            SmoothingMode::Double { beta } => check_unit("beta", beta)?,
            SmoothingMode::Triple {
                beta,
                gamma,
                season_length,
            } => {
                check_unit("beta", beta)?;
                check_unit("gamma", gamma)?;
                if season_length < 2 {
                    return Err(ForecastError::InvalidArgument(format!(
                        "Season length must be at least 2, got {}",
                        season_length
                    )));
                }
            }
        }
        Ok(Self { alpha, mode })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn mode(&self) -> SmoothingMode {
        self.mode
    }

    fn fit_simple(&self, series: &[f64]) -> FittedExponentialSmoothing {
        let mut level = series[0];
        let mut fitted = Vec::with_capacity(series.len());
        let mut level_path = Vec::with_capacity(series.len());
        fitted.push(level);
        level_path.push(level);

        for &y in &series[1..] {
            fitted.push(level);
            level += self.alpha * (y - level);
            level_path.push(level);
        }

        self.finish(series.to_vec(), fitted, level, 0.0, Vec::new(), level_path, Vec::new())
    }

    fn fit_double(&self, series: &[f64], beta: f64) -> FittedExponentialSmoothing {
        let mut level = series[0];
        let mut trend = series[1] - series[0];
        let mut fitted = vec![level];
        let mut level_path = vec![level];
        let mut trend_path = vec![trend];

        for &y in &series[1..] {
            let forecast = level + trend;
            let error = y - forecast;
            fitted.push(forecast);
            level = forecast + self.alpha * error;
            trend += self.alpha * beta * error;
            level_path.push(level);
            trend_path.push(trend);
        }

        self.finish(series.to_vec(), fitted, level, trend, Vec::new(), level_path, trend_path)
    }

    fn fit_triple(
        &self,
        series: &[f64],
        beta: f64,
        gamma: f64,
        m: usize,
    ) -> FittedExponentialSmoothing {
        let first = stats::mean(&series[..m]);
        let mut level = first;
        let mut trend = if series.len() >= 2 * m {
            (stats::mean(&series[m..2 * m]) - first) / m as f64
        } else {
            0.0
        };
        let mut seasonal: Vec<f64> = series[..m].iter().map(|y| y - first).collect();

        let mut fitted = Vec::with_capacity(series.len() - m);
        let mut level_path = vec![level];
        let mut trend_path = vec![trend];

        for (t, &y) in series.iter().enumerate().skip(m) {
            let forecast = level + trend + seasonal[t % m];
            let error = y - forecast;
            fitted.push(forecast);
            level += trend + self.alpha * error;
            trend += self.alpha * beta * error;
            seasonal[t % m] += gamma * (1.0 - self.alpha) * error;
            level_path.push(level);
            trend_path.push(trend);
        }

        self.finish(
            series[m..].to_vec(),
            fitted,
            level,
            trend,
            seasonal,
            level_path,
            trend_path,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        actual: Vec<f64>,
        fitted: Vec<f64>,
        level: f64,
        trend: f64,
        seasonal: Vec<f64>,
        level_path: Vec<f64>,
        trend_path: Vec<f64>,
    ) -> FittedExponentialSmoothing {
        let sse: f64 = actual
            .iter()
            .zip(&fitted)
            .map(|(a, f)| (a - f).powi(2))
            .sum();
        let n = match self.mode {
            SmoothingMode::Triple { season_length, .. } => actual.len() + season_length,
            _ => actual.len(),
        };
        FittedExponentialSmoothing {
            alpha: self.alpha,
            mode: self.mode,
            level,
            trend,
            seasonal,
            n,
            sigma2: sse / actual.len() as f64,
            actual,
            fitted,
            level_path,
            trend_path,
        }
    }
}

impl Forecaster for ExponentialSmoothing {
    type Fitted = FittedExponentialSmoothing;

    fn fit(&self, series: &[f64]) -> Result<FittedExponentialSmoothing> {
        let model = match self.mode {
            SmoothingMode::Simple => {
                ensure_min_len(series, 1, "series")?;
                self.fit_simple(series)
            }
            SmoothingMode::Double { beta } => {
                ensure_min_len(series, 2, "series")?;
                self.fit_double(series, beta)
            }
            SmoothingMode::Triple {
                beta,
                gamma,
                season_length,
            } => {
                // One full season to initialize plus one observation to fit
                ensure_min_len(series, season_length + 1, "series")?;
                self.fit_triple(series, beta, gamma, season_length)
            }
        };

        info!(
            mode = %self.mode,
            alpha = self.alpha,
            n = series.len(),
            sigma2 = model.sigma2,
            "fitted exponential smoothing"
        );
        Ok(model)
    }
}

impl FittedExponentialSmoothing {
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    /// Weight on the shock `j` steps back in an `h`-step forecast error
    fn error_weight(&self, j: usize) -> f64 {
        let beta = self.mode.beta();
        let seasonal = match self.mode {
            SmoothingMode::Triple {
                gamma,
                season_length,
                ..
            } if j % season_length == 0 => gamma * (1.0 - self.alpha),
            _ => 0.0,
        };
        self.alpha + self.alpha * beta * j as f64 + seasonal
    }
}

impl FittedModel for FittedExponentialSmoothing {
    fn name(&self) -> String {
        match self.mode {
            SmoothingMode::Simple => "Simple Exponential Smoothing".to_string(),
            SmoothingMode::Double { .. } => "Holt Linear Trend".to_string(),
            SmoothingMode::Triple { season_length, .. } => {
                format!("Holt-Winters Additive (m={})", season_length)
            }
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("alpha".to_string(), self.alpha);
        params.insert("sigma2".to_string(), self.sigma2);
        match self.mode {
            SmoothingMode::Simple => {}
            SmoothingMode::Double { beta } => {
                params.insert("beta".to_string(), beta);
            }
            SmoothingMode::Triple {
                beta,
                gamma,
                season_length,
            } => {
                params.insert("beta".to_string(), beta);
                params.insert("gamma".to_string(), gamma);
                params.insert("season_length".to_string(), season_length as f64);
            }
        }
        params
    }

    fn actual(&self) -> &[f64] {
        &self.actual
    }

    fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let mut variance_sum = 1.0;
        Ok((1..=horizon)
            .map(|h| {
                let mut value = self.level + h as f64 * self.trend;
                if !self.seasonal.is_empty() {
                    value += self.seasonal[(self.n + h - 1) % self.seasonal.len()];
                }
                if h > 1 {
                    variance_sum += self.error_weight(h - 1).powi(2);
                }
                ForecastPoint::with_standard_error(value, (self.sigma2 * variance_sum).sqrt())
            })
            .collect())
    }

    fn components(&self) -> Option<Components> {
        let has_trend = !matches!(self.mode, SmoothingMode::Simple);
        Some(Components {
            level: self.level_path.clone(),
            trend: has_trend.then(|| self.trend_path.clone()),
            seasonal: (!self.seasonal.is_empty()).then(|| self.seasonal.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_validation() {
        assert!(ExponentialSmoothing::new(0.0, SmoothingMode::Simple).is_err());
        assert!(ExponentialSmoothing::new(1.5, SmoothingMode::Simple).is_err());
        assert!(ExponentialSmoothing::new(1.0, SmoothingMode::Simple).is_ok());
        assert!(ExponentialSmoothing::new(0.5, SmoothingMode::Double { beta: 0.0 }).is_err());

        let no_season = SmoothingMode::Triple {
            beta: 0.1,
            gamma: 0.1,
            season_length: 1,
        };
        assert!(ExponentialSmoothing::new(0.5, no_season).is_err());
    }

    #[test]
    fn test_simple_level_update() {
        let model = ExponentialSmoothing::new(0.5, SmoothingMode::Simple)
            .unwrap()
            .fit(&[10.0, 12.0, 14.0])
            .unwrap();
        // 10 -> 11 -> 12.5
        assert_eq!(model.level(), 12.5);
        assert_eq!(model.fitted(), &[10.0, 10.0, 11.0]);
    }

    #[test]
    fn test_error_weights() {
        let model = ExponentialSmoothing::new(0.5, SmoothingMode::Double { beta: 0.5 })
            .unwrap()
            .fit(&[1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(model.error_weight(2), 0.5 + 0.5 * 0.5 * 2.0);
    }
}
