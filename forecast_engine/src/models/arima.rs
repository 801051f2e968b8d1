//! ARIMA models for time series forecasting
//!
//! The series is differenced `d` times and an ARMA(p, q) with intercept is
//! estimated on the result by Hannan-Rissanen regression: a long
//! autoregression supplies proxy innovations, then the differenced series is
//! regressed on its own lags and the lagged proxies. Residuals are recomputed
//! recursively from the final coefficients.
//!
//! When the sample cannot support a stage, estimation falls back to AR-only,
//! then to a mean-only model, logging a warning each time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use trade_math::linalg::{design_from_rows, least_squares};
use trade_math::series::ensure_min_len;
use trade_math::stats;
use tracing::{info, warn};

use crate::error::{ForecastError, Result};
use crate::models::{FittedModel, ForecastPoint, Forecaster, InformationCriteria};

/// MA coefficients are kept inside this bound to keep the recursion invertible
const MA_BOUND: f64 = 0.98;

/// ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// `p + d + q + 1`
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct Arima {
    order: ArimaOrder,
}

/// Fitted ARIMA model
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    series: Vec<f64>,
    /// Innovations on the differenced scale, zero before index `p`
    innovations: Vec<f64>,
    actual: Vec<f64>,
    fitted: Vec<f64>,
    criteria: InformationCriteria,
}

/// Difference a series `d` times
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut out = series.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Coefficients of one ARMA estimation stage
struct ArmaEstimate {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
}

impl Arima {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Regress `w[t]` on an intercept, `p` own lags and `q` lags of `proxy`,
    /// over `t = start..m`
    fn regress(w: &[f64], proxy: &[f64], p: usize, q: usize, start: usize) -> Result<ArmaEstimate> {
        let rows: Vec<Vec<f64>> = (start..w.len())
            .map(|t| {
                let mut row = Vec::with_capacity(1 + p + q);
                row.push(1.0);
                row.extend((1..=p).map(|i| w[t - i]));
                row.extend((1..=q).map(|j| proxy[t - j]));
                row
            })
            .collect();
        if rows.is_empty() {
            return Err(ForecastError::InsufficientData(
                "no rows left for the ARMA regression".to_string(),
            ));
        }
        let design = design_from_rows(&rows)?;
        let fit = least_squares(&design, &w[start..])?;
        let beta = fit.coefficients;
        Ok(ArmaEstimate {
            intercept: beta[0],
            ar: beta[1..=p].to_vec(),
            ma: beta[p + 1..].to_vec(),
        })
    }

    /// Two-stage Hannan-Rissanen estimate of ARMA(p, q) on `w`
    fn hannan_rissanen(w: &[f64], p: usize, q: usize) -> Result<ArmaEstimate> {
        let m = w.len();
        let long = (p + q).max((m as f64).ln().ceil() as usize).max(1);
        if m < 2 * long + 2 {
            return Err(ForecastError::InsufficientData(format!(
                "long autoregression of order {} needs {} observations, have {}",
                long,
                2 * long + 2,
                m
            )));
        }

        let stage1 = Self::regress(w, &[], long, 0, long)?;
        let mut proxy = vec![0.0; m];
        for t in long..m {
            let predicted = stage1.intercept
                + (1..=long).map(|i| stage1.ar[i - 1] * w[t - i]).sum::<f64>();
            proxy[t] = w[t] - predicted;
        }

        let start = p.max(long + q);
        if m < start + p + q + 2 {
            return Err(ForecastError::InsufficientData(format!(
                "ARMA({},{}) regression needs {} observations, have {}",
                p,
                q,
                start + p + q + 2,
                m
            )));
        }
        Self::regress(w, &proxy, p, q, start)
    }

    /// Estimate with the fallback chain ARMA, AR, mean
    fn estimate(&self, w: &[f64]) -> ArmaEstimate {
        let ArimaOrder { p, q, .. } = self.order;

        if q > 0 {
            match Self::hannan_rissanen(w, p, q) {
                Ok(est) => return est,
                Err(e) => warn!(order = %self.order, error = %e, "MA stage skipped"),
            }
        }
        if p > 0 {
            match Self::regress(w, &[], p, 0, p) {
                Ok(mut est) => {
                    est.ma = vec![0.0; q];
                    return est;
                }
                Err(e) => warn!(order = %self.order, error = %e, "AR stage skipped"),
            }
        }
        ArmaEstimate {
            intercept: stats::mean(w),
            ar: vec![0.0; p],
            ma: vec![0.0; q],
        }
    }
}

/// Conditional innovations `e[t]` for `t >= p`, zero before
fn innovations(w: &[f64], est: &ArmaEstimate) -> Result<Vec<f64>> {
    let p = est.ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let ar: f64 = (1..=p).map(|i| est.ar[i - 1] * w[t - i]).sum();
        let ma: f64 = est
            .ma
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * e[t - j - 1])
            .sum();
        e[t] = w[t] - est.intercept - ar - ma;
        if !e[t].is_finite() {
            return Err(ForecastError::NumericalDegeneracy(format!(
                "ARMA recursion diverged at index {}",
                t
            )));
        }
    }
    Ok(e)
}

/// ψ-weights `ψ₀..ψ_{h-1}` of the ARIMA process as an infinite MA
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, horizon: usize) -> Vec<f64> {
    // φ*(B) = φ(B)(1 − B)^d as coefficients of B⁰, B¹, ...
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|a| -a)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = Vec::with_capacity(horizon);
    for j in 0..horizon {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let theta = ma.get(j - 1).copied().unwrap_or(0.0);
        let ar_part: f64 = (1..=j.min(phi_star.len()))
            .map(|i| phi_star[i - 1] * psi[j - i])
            .sum();
        psi.push(theta + ar_part);
    }
    psi
}

impl Forecaster for Arima {
    type Fitted = FittedArima;

    fn fit(&self, series: &[f64]) -> Result<FittedArima> {
        let ArimaOrder { p, d, q } = self.order;
        ensure_min_len(series, self.order.min_observations(), "series")?;

        let w = difference(series, d);
        let mut est = self.estimate(&w);
        for theta in &mut est.ma {
            *theta = theta.clamp(-MA_BOUND, MA_BOUND);
        }

        let e = innovations(&w, &est)?;
        let tail = &e[p..];
        let count = tail.len() as f64;
        let sigma2 = tail.iter().map(|x| x * x).sum::<f64>() / count;

        // Gaussian log-likelihood; k counts the intercept, p and q
        let k = (p + q + 1) as f64;
        let log_likelihood =
            -0.5 * count * (1.0 + (2.0 * std::f64::consts::PI * sigma2.max(f64::MIN_POSITIVE)).ln());
        let criteria = InformationCriteria {
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * count.ln(),
        };

        // Differencing is linear in known past values, so level errors equal
        // differenced-scale errors
        let actual = series[d + p..].to_vec();
        let fitted = actual.iter().zip(tail).map(|(y, err)| y - err).collect();

        info!(
            order = %self.order,
            n = series.len(),
            sigma2,
            aic = criteria.aic,
            "fitted ARIMA"
        );

        Ok(FittedArima {
            order: self.order,
            intercept: est.intercept,
            ar: est.ar,
            ma: est.ma,
            sigma2,
            series: series.to_vec(),
            innovations: e,
            actual,
            fitted,
            criteria,
        })
    }
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Point forecasts on the differenced scale
    fn forecast_differenced(&self, horizon: usize) -> Vec<f64> {
        let mut w = difference(&self.series, self.order.d);
        let mut e = self.innovations.clone();
        let m = w.len();
        for t in m..m + horizon {
            let ar: f64 = (1..=self.ar.len()).map(|i| self.ar[i - 1] * w[t - i]).sum();
            let ma: f64 = self
                .ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, theta)| theta * e[t - j - 1])
                .sum();
            w.push(self.intercept + ar + ma);
            e.push(0.0);
        }
        w.split_off(m)
    }
}

impl FittedModel for FittedArima {
    fn name(&self) -> String {
        self.order.to_string()
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("intercept".to_string(), self.intercept);
        params.insert("sigma2".to_string(), self.sigma2);
        for (i, phi) in self.ar.iter().enumerate() {
            params.insert(format!("ar{}", i + 1), *phi);
        }
        for (j, theta) in self.ma.iter().enumerate() {
            params.insert(format!("ma{}", j + 1), *theta);
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
        let mut path = self.forecast_differenced(horizon);

        // Integrate back up one differencing level at a time
        for level in (0..self.order.d).rev() {
            let base = difference(&self.series, level);
            let mut last = base.last().copied().unwrap_or(0.0);
            path = path
                .iter()
                .map(|dw| {
                    last += dw;
                    last
                })
                .collect();
        }

        let psi = psi_weights(&self.ar, &self.ma, self.order.d, horizon);
        let mut cumulative = 0.0;
        Ok(path
            .into_iter()
            .zip(psi)
            .map(|(value, weight)| {
                cumulative += weight * weight;
                ForecastPoint::with_standard_error(value, (self.sigma2 * cumulative).sqrt())
            })
            .collect())
    }

    fn information_criteria(&self) -> Option<InformationCriteria> {
        Some(self.criteria)
    }
}
