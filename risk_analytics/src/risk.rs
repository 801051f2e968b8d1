//! Risk-adjusted performance and drawdown

use serde::{Deserialize, Serialize};
use trade_math::series::{ensure_finite, ensure_min_len};
use trade_math::{stats, Frequency};

use crate::error::{Result, RiskError};
use crate::returns::{
    annualize_growth, calculate_returns, cumulative_returns, total_return, MIN_VOLATILITY,
};

/// How the values passed to [`calculate_max_drawdown`] should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownBasis {
    /// Positive price or wealth levels; drawdown is `(peak − v) / peak`
    #[default]
    Level,
    /// Cumulative returns (`0.0` = start); drawdown is `(peak − v) / (1 + peak)`
    CumulativeReturn,
}

/// Scalar risk measures of a return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: f64,
    /// `None` when no period falls below the risk-free hurdle
    pub sortino_ratio: Option<f64>,
    /// Largest peak-to-trough decline of the compounded curve, in `[0, 1]`
    pub max_drawdown: f64,
    /// `None` when the series never draws down
    pub calmar_ratio: Option<f64>,
    pub beta: Option<f64>,
    /// Jensen's alpha, annualized
    pub alpha: Option<f64>,
    pub tracking_error: Option<f64>,
    pub information_ratio: Option<f64>,
}

/// Excess annualized return per unit of annualized volatility
///
/// The hurdle is `benchmark_return` when given, otherwise `risk_free_rate`.
/// A series with zero volatility has no defined ratio and fails with
/// [`RiskError::NumericalDegeneracy`].
pub fn calculate_sharpe_ratio(
    returns: &[f64],
    frequency: Frequency,
    risk_free_rate: f64,
    benchmark_return: Option<f64>,
) -> Result<f64> {
    let hurdle = benchmark_return.unwrap_or(risk_free_rate);
    if !hurdle.is_finite() {
        return Err(RiskError::InvalidArgument(format!(
            "hurdle rate must be finite, got {}",
            hurdle
        )));
    }

    let stats = calculate_returns(returns, frequency)?;
    if stats.volatility < MIN_VOLATILITY {
        return Err(RiskError::NumericalDegeneracy(
            "Sharpe ratio is undefined for a zero-volatility series".to_string(),
        ));
    }
    Ok((stats.annualized_return - hurdle) / stats.volatility)
}

/// Maximum peak-to-trough decline of a curve, bounded to `[0, 1]`
///
/// An empty or single-point curve has no drawdown.
pub fn calculate_max_drawdown(curve: &[f64], basis: DrawdownBasis) -> Result<f64> {
    ensure_finite(curve, "curve")?;
    match basis {
        DrawdownBasis::Level => {
            if let Some(idx) = curve.iter().position(|&v| v <= 0.0) {
                return Err(RiskError::InvalidArgument(format!(
                    "level curve must be positive, got {} at index {}",
                    curve[idx], idx
                )));
            }
        }
        DrawdownBasis::CumulativeReturn => {
            if let Some(idx) = curve.iter().position(|&v| v < -1.0) {
                return Err(RiskError::InvalidArgument(format!(
                    "cumulative return below -100% at index {}",
                    idx
                )));
            }
        }
    }

    let mut peak = match curve.first() {
        Some(&first) => first,
        None => return Ok(0.0),
    };
    let mut max_dd: f64 = 0.0;
    for &value in curve {
        peak = peak.max(value);
        let dd = match basis {
            DrawdownBasis::Level => (peak - value) / peak,
            DrawdownBasis::CumulativeReturn => (peak - value) / (1.0 + peak),
        };
        max_dd = max_dd.max(dd);
    }
    Ok(max_dd.clamp(0.0, 1.0))
}

/// Sharpe, Sortino, drawdown, Calmar and, with a benchmark, the relative
/// measures (beta, alpha, tracking error, information ratio)
pub fn calculate_risk_metrics(
    returns: &[f64],
    frequency: Frequency,
    risk_free_rate: f64,
    benchmark: Option<&[f64]>,
) -> Result<RiskMetrics> {
    let stats = calculate_returns(returns, frequency)?;
    let ppy = frequency.periods_per_year();
    let sharpe_ratio = calculate_sharpe_ratio(returns, frequency, risk_free_rate, None)?;

    // Downside deviation against the per-period risk-free hurdle
    let period_rf = risk_free_rate / ppy;
    let downside = (returns
        .iter()
        .map(|r| (r - period_rf).min(0.0).powi(2))
        .sum::<f64>()
        / returns.len() as f64)
        .sqrt()
        * ppy.sqrt();
    let sortino_ratio = (downside >= MIN_VOLATILITY)
        .then(|| (stats.annualized_return - risk_free_rate) / downside);

    // Curve starts at the initial wealth so a first-period loss counts
    let mut curve = vec![0.0];
    curve.extend(cumulative_returns(returns)?);
    let max_drawdown = calculate_max_drawdown(&curve, DrawdownBasis::CumulativeReturn)?;
    let calmar_ratio = (max_drawdown > 0.0).then(|| stats.annualized_return / max_drawdown);

    let mut metrics = RiskMetrics {
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        calmar_ratio,
        beta: None,
        alpha: None,
        tracking_error: None,
        information_ratio: None,
    };

    if let Some(bench) = benchmark {
        if bench.len() != returns.len() {
            return Err(RiskError::InvalidArgument(format!(
                "benchmark has {} observations, returns have {}",
                bench.len(),
                returns.len()
            )));
        }
        ensure_min_len(bench, 2, "benchmark")?;

        let bench_annual = annualize_growth(1.0 + total_return(bench), bench.len(), ppy);
        let bench_var = stats::variance(bench);
        if bench_var > 0.0 {
            let beta = stats::covariance(returns, bench) / bench_var;
            metrics.beta = Some(beta);
            metrics.alpha = Some(
                stats.annualized_return - (risk_free_rate + beta * (bench_annual - risk_free_rate)),
            );
        }

        let active: Vec<f64> = returns.iter().zip(bench).map(|(r, b)| r - b).collect();
        let tracking_error = stats::std_dev(&active) * ppy.sqrt();
        metrics.tracking_error = Some(tracking_error);
        metrics.information_ratio = (tracking_error >= MIN_VOLATILITY)
            .then(|| (stats.annualized_return - bench_annual) / tracking_error);
    }

    Ok(metrics)
}
