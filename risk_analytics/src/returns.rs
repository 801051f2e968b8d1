//! Return statistics and volatility
//!
//! Returns are simple period returns (`0.01` is +1%). Compounding is
//! geometric throughout: total return is `∏(1 + rᵢ) − 1` and annualization
//! raises the growth factor to `periods_per_year / n`.

use std::fmt;

use serde::{Deserialize, Serialize};
use trade_math::series::{ensure_finite, ensure_min_len, round_to};
use trade_math::{stats, Frequency};

use crate::error::{Result, RiskError};

/// Volatility below this is treated as zero when dividing by it
pub const MIN_VOLATILITY: f64 = 1e-12;

/// Summary statistics of a return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    /// The period returns the statistics were computed from
    pub returns: Vec<f64>,
    /// Compounded return over the whole series
    pub total_return: f64,
    /// Compounded return scaled to one year
    pub annualized_return: f64,
    /// Annualized sample standard deviation of the returns
    pub volatility: f64,
    pub frequency: Frequency,
}

impl ReturnStats {
    /// Number of periods in the series
    pub fn periods(&self) -> usize {
        self.returns.len()
    }

    /// One-line rendering with values rounded to `precision` decimals
    pub fn summary(&self, precision: u32) -> String {
        format!(
            "periods={} total={} annualized={} volatility={} ({})",
            self.periods(),
            round_to(self.total_return, precision),
            round_to(self.annualized_return, precision),
            round_to(self.volatility, precision),
            self.frequency
        )
    }
}

impl fmt::Display for ReturnStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary(4))
    }
}

/// Reject non-finite returns and returns below -100%
pub(crate) fn validate_returns(returns: &[f64], name: &str) -> Result<()> {
    ensure_finite(returns, name)?;
    if let Some(idx) = returns.iter().position(|&r| r < -1.0) {
        return Err(RiskError::InvalidArgument(format!(
            "{} has a return below -100% at index {}",
            name, idx
        )));
    }
    Ok(())
}

/// Annualize a growth factor observed over `periods` periods
pub(crate) fn annualize_growth(growth: f64, periods: usize, periods_per_year: f64) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if growth <= 0.0 {
        // Wiped out; the annual figure is a total loss as well
        return -1.0;
    }
    growth.powf(periods_per_year / periods as f64) - 1.0
}

/// Compounded return of a series
pub(crate) fn total_return(returns: &[f64]) -> f64 {
    returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
}

/// Compute [`ReturnStats`] from a series of period returns
///
/// Needs at least two observations. Zero returns are valid flat periods.
pub fn calculate_returns(returns: &[f64], frequency: Frequency) -> Result<ReturnStats> {
    ensure_min_len(returns, 2, "returns")?;
    validate_returns(returns, "returns")?;

    let ppy = frequency.periods_per_year();
    let total = total_return(returns);

    Ok(ReturnStats {
        returns: returns.to_vec(),
        total_return: total,
        annualized_return: annualize_growth(1.0 + total, returns.len(), ppy),
        volatility: stats::std_dev(returns) * ppy.sqrt(),
        frequency,
    })
}

/// Simple period returns `pᵢ / pᵢ₋₁ − 1` of a price series
pub fn simple_returns(prices: &[f64]) -> Result<Vec<f64>> {
    ensure_finite(prices, "prices")?;
    if let Some(idx) = prices.iter().position(|&p| p <= 0.0) {
        return Err(RiskError::InvalidArgument(format!(
            "prices must be positive, got {} at index {}",
            prices[idx], idx
        )));
    }
    Ok(prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

/// Convert prices to returns, then compute [`ReturnStats`]
///
/// Needs at least three prices so that two returns exist.
pub fn calculate_returns_from_prices(prices: &[f64], frequency: Frequency) -> Result<ReturnStats> {
    ensure_min_len(prices, 3, "prices")?;
    calculate_returns(&simple_returns(prices)?, frequency)
}

/// Sample standard deviation of returns, annualized when a frequency is given
///
/// An empty series has zero volatility, as does a single observation.
pub fn calculate_volatility(returns: &[f64], annualize: Option<Frequency>) -> Result<f64> {
    if returns.is_empty() {
        return Ok(0.0);
    }
    ensure_finite(returns, "returns")?;
    let sd = stats::std_dev(returns);
    Ok(match annualize {
        Some(frequency) => sd * frequency.periods_per_year().sqrt(),
        None => sd,
    })
}

/// Compounded wealth curve minus one: `cᵢ = ∏ⱼ≤ᵢ (1 + rⱼ) − 1`
pub fn cumulative_returns(returns: &[f64]) -> Result<Vec<f64>> {
    validate_returns(returns, "returns")?;
    let mut wealth = 1.0;
    Ok(returns
        .iter()
        .map(|r| {
            wealth *= 1.0 + r;
            wealth - 1.0
        })
        .collect())
}

/// Rolling (non-annualized) sample volatility over a trailing window
///
/// Produces `n - window + 1` values, empty when the series is shorter than
/// the window.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Result<Vec<f64>> {
    if window < 2 {
        return Err(RiskError::InvalidArgument(format!(
            "rolling volatility window must be at least 2, got {}",
            window
        )));
    }
    ensure_finite(returns, "returns")?;
    Ok(returns.windows(window).map(stats::std_dev).collect())
}

/// Exponentially weighted (RiskMetrics-style) volatility path
///
/// `σ²ₜ = λσ²ₜ₋₁ + (1 − λ)r²ₜ₋₁`, seeded with the sample variance of the
/// series. Returns one value per observation.
pub fn ewma_volatility(returns: &[f64], lambda: f64) -> Result<Vec<f64>> {
    if !(lambda > 0.0 && lambda < 1.0) {
        return Err(RiskError::InvalidArgument(format!(
            "EWMA decay must lie in (0, 1), got {}",
            lambda
        )));
    }
    ensure_min_len(returns, 2, "returns")?;

    let mut variance = stats::variance(returns);
    let mut path = Vec::with_capacity(returns.len());
    path.push(variance.sqrt());
    for r in &returns[..returns.len() - 1] {
        variance = lambda * variance + (1.0 - lambda) * r * r;
        path.push(variance.sqrt());
    }
    Ok(path)
}
