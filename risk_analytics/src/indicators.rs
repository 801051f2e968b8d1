//! Technical indicators over whole price series
//!
//! Short input degrades to empty output rather than an error; bad window
//! parameters and non-finite prices are still rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trade_math::moving_averages::sma_series;
use trade_math::oscillators::{macd_series, rsi_series, MacdSeries};
use trade_math::series::ensure_finite;
use trade_math::volatility::{bollinger_series, BandSeries};

use crate::error::{Result, RiskError};

/// Window settings for [`calculate_indicators`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub moving_average_windows: Vec<usize>,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            moving_average_windows: vec![20, 50, 200],
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Every indicator over one price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Simple moving average per window
    pub moving_averages: BTreeMap<usize, Vec<f64>>,
    pub rsi: Vec<f64>,
    pub bollinger: BandSeries,
    pub macd: MacdSeries,
}

/// Simple moving average for each window, `n - window + 1` values each
pub fn calculate_moving_averages(
    prices: &[f64],
    windows: &[usize],
) -> Result<BTreeMap<usize, Vec<f64>>> {
    ensure_finite(prices, "prices")?;
    if windows.is_empty() {
        return Err(RiskError::InvalidArgument(
            "at least one moving-average window is required".to_string(),
        ));
    }
    windows
        .iter()
        .map(|&w| Ok((w, sma_series(prices, w)?)))
        .collect()
}

/// Wilder RSI in `[0, 100]`, empty when there are fewer than `period + 1` prices
pub fn calculate_rsi(prices: &[f64], period: usize) -> Result<Vec<f64>> {
    ensure_finite(prices, "prices")?;
    Ok(rsi_series(prices, period)?)
}

/// Bands at `middle ± k·σ` around a simple moving average
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, k: f64) -> Result<BandSeries> {
    ensure_finite(prices, "prices")?;
    Ok(bollinger_series(prices, period, k)?)
}

/// MACD line, signal line and histogram
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Result<MacdSeries> {
    ensure_finite(prices, "prices")?;
    Ok(macd_series(prices, fast, slow, signal)?)
}

/// Run every indicator with one parameter set
pub fn calculate_indicators(prices: &[f64], params: &IndicatorParams) -> Result<IndicatorSet> {
    Ok(IndicatorSet {
        moving_averages: calculate_moving_averages(prices, &params.moving_average_windows)?,
        rsi: calculate_rsi(prices, params.rsi_period)?,
        bollinger: calculate_bollinger_bands(prices, params.bollinger_period, params.bollinger_k)?,
        macd: calculate_macd(prices, params.macd_fast, params.macd_slow, params.macd_signal)?,
    })
}
