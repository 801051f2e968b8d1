//! Oscillator indicator implementations
//!
//! Contains implementations of:
//! - Relative Strength Index (RSI), Wilder smoothing
//! - Moving Average Convergence Divergence (MACD)

use crate::moving_averages::ExponentialMovingAverage;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Relative Strength Index (RSI) implementation
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    period: usize,
    previous_price: Option<f64>,
    warmup_gain: f64,
    warmup_loss: f64,
    changes_seen: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl RelativeStrengthIndex {
    /// Create a new RSI with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidArgument(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            previous_price: None,
            warmup_gain: 0.0,
            warmup_loss: 0.0,
            changes_seen: 0,
            avg_gain: None,
            avg_loss: None,
        })
    }

    /// Update the RSI with a new price value
    pub fn update(&mut self, price: f64) {
        if let Some(prev_price) = self.previous_price {
            let change = price - prev_price;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            self.changes_seen += 1;

            match (self.avg_gain, self.avg_loss) {
                (Some(avg_gain), Some(avg_loss)) => {
                    // new_avg = (prev_avg * (period - 1) + current) / period
                    let p = self.period as f64;
                    self.avg_gain = Some((avg_gain * (p - 1.0) + gain) / p);
                    self.avg_loss = Some((avg_loss * (p - 1.0) + loss) / p);
                }
                _ => {
                    self.warmup_gain += gain;
                    self.warmup_loss += loss;
                    if self.changes_seen == self.period {
                        self.avg_gain = Some(self.warmup_gain / self.period as f64);
                        self.avg_loss = Some(self.warmup_loss / self.period as f64);
                    }
                }
            }
        }

        self.previous_price = Some(price);
    }

    /// Get the current RSI value (0-100)
    pub fn value(&self) -> Result<f64> {
        match (self.avg_gain, self.avg_loss) {
            (Some(avg_gain), Some(avg_loss)) => {
                if avg_loss == 0.0 {
                    // Flat window is neutral, otherwise no losses means 100
                    return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
                }
                let rs = avg_gain / avg_loss;
                Ok((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
            }
            _ => Err(MathError::InsufficientData(format!(
                "Not enough data for RSI calculation. Need {} values, have {}.",
                self.period + 1,
                self.changes_seen + usize::from(self.previous_price.is_some())
            ))),
        }
    }
}

/// Moving Average Convergence Divergence (MACD) implementation
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: ExponentialMovingAverage,
    slow_ema: ExponentialMovingAverage,
    signal_ema: ExponentialMovingAverage,
}

impl Macd {
    /// Create a new MACD with the specified parameters
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Result<Self> {
        if fast_period == 0 || signal_period == 0 {
            return Err(MathError::InvalidArgument(
                "MACD periods must be greater than zero".to_string(),
            ));
        }
        if fast_period >= slow_period {
            return Err(MathError::InvalidArgument(
                "Fast period must be smaller than slow period".to_string(),
            ));
        }

        Ok(Self {
            fast_ema: ExponentialMovingAverage::new(fast_period)?,
            slow_ema: ExponentialMovingAverage::new(slow_period)?,
            signal_ema: ExponentialMovingAverage::new(signal_period)?,
        })
    }

    /// Update the MACD with a new price value
    pub fn update(&mut self, price: f64) {
        self.fast_ema.update(price);
        self.slow_ema.update(price);

        if let Ok(macd_value) = self.macd_value() {
            self.signal_ema.update(macd_value);
        }
    }

    /// Get the current MACD line value (fast EMA - slow EMA)
    pub fn macd_value(&self) -> Result<f64> {
        match (self.fast_ema.value(), self.slow_ema.value()) {
            (Ok(fast), Ok(slow)) => Ok(fast - slow),
            _ => Err(MathError::InsufficientData(
                "Not enough data to calculate MACD line".to_string(),
            )),
        }
    }

    /// Get the current signal line value (EMA of MACD)
    pub fn signal_value(&self) -> Result<f64> {
        self.signal_ema.value().map_err(|_| {
            MathError::InsufficientData("Not enough data to calculate signal line".to_string())
        })
    }

    /// Get the current histogram value (MACD line - signal line)
    pub fn histogram(&self) -> Result<f64> {
        Ok(self.macd_value()? - self.signal_value()?)
    }
}

/// RSI over a whole series
///
/// Produces `n - period` values; empty when the series has fewer than
/// `period + 1` prices.
pub fn rsi_series(prices: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut rsi = RelativeStrengthIndex::new(period)?;
    let mut out = Vec::with_capacity(prices.len().saturating_sub(period));
    for &p in prices {
        rsi.update(p);
        if let Ok(v) = rsi.value() {
            out.push(v);
        }
    }
    Ok(out)
}

/// MACD line, signal line and histogram over a whole series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    /// `n - slow + 1` values
    pub macd: Vec<f64>,
    /// `macd.len() - signal + 1` values
    pub signal: Vec<f64>,
    /// Aligned with `signal`
    pub histogram: Vec<f64>,
}

/// Run MACD over a whole series
pub fn macd_series(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Result<MacdSeries> {
    let mut macd = Macd::new(fast, slow, signal)?;
    let mut out = MacdSeries::default();
    for &p in prices {
        macd.update(p);
        if let Ok(line) = macd.macd_value() {
            out.macd.push(line);
        }
        if let (Ok(sig), Ok(hist)) = (macd.signal_value(), macd.histogram()) {
            out.signal.push(sig);
            out.histogram.push(hist);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        let mut rsi = RelativeStrengthIndex::new(3).unwrap();

        rsi.update(10.0);
        rsi.update(10.5);
        rsi.update(11.0);
        assert!(rsi.value().is_err());
        rsi.update(10.5);

        // gains 0.5, 0.5, 0 / losses 0, 0, 0.5 -> RS = 2
        let rsi_value = rsi.value().unwrap();
        assert!((rsi_value - 100.0 * 2.0 / 3.0).abs() < 1e-9);

        // Downtrend should produce a lower RSI
        rsi.update(10.0);
        assert!(rsi.value().unwrap() < rsi_value);
    }

    #[test]
    fn test_rsi_series_bounds_and_length() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let values = rsi_series(&prices, 14).unwrap();
        assert_eq!(values.len(), 40 - 14);
        assert!(values.iter().all(|v| (0.0..=100.0).contains(v)));

        assert!(rsi_series(&prices[..14], 14).unwrap().is_empty());
    }

    #[test]
    fn test_macd_calculation() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 2.0).collect();
        let out = macd_series(&prices, 3, 6, 2).unwrap();

        assert_eq!(out.macd.len(), 20 - 6 + 1);
        assert_eq!(out.signal.len(), out.macd.len() - 1);
        assert_eq!(out.histogram.len(), out.signal.len());

        // Uptrend keeps the fast EMA above the slow EMA
        assert!(out.macd.iter().all(|&m| m > 0.0));
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 26, 0).is_err());
    }
}
