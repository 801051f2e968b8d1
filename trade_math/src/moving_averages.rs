//! Moving average calculation implementations
//!
//! Contains streaming implementations of:
//! - Simple Moving Average (SMA)
//! - Exponential Moving Average (EMA), seeded with the SMA of its first window
//!
//! plus batch helpers that run them over a whole series.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidArgument(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period + 1),
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Get the current SMA value
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.values.iter().sum::<f64>() / self.period as f64)
    }

    /// Values currently inside the window, oldest first
    pub fn window(&self) -> &VecDeque<f64> {
        &self.values
    }
}

/// Exponential Moving Average (EMA) implementation
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    period: usize,
    multiplier: f64,
    seed: SimpleMovingAverage,
    current_ema: Option<f64>,
}

impl ExponentialMovingAverage {
    /// Create a new Exponential Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        let seed = SimpleMovingAverage::new(period)?;
        let multiplier = 2.0 / (period as f64 + 1.0);

        Ok(Self {
            period,
            multiplier,
            seed,
            current_ema: None,
        })
    }

    /// Update the EMA with a new value
    pub fn update(&mut self, value: f64) {
        match self.current_ema {
            None => {
                self.seed.update(value);
                if let Ok(initial) = self.seed.value() {
                    self.current_ema = Some(initial);
                }
            }
            Some(current) => {
                // EMA = (value - EMA(previous)) * multiplier + EMA(previous)
                self.current_ema = Some((value - current) * self.multiplier + current);
            }
        }
    }

    /// Get the current EMA value
    pub fn value(&self) -> Result<f64> {
        self.current_ema.ok_or_else(|| {
            MathError::InsufficientData(format!(
                "Not enough data for EMA calculation. Need at least {} values.",
                self.period
            ))
        })
    }
}

/// SMA over a whole series
///
/// Returns `n - window + 1` values, or an empty vector when the series is
/// shorter than the window.
pub fn sma_series(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    let mut out = Vec::with_capacity(values.len().saturating_sub(window) + 1);
    for &v in values {
        sma.update(v);
        if let Ok(avg) = sma.value() {
            out.push(avg);
        }
    }
    Ok(out)
}

/// EMA over a whole series, aligned like [`sma_series`]
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut ema = ExponentialMovingAverage::new(period)?;
    let mut out = Vec::with_capacity(values.len().saturating_sub(period) + 1);
    for &v in values {
        ema.update(v);
        if let Ok(current) = ema.value() {
            out.push(current);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_calculation() {
        let mut sma = SimpleMovingAverage::new(3).unwrap();

        // Not enough data yet
        assert!(sma.value().is_err());

        sma.update(2.0);
        sma.update(4.0);
        assert!(sma.value().is_err());

        sma.update(6.0);
        assert_eq!(sma.value().unwrap(), 4.0); // (2 + 4 + 6) / 3 = 4

        // The window slides, dropping the oldest value
        sma.update(8.0);
        assert_eq!(sma.value().unwrap(), 6.0); // (4 + 6 + 8) / 3 = 6
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let mut ema = ExponentialMovingAverage::new(3).unwrap();
        assert!(ema.value().is_err());

        ema.update(2.0);
        ema.update(4.0);
        ema.update(6.0);
        assert_eq!(ema.value().unwrap(), 4.0);

        // multiplier = 0.5 for period 3
        ema.update(8.0);
        assert_eq!(ema.value().unwrap(), 6.0);
    }

    #[test]
    fn test_series_lengths() {
        let prices: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        assert_eq!(sma_series(&prices, 3).unwrap().len(), 8);
        assert_eq!(ema_series(&prices, 4).unwrap().len(), 7);
        assert!(sma_series(&prices, 11).unwrap().is_empty());
        assert!(sma_series(&prices, 0).is_err());
    }
}
