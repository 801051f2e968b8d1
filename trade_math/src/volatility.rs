//! Volatility indicator implementations
//!
//! Contains implementations of:
//! - Bollinger Bands
//! - Rolling (population) standard deviation

use crate::moving_averages::SimpleMovingAverage;
use crate::stats;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Rolling population standard deviation
#[derive(Debug, Clone)]
pub struct StandardDeviation {
    window: SimpleMovingAverage,
}

impl StandardDeviation {
    pub fn new(period: usize) -> Result<Self> {
        Ok(Self {
            window: SimpleMovingAverage::new(period)?,
        })
    }

    pub fn update(&mut self, value: f64) {
        self.window.update(value);
    }

    /// Mean of the current window
    pub fn mean(&self) -> Result<f64> {
        self.window.value()
    }

    /// Standard deviation of the current window, once it is full
    pub fn value(&self) -> Result<f64> {
        self.window.value()?;
        let values: Vec<f64> = self.window.window().iter().copied().collect();
        Ok(stats::population_variance(&values).sqrt())
    }
}

/// Bands at `k` rolling standard deviations around a simple moving average
#[derive(Debug, Clone)]
pub struct BollingerBands {
    k: f64,
    deviation: StandardDeviation,
}

impl BollingerBands {
    pub fn new(period: usize, k: f64) -> Result<Self> {
        if !(k.is_finite() && k > 0.0) {
            return Err(MathError::InvalidArgument(format!(
                "band width multiplier must be positive, got {}",
                k
            )));
        }
        Ok(Self {
            k,
            deviation: StandardDeviation::new(period)?,
        })
    }

    pub fn update(&mut self, price: f64) {
        self.deviation.update(price);
    }

    /// Simple moving average of the window
    pub fn middle_band(&self) -> Result<f64> {
        self.deviation.mean()
    }

    pub fn upper_band(&self) -> Result<f64> {
        Ok(self.middle_band()? + self.k * self.deviation.value()?)
    }

    pub fn lower_band(&self) -> Result<f64> {
        Ok(self.middle_band()? - self.k * self.deviation.value()?)
    }
}

/// Upper, middle and lower bands over a whole series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Run Bollinger Bands over a whole series (`n - period + 1` points each)
pub fn bollinger_series(prices: &[f64], period: usize, k: f64) -> Result<BandSeries> {
    let mut bb = BollingerBands::new(period, k)?;
    let mut out = BandSeries::default();
    for &p in prices {
        bb.update(p);
        if let (Ok(upper), Ok(middle), Ok(lower)) =
            (bb.upper_band(), bb.middle_band(), bb.lower_band())
        {
            out.upper.push(upper);
            out.middle.push(middle);
            out.lower.push(lower);
        }
    }
    Ok(out)
}
