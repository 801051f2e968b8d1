//! Metrics for evaluating forecast performance

use serde::{Deserialize, Serialize};
use trade_math::series::ensure_finite;

use crate::error::{ForecastError, Result};

/// Pointwise error summary of predictions against actual values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent, over non-zero actuals
    pub mape: f64,
}

fn validate_pair(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(ForecastError::InvalidArgument(format!(
            "Actual ({}) and predicted ({}) values must have the same non-zero length",
            actual.len(),
            predicted.len()
        )));
    }
    ensure_finite(actual, "actual")?;
    ensure_finite(predicted, "predicted")?;
    Ok(())
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate_pair(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate_pair(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}

/// MAPE in percent
///
/// Periods with a zero actual value are skipped; when every actual is zero
/// the result is `0.0`.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate_pair(actual, predicted)?;
    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });
    if count == 0 {
        return Ok(0.0);
    }
    Ok(sum / count as f64 * 100.0)
}

/// All four metrics at once; every field is zero iff the series agree pointwise
pub fn calculate_forecast_accuracy(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    let mse = mean_squared_error(actual, predicted)?;
    Ok(AccuracyMetrics {
        mae: mean_absolute_error(actual, predicted)?,
        mse,
        rmse: mse.sqrt(),
        mape: mean_absolute_percentage_error(actual, predicted)?,
    })
}
