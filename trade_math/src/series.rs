//! Series validation and sampling frequency

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequency of a series, used to annualize statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    /// Number of periods in one year
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 252.0,
            Frequency::Weekly => 52.0,
            Frequency::Monthly => 12.0,
            Frequency::Quarterly => 4.0,
            Frequency::Annual => 1.0,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        };
        f.write_str(name)
    }
}

/// Reject series containing NaN or infinite observations
pub fn ensure_finite(series: &[f64], name: &str) -> Result<()> {
    match series.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(MathError::InvalidArgument(format!(
            "{} contains a non-finite value at index {}",
            name, idx
        ))),
        None => Ok(()),
    }
}

/// Reject series shorter than `min_len` or containing non-finite values
pub fn ensure_min_len(series: &[f64], min_len: usize, name: &str) -> Result<()> {
    if series.len() < min_len {
        return Err(MathError::InsufficientData(format!(
            "{} needs at least {} observations, got {}",
            name,
            min_len,
            series.len()
        )));
    }
    ensure_finite(series, name)
}

/// Validate a row-major matrix: non-empty, rectangular, finite
///
/// Returns the number of columns.
pub fn ensure_rectangular(rows: &[Vec<f64>], name: &str) -> Result<usize> {
    let width = match rows.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => {
            return Err(MathError::InvalidArgument(format!(
                "{} must have at least one row and one column",
                name
            )))
        }
    };

    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(MathError::InvalidArgument(format!(
                "{} row {} has {} columns, expected {}",
                name,
                i,
                row.len(),
                width
            )));
        }
        ensure_finite(row, name)?;
    }

    Ok(width)
}

/// Round a value to a number of decimal places, for rendering
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Frequency::Daily.periods_per_year(), 252.0);
        assert_eq!(Frequency::Monthly.periods_per_year(), 12.0);
        assert_eq!(Frequency::default(), Frequency::Daily);
    }

    #[test]
    fn test_ensure_finite_rejects_nan() {
        let err = ensure_finite(&[1.0, f64::NAN], "prices").unwrap_err();
        assert!(matches!(err, MathError::InvalidArgument(_)));
        assert!(ensure_finite(&[0.0, -1.0], "returns").is_ok());
    }

    #[test]
    fn test_ensure_rectangular() {
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(ensure_rectangular(&ragged, "features").is_err());
        assert!(ensure_rectangular(&[], "features").is_err());

        let ok = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(ensure_rectangular(&ok, "features").unwrap(), 2);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.005, 0), -0.0);
    }
}
