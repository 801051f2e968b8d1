//! Least-squares solves on a QR factorization
//!
//! Regression and ARIMA estimation both go through [`least_squares`], which
//! factors the design matrix instead of inverting `XᵀX` directly.

use nalgebra::{DMatrix, DVector};

use crate::{MathError, Result};

/// Relative threshold below which a diagonal entry of `R` counts as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Ordinary least-squares solution
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// Fitted values `Xβ`
    pub fitted: Vec<f64>,
    /// Residuals `y - Xβ`
    pub residuals: Vec<f64>,
    /// `(XᵀX)⁻¹`, computed as `R⁻¹R⁻ᵀ`
    pub xtx_inverse: DMatrix<f64>,
}

impl LeastSquares {
    /// Residual sum of squares
    pub fn rss(&self) -> f64 {
        self.residuals.iter().map(|e| e * e).sum()
    }
}

/// Build an `n x k` design matrix from `k` columns of length `n`
pub fn design_from_columns(columns: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n = columns.first().map(Vec::len).unwrap_or(0);
    if n == 0 {
        return Err(MathError::InvalidArgument(
            "Design matrix needs at least one non-empty column".to_string(),
        ));
    }
    if let Some(bad) = columns.iter().position(|c| c.len() != n) {
        return Err(MathError::InvalidArgument(format!(
            "Column {} has length {}, expected {}",
            bad,
            columns[bad].len(),
            n
        )));
    }
    Ok(DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]))
}

/// Build an `n x k` design matrix from `n` rows of length `k`
pub fn design_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidArgument(
            "Design matrix needs at least one non-empty row".to_string(),
        ));
    }
    if rows.iter().any(|r| r.len() != k) {
        return Err(MathError::InvalidArgument(
            "Design matrix rows must all have the same length".to_string(),
        ));
    }
    Ok(DMatrix::from_fn(rows.len(), k, |i, j| rows[i][j]))
}

/// Solve `min ||y - Xβ||²` through the thin QR factorization of `X`
///
/// Fails with `InsufficientData` when `X` has fewer rows than columns and
/// with `NumericalDegeneracy` when `X` is rank deficient.
pub fn least_squares(design: &DMatrix<f64>, y: &[f64]) -> Result<LeastSquares> {
    let (n, k) = design.shape();
    if y.len() != n {
        return Err(MathError::InvalidArgument(format!(
            "Response has length {}, design has {} rows",
            y.len(),
            n
        )));
    }
    if k == 0 || n < k {
        return Err(MathError::InsufficientData(format!(
            "Least squares with {} parameters needs at least {} observations, got {}",
            k, k, n
        )));
    }

    let qr = design.clone().qr();
    let q = qr.q();
    let r = qr.r();

    let max_diag = (0..k).map(|i| r[(i, i)].abs()).fold(0.0, f64::max);
    if max_diag == 0.0 || (0..k).any(|i| r[(i, i)].abs() <= RANK_TOLERANCE * max_diag) {
        return Err(MathError::NumericalDegeneracy(
            "Design matrix is rank deficient".to_string(),
        ));
    }

    let y_vec = DVector::from_column_slice(y);
    let qty = q.transpose() * &y_vec;
    let beta = r.solve_upper_triangular(&qty).ok_or_else(|| {
        MathError::NumericalDegeneracy("Triangular solve failed".to_string())
    })?;
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(k, k))
        .ok_or_else(|| MathError::NumericalDegeneracy("R is not invertible".to_string()))?;
    let xtx_inverse = &r_inv * r_inv.transpose();

    let fitted_vec = design * &beta;
    let fitted: Vec<f64> = fitted_vec.iter().copied().collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::NumericalDegeneracy(
            "Least-squares solution is not finite".to_string(),
        ));
    }

    Ok(LeastSquares {
        coefficients: beta.iter().copied().collect(),
        fitted,
        residuals,
        xtx_inverse,
    })
}
