//! Descriptive statistics and distribution helpers
//!
//! All functions take plain slices. Validation of finiteness and minimum
//! length is the caller's job; on too-short input the moment functions
//! return `0.0` rather than `NaN`.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::{MathError, Result};

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance (denominator `n - 1`)
pub fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Population variance (denominator `n`)
pub fn population_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64
}

/// Sample standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Sample covariance of two equally long series
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Pearson correlation, or `None` when either series has zero variance
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    let (sa, sb) = (std_dev(&a[..n]), std_dev(&b[..n]));
    if sa <= f64::EPSILON || sb <= f64::EPSILON {
        return None;
    }
    Some((covariance(a, b) / (sa * sb)).clamp(-1.0, 1.0))
}

/// Sample skewness (moment estimator)
pub fn skewness(data: &[f64]) -> f64 {
    let var = population_variance(data);
    if data.len() < 3 || var <= 0.0 {
        return 0.0;
    }
    let m = mean(data);
    let m3 = data.iter().map(|x| (x - m).powi(3)).sum::<f64>() / data.len() as f64;
    m3 / var.powf(1.5)
}

/// Excess kurtosis (moment estimator, normal = 0)
pub fn excess_kurtosis(data: &[f64]) -> f64 {
    let var = population_variance(data);
    if data.len() < 4 || var <= 0.0 {
        return 0.0;
    }
    let m = mean(data);
    let m4 = data.iter().map(|x| (x - m).powi(4)).sum::<f64>() / data.len() as f64;
    m4 / (var * var) - 3.0
}

/// Autocorrelation at a single lag
///
/// Uses the full-sample mean and variance, so values shrink toward zero as
/// the lag approaches the series length.
pub fn autocorrelation(data: &[f64], lag: usize) -> f64 {
    let n = data.len();
    if lag == 0 {
        return 1.0;
    }
    if lag >= n {
        return 0.0;
    }
    let m = mean(data);
    let denom: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    if denom <= 0.0 {
        return 0.0;
    }
    let num: f64 = data[lag..]
        .iter()
        .zip(&data[..n - lag])
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    num / denom
}

/// Autocorrelation function for lags `0..=max_lag`
pub fn acf(data: &[f64], max_lag: usize) -> Vec<f64> {
    (0..=max_lag).map(|lag| autocorrelation(data, lag)).collect()
}

/// Empirical quantile of an ascending-sorted slice
///
/// Picks the order statistic at `floor(p * n)`, clamped to the last index.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let idx = ((p * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    Some(sorted[idx])
}

/// Sort a copy of the data ascending
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Standard normal quantile (inverse CDF)
pub fn normal_quantile(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::InvalidArgument(format!(
            "Probability must be in (0, 1), got {}",
            p
        )));
    }
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| MathError::NumericalDegeneracy(e.to_string()))?;
    Ok(normal.inverse_cdf(p))
}

/// Standard normal density
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Upper-tail probability of a chi-squared statistic
pub fn chi_squared_sf(statistic: f64, df: f64) -> f64 {
    match ChiSquared::new(df) {
        Ok(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Two-sided p-value of a Student-t statistic
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Upper-tail probability of an F statistic
pub fn f_sf(statistic: f64, df1: f64, df2: f64) -> f64 {
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
