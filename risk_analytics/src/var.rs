//! Value-at-Risk estimators
//!
//! VaR is reported as a return threshold: a 95% VaR of `-0.03` means a loss
//! worse than 3% is expected in 5% of periods. Higher confidence therefore
//! gives a lower (more negative) number, and the expected shortfall, the mean
//! of the tail beyond the threshold, never exceeds the VaR.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use trade_math::series::ensure_min_len;
use trade_math::stats;
use tracing::debug;

use crate::error::{Result, RiskError};

/// Fewest observations any estimator accepts
pub const MIN_VAR_OBSERVATIONS: usize = 3;

/// Estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarMethod {
    /// Empirical quantile of the observed returns
    Historical,
    /// Normal quantile from the sample mean and standard deviation
    Parametric,
    /// Empirical quantile of normal draws with the sample moments
    MonteCarlo,
}

impl std::fmt::Display for VarMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::MonteCarlo => "monte-carlo",
        })
    }
}

/// Monte-Carlo settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulation {
    pub draws: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarResult {
    pub method: VarMethod,
    /// The confidence level `var` and `expected_shortfall` refer to
    pub confidence_level: f64,
    pub var: f64,
    pub var95: f64,
    pub var99: f64,
    /// Mean return in the tail at or beyond `var`
    pub expected_shortfall: f64,
    pub observations: usize,
}

/// Quantile threshold and tail mean of one distribution at one confidence
trait TailEstimator {
    fn var(&self, confidence: f64) -> Result<f64>;
    fn expected_shortfall(&self, confidence: f64) -> Result<f64>;
}

/// Tail statistics of an ascending-sorted sample
struct Empirical {
    sorted: Vec<f64>,
}

impl Empirical {
    fn index(&self, confidence: f64) -> usize {
        let n = self.sorted.len();
        (((1.0 - confidence) * n as f64).floor() as usize).min(n - 1)
    }
}

impl TailEstimator for Empirical {
    fn var(&self, confidence: f64) -> Result<f64> {
        Ok(self.sorted[self.index(confidence)])
    }

    fn expected_shortfall(&self, confidence: f64) -> Result<f64> {
        Ok(stats::mean(&self.sorted[..=self.index(confidence)]))
    }
}

/// Closed-form normal tail
struct Gaussian {
    mean: f64,
    std_dev: f64,
}

impl TailEstimator for Gaussian {
    fn var(&self, confidence: f64) -> Result<f64> {
        Ok(self.mean + stats::normal_quantile(1.0 - confidence)? * self.std_dev)
    }

    fn expected_shortfall(&self, confidence: f64) -> Result<f64> {
        let z = stats::normal_quantile(1.0 - confidence)?;
        Ok(self.mean - self.std_dev * stats::normal_pdf(z) / (1.0 - confidence))
    }
}

fn validate_confidence(confidence: f64) -> Result<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RiskError::InvalidArgument(format!(
            "confidence level must lie in (0, 1), got {}",
            confidence
        )));
    }
    Ok(())
}

fn simulate(mean: f64, std_dev: f64, simulation: Simulation) -> Result<Vec<f64>> {
    if simulation.draws == 0 {
        return Err(RiskError::InvalidArgument(
            "Monte-Carlo VaR needs at least one draw".to_string(),
        ));
    }
    let normal = Normal::new(mean, std_dev)
        .map_err(|e| RiskError::NumericalDegeneracy(format!("return distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(simulation.seed);
    debug!(draws = simulation.draws, seed = simulation.seed, "simulating returns");
    Ok((0..simulation.draws).map(|_| normal.sample(&mut rng)).collect())
}

/// Estimate VaR and expected shortfall at `confidence`, plus the 95% and 99%
/// thresholds
pub fn calculate_var(
    returns: &[f64],
    confidence: f64,
    method: VarMethod,
    simulation: Simulation,
) -> Result<VarResult> {
    validate_confidence(confidence)?;
    ensure_min_len(returns, MIN_VAR_OBSERVATIONS, "returns")?;

    let estimator: Box<dyn TailEstimator> = match method {
        VarMethod::Historical => Box::new(Empirical {
            sorted: stats::sorted(returns),
        }),
        VarMethod::Parametric => Box::new(Gaussian {
            mean: stats::mean(returns),
            std_dev: stats::std_dev(returns),
        }),
        VarMethod::MonteCarlo => {
            let draws = simulate(stats::mean(returns), stats::std_dev(returns), simulation)?;
            Box::new(Empirical {
                sorted: stats::sorted(&draws),
            })
        }
    };

    Ok(VarResult {
        method,
        confidence_level: confidence,
        var: estimator.var(confidence)?,
        var95: estimator.var(0.95)?,
        var99: estimator.var(0.99)?,
        expected_shortfall: estimator.expected_shortfall(confidence)?,
        observations: returns.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empirical_index_floor() {
        let e = Empirical {
            sorted: (0..100).map(f64::from).collect(),
        };
        assert_eq!(e.index(0.95), 5);
        assert_eq!(e.index(0.99), 1);
        // Never past the end
        assert_eq!(e.index(1e-9), 99);
    }

    #[test]
    fn test_gaussian_shortfall_beyond_var() {
        let g = Gaussian {
            mean: 0.0,
            std_dev: 1.0,
        };
        let var = g.var(0.95).unwrap();
        assert!((var + 1.6448536).abs() < 1e-6);
        assert!(g.expected_shortfall(0.95).unwrap() < var);
    }
}
