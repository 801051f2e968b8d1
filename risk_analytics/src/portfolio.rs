//! Portfolio risk: weighted returns, covariance-based volatility, risk
//! decomposition, correlation and stress scenarios

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trade_math::series::ensure_finite;
use trade_math::{stats, Frequency};

use crate::error::{Result, RiskError};
use crate::returns::MIN_VOLATILITY;

/// One holding of a portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAsset {
    pub symbol: String,
    /// Weight used when the caller does not pass explicit weights
    pub weight: f64,
    /// Annualized stand-alone volatility, used for the diversification ratio
    pub volatility: f64,
    pub returns: Vec<f64>,
}

impl PortfolioAsset {
    /// Build an asset whose volatility is measured from its own returns
    pub fn from_returns(
        symbol: impl Into<String>,
        weight: f64,
        returns: Vec<f64>,
        frequency: Frequency,
    ) -> Self {
        let volatility = stats::std_dev(&returns) * frequency.periods_per_year().sqrt();
        Self {
            symbol: symbol.into(),
            weight,
            volatility,
            returns,
        }
    }
}

/// Headline portfolio figures, annualized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub expected_return: f64,
    pub volatility: f64,
    /// `None` when the portfolio has zero volatility
    pub sharpe_ratio: Option<f64>,
}

/// How much of the portfolio volatility one asset carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    pub symbol: String,
    pub weight: f64,
    /// `∂σ_p / ∂wᵢ`, annualized
    pub marginal: f64,
    /// `wᵢ · marginal`; these sum to the portfolio volatility
    pub component: f64,
    /// `component / σ_p`; these sum to one
    pub percent: f64,
}

/// Symmetric Pearson correlation matrix with a unit diagonal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    /// Look up a pair by symbol
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.get(i, j)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub metrics: PortfolioMetrics,
    /// `Σ wᵢ rᵢ,ₜ` per period
    pub portfolio_returns: Vec<f64>,
    pub correlation: CorrelationMatrix,
    pub risk_contributions: Vec<RiskContribution>,
    /// `Σ wᵢσᵢ / σ_p`; `None` when the portfolio has zero volatility
    pub diversification_ratio: Option<f64>,
    pub weights: Vec<f64>,
}

/// A set of per-symbol return shocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub shocks: BTreeMap<String, f64>,
    /// Shock applied to symbols the scenario does not name
    #[serde(default)]
    pub default_shock: f64,
}

impl StressScenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shocks: BTreeMap::new(),
            default_shock: 0.0,
        }
    }

    pub fn shock(mut self, symbol: impl Into<String>, shock: f64) -> Self {
        self.shocks.insert(symbol.into(), shock);
        self
    }

    pub fn with_default_shock(mut self, shock: f64) -> Self {
        self.default_shock = shock;
        self
    }

    fn shock_for(&self, symbol: &str) -> f64 {
        self.shocks.get(symbol).copied().unwrap_or(self.default_shock)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetImpact {
    pub symbol: String,
    pub shock: f64,
    /// `weight · shock`
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: String,
    pub portfolio_return: f64,
    pub asset_impacts: Vec<AssetImpact>,
}

fn validate_weights(assets: &[PortfolioAsset], weights: &[f64]) -> Result<()> {
    if weights.len() != assets.len() {
        return Err(RiskError::InvalidArgument(format!(
            "got {} weights for {} assets",
            weights.len(),
            assets.len()
        )));
    }
    ensure_finite(weights, "weights")?;
    Ok(())
}

/// Check that every asset carries a finite return series of one common length
fn validate_assets(assets: &[PortfolioAsset]) -> Result<usize> {
    let first = assets.first().ok_or_else(|| {
        RiskError::InvalidArgument("portfolio needs at least one asset".to_string())
    })?;
    let n = first.returns.len();
    if n < 2 {
        return Err(RiskError::InsufficientData(format!(
            "asset {} needs at least 2 returns, got {}",
            first.symbol, n
        )));
    }
    for asset in assets {
        if asset.returns.len() != n {
            return Err(RiskError::InvalidArgument(format!(
                "asset {} has {} returns, expected {}",
                asset.symbol,
                asset.returns.len(),
                n
            )));
        }
        ensure_finite(&asset.returns, &asset.symbol)?;
    }
    Ok(n)
}

/// Sample covariance matrix of the asset return series
fn covariance_matrix(assets: &[PortfolioAsset]) -> Vec<Vec<f64>> {
    let k = assets.len();
    let mut cov = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in i..k {
            let c = stats::covariance(&assets[i].returns, &assets[j].returns);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// Pairwise Pearson correlation of the assets' returns
///
/// The diagonal is set to exactly one. A pair involving a zero-variance asset
/// has no defined correlation and is reported as zero.
pub fn calculate_correlation_matrix(assets: &[PortfolioAsset]) -> Result<CorrelationMatrix> {
    validate_assets(assets)?;
    let k = assets.len();
    let mut values = vec![vec![0.0; k]; k];
    for i in 0..k {
        values[i][i] = 1.0;
        for j in (i + 1)..k {
            let rho = stats::correlation(&assets[i].returns, &assets[j].returns).unwrap_or(0.0);
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }
    Ok(CorrelationMatrix {
        symbols: assets.iter().map(|a| a.symbol.clone()).collect(),
        values,
    })
}

/// Analyze a weighted portfolio
///
/// Expected return is the mean portfolio return times periods per year;
/// volatility is `√(wᵀΣw)` annualized by `√periods_per_year`.
pub fn analyze_portfolio(
    assets: &[PortfolioAsset],
    weights: &[f64],
    frequency: Frequency,
    risk_free_rate: f64,
) -> Result<PortfolioAnalysis> {
    let n = validate_assets(assets)?;
    validate_weights(assets, weights)?;
    let ppy = frequency.periods_per_year();

    let portfolio_returns: Vec<f64> = (0..n)
        .map(|t| {
            assets
                .iter()
                .zip(weights)
                .map(|(asset, w)| w * asset.returns[t])
                .sum::<f64>()
        })
        .collect();

    let cov = covariance_matrix(assets);
    let sigma_w: Vec<f64> = cov
        .iter()
        .map(|row| row.iter().zip(weights).map(|(c, w)| c * w).sum::<f64>())
        .collect();
    let variance: f64 = weights.iter().zip(&sigma_w).map(|(w, s)| w * s).sum();
    let sigma = variance.max(0.0).sqrt();

    let expected_return = stats::mean(&portfolio_returns) * ppy;
    let volatility = sigma * ppy.sqrt();
    let degenerate = volatility < MIN_VOLATILITY;

    let risk_contributions = assets
        .iter()
        .zip(weights)
        .zip(&sigma_w)
        .map(|((asset, &weight), &sw)| {
            let marginal = if degenerate { 0.0 } else { sw / sigma * ppy.sqrt() };
            let component = weight * marginal;
            RiskContribution {
                symbol: asset.symbol.clone(),
                weight,
                marginal,
                component,
                percent: if degenerate { 0.0 } else { component / volatility },
            }
        })
        .collect();

    let weighted_vol: f64 = assets
        .iter()
        .zip(weights)
        .map(|(asset, w)| w * asset.volatility)
        .sum();

    Ok(PortfolioAnalysis {
        metrics: PortfolioMetrics {
            expected_return,
            volatility,
            sharpe_ratio: (!degenerate).then(|| (expected_return - risk_free_rate) / volatility),
        },
        portfolio_returns,
        correlation: calculate_correlation_matrix(assets)?,
        risk_contributions,
        diversification_ratio: (!degenerate).then(|| weighted_vol / volatility),
        weights: weights.to_vec(),
    })
}

/// Apply each scenario's shocks to the weighted holdings
pub fn stress_test_portfolio(
    assets: &[PortfolioAsset],
    weights: &[f64],
    scenarios: &[StressScenario],
) -> Result<Vec<StressResult>> {
    if assets.is_empty() {
        return Err(RiskError::InvalidArgument(
            "portfolio needs at least one asset".to_string(),
        ));
    }
    validate_weights(assets, weights)?;

    scenarios
        .iter()
        .map(|scenario| {
            let shocks: Vec<f64> = assets.iter().map(|a| scenario.shock_for(&a.symbol)).collect();
            ensure_finite(&shocks, &scenario.name)?;
            let asset_impacts: Vec<AssetImpact> = assets
                .iter()
                .zip(weights)
                .zip(shocks)
                .map(|((asset, w), shock)| AssetImpact {
                    symbol: asset.symbol.clone(),
                    shock,
                    contribution: w * shock,
                })
                .collect();
            Ok(StressResult {
                scenario: scenario.name.clone(),
                portfolio_return: asset_impacts.iter().map(|i| i.contribution).sum(),
                asset_impacts,
            })
        })
        .collect()
}
