//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! cache_timeout_secs = 300
//! precision = 4
//! forecast_horizon = 12
//! risk_free_rate = 0.02
//! frequency = "daily"
//! monte_carlo_simulations = 10000
//! seed = 42
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::series::Frequency;
use crate::{MathError, Result};

/// Settings shared by the calculator and the forecasting engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of cached results, in seconds
    pub cache_timeout_secs: u64,
    /// Decimal places used when rendering results
    pub precision: u32,
    /// Horizon used when a forecast call does not name one
    pub forecast_horizon: usize,
    /// Annual risk-free rate used when a call does not name one
    pub risk_free_rate: f64,
    /// Default sampling frequency of input series
    pub frequency: Frequency,
    /// Number of draws for Monte-Carlo VaR
    pub monte_carlo_simulations: usize,
    /// Seed for every randomized routine
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_timeout_secs: 300,
            precision: 4,
            forecast_horizon: 12,
            risk_free_rate: 0.02,
            frequency: Frequency::Daily,
            monte_carlo_simulations: 10_000,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| MathError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MathError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Reject settings no computation can work with
    pub fn validate(&self) -> Result<()> {
        if self.forecast_horizon == 0 {
            return Err(MathError::Config(
                "forecast_horizon must be at least 1".to_string(),
            ));
        }
        if self.monte_carlo_simulations == 0 {
            return Err(MathError::Config(
                "monte_carlo_simulations must be at least 1".to_string(),
            ));
        }
        if self.precision > 12 {
            return Err(MathError::Config(format!(
                "precision must be at most 12, got {}",
                self.precision
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(MathError::Config(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache time-to-live
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cache_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_toml_str("forecast_horizon = 6\nfrequency = \"monthly\"").unwrap();
        assert_eq!(config.forecast_horizon, 6);
        assert_eq!(config.frequency, Frequency::Monthly);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("forecast_horizon = 0"),
            Err(MathError::Config(_))
        ));
        assert!(EngineConfig::from_toml_str("precision = 20").is_err());
        assert!(EngineConfig::from_toml_str("frequency = \"hourly\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_timeout_secs = 5").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache_timeout(), Duration::from_secs(5));

        assert!(EngineConfig::from_file("/nonexistent/engine.toml").is_err());
    }
}
