//! Forecast engine tunables, optionally loaded from a JSON file

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ml::ForecastError;

/// Tunable constants of the forecast engine.
///
/// Every field has a default, so a config file only needs the values it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Holt level smoothing constant, in (0, 1)
    pub holt_alpha: f64,
    /// Holt trend smoothing constant, in (0, 1)
    pub holt_beta: f64,
    /// `SSE / (n · variance)` above which the strength line counts as a poor fit
    pub poor_fit_ratio: f64,
    /// Lowest σ a band may have, in series units
    pub min_sigma: f64,
    /// Plan-mode volatility looks back this many smoothing windows
    pub volatility_windows: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            holt_alpha: 0.3,
            holt_beta: 0.1,
            poor_fit_ratio: 0.5,
            min_sigma: 0.5,
            volatility_windows: 4,
        }
    }
}

impl ForecastConfig {
    /// Read a JSON config file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        for (name, value) in [("holt_alpha", self.holt_alpha), ("holt_beta", self.holt_beta)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ForecastError::invalid(
                    name,
                    format!("must be in (0, 1), got {}", value),
                ));
            }
        }
        if !(self.poor_fit_ratio > 0.0) {
            return Err(ForecastError::invalid("poor_fit_ratio", "must be positive"));
        }
        if !(self.min_sigma > 0.0) {
            return Err(ForecastError::invalid("min_sigma", "must be positive"));
        }
        if self.volatility_windows == 0 {
            return Err(ForecastError::invalid("volatility_windows", "must be at least 1"));
        }
        Ok(())
    }
}
