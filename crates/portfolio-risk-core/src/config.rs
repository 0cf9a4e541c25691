use serde::{Deserialize, Serialize};

use crate::error::PortfolioRiskError;
use crate::types::Rate;
use crate::PortfolioRiskResult;

/// Smallest accepted solver tolerance.
pub const MIN_TOLERANCE: f64 = 1e-14;

/// Engine-wide parameters, passed by reference into every operation.
///
/// The annualization factor lives here and only here so the builder, the
/// metrics calculator, the optimizer and the simulator always scale daily
/// statistics the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trading days per year used to annualize daily statistics.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: f64,
    /// Annual risk-free rate for Sharpe ratios.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Rate,
    /// Confidence level for historical VaR (e.g. 0.95).
    #[serde(default = "default_var_confidence")]
    pub var_confidence: f64,
    /// Minimum aligned return observations before any statistic is computed.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    /// Below this many observations results carry a stability warning.
    #[serde(default = "default_recommended_observations")]
    pub recommended_observations: usize,
    /// Solver iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Solver objective tolerance.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_trading_days() -> f64 {
    252.0
}

fn default_risk_free_rate() -> Rate {
    0.04
}

fn default_var_confidence() -> f64 {
    0.95
}

fn default_min_observations() -> usize {
    2
}

fn default_recommended_observations() -> usize {
    20
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: default_trading_days(),
            risk_free_rate: default_risk_free_rate(),
            var_confidence: default_var_confidence(),
            min_observations: default_min_observations(),
            recommended_observations: default_recommended_observations(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> PortfolioRiskResult<()> {
        if !self.trading_days_per_year.is_finite() || self.trading_days_per_year <= 0.0 {
            return Err(PortfolioRiskError::invalid(
                "config.trading_days_per_year",
                "Must be positive",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(PortfolioRiskError::invalid(
                "config.risk_free_rate",
                "Must be finite",
            ));
        }
        validate_confidence("config.var_confidence", self.var_confidence)?;
        if self.min_observations < 2 {
            return Err(PortfolioRiskError::invalid(
                "config.min_observations",
                "At least 2 return observations are needed for a sample covariance",
            ));
        }
        if self.max_iterations == 0 {
            return Err(PortfolioRiskError::invalid(
                "config.max_iterations",
                "Must be at least 1",
            ));
        }
        if !(self.tolerance >= MIN_TOLERANCE && self.tolerance < 1.0) {
            return Err(PortfolioRiskError::invalid(
                "config.tolerance",
                format!("Must be at least {MIN_TOLERANCE:e} and below 1"),
            ));
        }
        Ok(())
    }

    /// sqrt of the annualization factor, for volatilities.
    pub fn sqrt_annualization(&self) -> f64 {
        self.trading_days_per_year.sqrt()
    }
}

/// Confidence levels are fractions strictly between 0 and 1.
pub(crate) fn validate_confidence(field: &str, c: f64) -> PortfolioRiskResult<()> {
    if !(c > 0.0 && c < 1.0) {
        return Err(PortfolioRiskError::invalid(
            field,
            format!("Confidence level must be between 0 and 1 (exclusive), got {c}"),
        ));
    }
    Ok(())
}
