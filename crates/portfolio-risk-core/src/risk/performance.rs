//! Annualization and Sharpe formulas shared by the metrics calculator, the
//! optimizer and the simulator.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::linalg::{quadratic_form, vec_dot};
use crate::returns::{CovarianceMatrix, MeanReturnVector};
use crate::types::Rate;

/// Volatilities at or below this are treated as zero.
pub const ZERO_VOLATILITY: f64 = 1e-12;

/// Sharpe ratio with the zero-volatility policy: no spread means no ratio (0).
pub fn sharpe_ratio(annual_return: Rate, annual_volatility: Rate, risk_free_rate: Rate) -> f64 {
    if !annual_volatility.is_finite() || annual_volatility <= ZERO_VOLATILITY {
        0.0
    } else {
        (annual_return - risk_free_rate) / annual_volatility
    }
}

pub fn annualize_return(daily_mean: f64, config: &EngineConfig) -> Rate {
    daily_mean * config.trading_days_per_year
}

pub fn annualize_volatility(daily_std: f64, config: &EngineConfig) -> Rate {
    daily_std * config.sqrt_annualization()
}

/// Expected annualized figures of a weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedPerformance {
    pub expected_return: Rate,
    pub expected_volatility: Rate,
    pub sharpe_ratio: f64,
}

/// w'mu * A, sqrt(w' Sigma w * A), and the Sharpe ratio of the two.
///
/// `weights` must be in the same ticker order as `mean` and `cov`.
pub fn expected_performance(
    weights: &[f64],
    mean: &MeanReturnVector,
    cov: &CovarianceMatrix,
    config: &EngineConfig,
) -> ExpectedPerformance {
    let expected_return = annualize_return(vec_dot(weights, &mean.values), config);
    let variance = quadratic_form(&cov.values, weights).max(0.0);
    let expected_volatility = annualize_volatility(variance.sqrt(), config);
    ExpectedPerformance {
        expected_return,
        expected_volatility,
        sharpe_ratio: sharpe_ratio(expected_return, expected_volatility, config.risk_free_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpe_zero_volatility_policy() {
        assert_eq!(sharpe_ratio(0.10, 0.0, 0.04), 0.0);
        assert_eq!(sharpe_ratio(0.10, 1e-15, 0.04), 0.0);
        assert!((sharpe_ratio(0.10, 0.20, 0.04) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_expected_performance_annualizes() {
        let cfg = EngineConfig::default();
        let tickers = vec!["A".to_string(), "B".to_string()];
        let mean = MeanReturnVector {
            tickers: tickers.clone(),
            values: vec![0.0004, 0.0002],
        };
        let cov = CovarianceMatrix {
            tickers,
            values: vec![vec![0.0001, 0.0], vec![0.0, 0.0001]],
        };
        let perf = expected_performance(&[1.0, 0.0], &mean, &cov, &cfg);
        assert!((perf.expected_return - 0.1008).abs() < 1e-12);
        assert!((perf.expected_volatility - (0.0001f64 * 252.0).sqrt()).abs() < 1e-12);
    }
}
