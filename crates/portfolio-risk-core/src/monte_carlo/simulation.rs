use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;
use tracing::{debug, warn};

use super::decomposition::{decompose, CovarianceFactor, SimulationMethod};
use crate::config::{validate_confidence, EngineConfig};
use crate::error::PortfolioRiskError;
use crate::linalg::{lower_transpose_vec, quadratic_form, vec_dot};
use crate::returns::matrix::validate_pair;
use crate::returns::{CovarianceMatrix, MeanReturnVector};
use crate::stats;
use crate::types::{with_metadata, ComputationOutput, Horizon, Rate, WeightVector};
use crate::PortfolioRiskResult;

pub const MIN_SIMULATIONS: u32 = 100;
pub const MAX_SIMULATIONS: u32 = 1_000_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Simulation controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Number of simulated portfolio returns (100..=1,000,000).
    #[serde(default = "default_n_simulations")]
    pub n_simulations: u32,
    /// Two-sided confidence level of the reported interval.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub horizon: Horizon,
}

fn default_n_simulations() -> u32 {
    10_000
}

fn default_confidence_level() -> f64 {
    0.95
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
            confidence_level: default_confidence_level(),
            seed: None,
            horizon: Horizon::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: Rate,
    pub upper: Rate,
}

/// Distribution of simulated horizon portfolio returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub method: SimulationMethod,
    pub n_simulations: u32,
    pub horizon: Horizon,
    pub horizon_years: f64,
    /// Analytic horizon mean `w'mu * A * h`.
    pub expected_return: Rate,
    /// Analytic horizon volatility `sqrt(w' Sigma w * A * h)`.
    pub expected_volatility: Rate,
    pub mean_return: Rate,
    pub median_return: Rate,
    pub std_dev: f64,
    pub confidence_interval: ConfidenceInterval,
    /// Fraction of draws below zero.
    pub probability_of_loss: f64,
    pub skewness: f64,
    /// Raw fourth standardized moment (normal = 3).
    pub kurtosis: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate horizon portfolio returns for `weights`.
///
/// Daily moments are scaled to the horizon (`mu * A * h`, `Sigma * A * h`).
/// When the scaled covariance has a Cholesky factor `L`, each draw is
/// `w'mu + (L'w) . z` for a standard-normal vector `z`; otherwise draws come
/// from `N(w'mu, w' Sigma w)` and the result is labelled
/// `independent-fallback`.
pub fn simulate(
    mean: &MeanReturnVector,
    cov: &CovarianceMatrix,
    weights: &WeightVector,
    params: &SimulationParams,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<MonteCarloResult>> {
    let start = Instant::now();
    config.validate()?;
    validate_pair(mean, cov)?;
    validate_params(params)?;
    let mut warnings: Vec<String> = Vec::new();

    let w = weights.aligned_to(&cov.tickers)?;
    let scale = config.trading_days_per_year * params.horizon.years();
    let horizon_mean: Vec<f64> = mean.values.iter().map(|m| m * scale).collect();
    let horizon_cov: Vec<Vec<f64>> = cov
        .values
        .iter()
        .map(|row| row.iter().map(|v| v * scale).collect())
        .collect();

    let portfolio_mean = vec_dot(&w, &horizon_mean);
    let portfolio_vol = quadratic_form(&horizon_cov, &w).max(0.0).sqrt();

    let factor = decompose(&horizon_cov, &cov.tickers);
    if let CovarianceFactor::IndependentFallback { reason } = &factor {
        warn!(%reason, "falling back to independent portfolio-level sampling");
        warnings.push(format!(
            "{reason}; sampled portfolio returns independently from N(mean, volatility)"
        ));
    }

    let draws = sample_portfolio_returns(
        &factor,
        &w,
        portfolio_mean,
        portfolio_vol,
        params.n_simulations as usize,
        params.seed,
    )?;
    let result = summarize(&draws, &factor, portfolio_mean, portfolio_vol, params);

    debug!(
        method = %result.method,
        n = params.n_simulations,
        mean = result.mean_return,
        "simulation complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Correlated Monte Carlo Simulation of Portfolio Returns (Cholesky Decomposition)",
        &serde_json::json!({
            "n_simulations": params.n_simulations,
            "confidence_level": params.confidence_level,
            "seed": params.seed,
            "horizon": params.horizon.label(),
            "horizon_years": params.horizon.years(),
            "trading_days_per_year": config.trading_days_per_year,
            "distribution": "multivariate normal",
            "method": factor.method().to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Draw `n` portfolio returns. The Cholesky path folds the weights into one
/// loading vector so each draw is a single dot product over a reused buffer.
pub(crate) fn sample_portfolio_returns(
    factor: &CovarianceFactor,
    weights: &[f64],
    portfolio_mean: f64,
    portfolio_vol: f64,
    n: usize,
    seed: Option<u64>,
) -> PortfolioRiskResult<Vec<f64>> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let normal = Normal::new(0.0, 1.0).map_err(|e| {
        PortfolioRiskError::invalid("distribution", format!("Invalid Normal parameters: {e}"))
    })?;

    let mut draws = Vec::with_capacity(n);
    match factor {
        CovarianceFactor::Decomposition { factor } => {
            let loadings = lower_transpose_vec(factor, weights);
            let mut z = vec![0.0; loadings.len()];
            for _ in 0..n {
                for zi in z.iter_mut() {
                    *zi = rng.sample(normal);
                }
                draws.push(portfolio_mean + vec_dot(&loadings, &z));
            }
        }
        CovarianceFactor::IndependentFallback { .. } => {
            for _ in 0..n {
                let z: f64 = rng.sample(normal);
                draws.push(portfolio_mean + portfolio_vol * z);
            }
        }
    }
    Ok(draws)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &SimulationParams) -> PortfolioRiskResult<()> {
    if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&params.n_simulations) {
        return Err(PortfolioRiskError::invalid(
            "n_simulations",
            format!(
                "Must be between {MIN_SIMULATIONS} and {MAX_SIMULATIONS}, got {}",
                params.n_simulations
            ),
        ));
    }
    validate_confidence("confidence_level", params.confidence_level)
}

fn summarize(
    draws: &[f64],
    factor: &CovarianceFactor,
    portfolio_mean: f64,
    portfolio_vol: f64,
    params: &SimulationParams,
) -> MonteCarloResult {
    let moments = stats::moments(draws);
    let sorted = stats::sorted(draws);
    let tail = (1.0 - params.confidence_level) / 2.0;
    let losses = draws.iter().filter(|r| **r < 0.0).count();

    MonteCarloResult {
        method: factor.method(),
        n_simulations: params.n_simulations,
        horizon: params.horizon,
        horizon_years: params.horizon.years(),
        expected_return: portfolio_mean,
        expected_volatility: portfolio_vol,
        mean_return: moments.mean,
        median_return: stats::quantile_sorted(&sorted, 0.5),
        std_dev: moments.std_dev,
        confidence_interval: ConfidenceInterval {
            level: params.confidence_level,
            lower: stats::quantile_sorted(&sorted, tail),
            upper: stats::quantile_sorted(&sorted, 1.0 - tail),
        },
        probability_of_loss: losses as f64 / draws.len() as f64,
        skewness: moments.skewness,
        kurtosis: moments.kurtosis,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
