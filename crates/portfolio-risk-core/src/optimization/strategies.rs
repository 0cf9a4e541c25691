use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use super::constraints::{feasible_start, resolve_bounds, ResolvedBounds};
use super::loss_limit::{enforce, HorizonLoss, LossLimit, LossLimitCheck};
use super::solver::{minimize, Objective, SolverSettings};
use crate::config::EngineConfig;
use crate::error::PortfolioRiskError;
use crate::linalg::{mat_vec_multiply, max_abs_row_sum, quadratic_form, vec_dot};
use crate::returns::matrix::validate_pair;
use crate::returns::{CovarianceMatrix, MeanReturnVector};
use crate::risk::performance::{expected_performance, ZERO_VOLATILITY};
use crate::types::{with_metadata, ComputationOutput, Rate, WeightBounds, WeightVector};
use crate::PortfolioRiskResult;

/// Weights above this share of the portfolio trigger a concentration warning.
const CONCENTRATION_WARNING: f64 = 0.40;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 1/N to every ticker; no search.
    EqualWeight,
    /// Minimize portfolio variance.
    MinVolatility,
    /// Maximize the annualized Sharpe ratio.
    #[default]
    MaxSharpe,
    /// Equalize each ticker's share of portfolio variance.
    EqualRisk,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::EqualWeight => "equal_weight",
            Strategy::MinVolatility => "min_volatility",
            Strategy::MaxSharpe => "max_sharpe",
            Strategy::EqualRisk => "equal_risk",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Strategy {
    type Err = PortfolioRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "equal_weight" | "equal" => Ok(Strategy::EqualWeight),
            "min_volatility" | "min_vol" => Ok(Strategy::MinVolatility),
            "max_sharpe" => Ok(Strategy::MaxSharpe),
            "equal_risk" | "risk_parity" => Ok(Strategy::EqualRisk),
            other => Err(PortfolioRiskError::invalid(
                "strategy",
                format!(
                    "Unknown strategy '{other}'; expected equal_weight, min_volatility, max_sharpe or equal_risk"
                ),
            )),
        }
    }
}

/// One ticker's share of portfolio variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    pub ticker: String,
    pub weight: f64,
    /// `w_i (Sigma w)_i / w' Sigma w`; sums to 1 unless the portfolio is riskless.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub strategy: Strategy,
    pub weights: WeightVector,
    pub expected_return: Rate,
    pub expected_volatility: Rate,
    pub sharpe_ratio: f64,
    pub risk_contributions: Vec<RiskContribution>,
    /// Herfindahl index, `sum(w^2)`.
    pub hhi: f64,
    /// Solver iterations; 0 for analytic allocations.
    pub iterations: u32,
    pub bounds_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_limit: Option<LossLimitCheck>,
}

// ---------------------------------------------------------------------------
// Objectives
// ---------------------------------------------------------------------------

/// Annualized variance `A w' Sigma w`.
struct MinVolatility<'a> {
    cov: &'a [Vec<f64>],
    annualization: f64,
}

impl Objective for MinVolatility<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        self.annualization * quadratic_form(self.cov, w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        mat_vec_multiply(self.cov, w)
            .into_iter()
            .map(|v| 2.0 * self.annualization * v)
            .collect()
    }

    fn lipschitz_hint(&self) -> Option<f64> {
        Some(2.0 * self.annualization * max_abs_row_sum(self.cov))
    }
}

/// Negated annualized Sharpe ratio.
struct NegativeSharpe<'a> {
    mean: &'a [f64],
    cov: &'a [Vec<f64>],
    annualization: f64,
    risk_free_rate: f64,
}

impl NegativeSharpe<'_> {
    fn excess_and_volatility(&self, w: &[f64]) -> (f64, f64) {
        let excess = self.annualization * vec_dot(w, self.mean) - self.risk_free_rate;
        let variance = (self.annualization * quadratic_form(self.cov, w)).max(0.0);
        (excess, variance.sqrt())
    }
}

impl Objective for NegativeSharpe<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        let (excess, vol) = self.excess_and_volatility(w);
        if vol <= ZERO_VOLATILITY {
            0.0
        } else {
            -excess / vol
        }
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let (excess, vol) = self.excess_and_volatility(w);
        let a = self.annualization;
        if vol <= ZERO_VOLATILITY {
            // Riskless point: climb expected return.
            return self.mean.iter().map(|m| -a * m).collect();
        }
        let sigma_w = mat_vec_multiply(self.cov, w);
        let vol3 = vol * vol * vol;
        self.mean
            .iter()
            .zip(sigma_w.iter())
            .map(|(m, sw)| -a * m / vol + excess * a * sw / vol3)
            .collect()
    }
}

/// `sum_i (w_i (Sigma w)_i - w' Sigma w / N)^2` on the covariance normalized
/// to unit mean variance.
struct EqualRisk {
    cov: Vec<Vec<f64>>,
}

impl EqualRisk {
    fn new(cov: &[Vec<f64>]) -> Self {
        let n = cov.len();
        let mean_variance = (0..n).map(|i| cov[i][i]).sum::<f64>() / n as f64;
        let scale = if mean_variance > 0.0 {
            1.0 / mean_variance
        } else {
            1.0
        };
        Self {
            cov: cov
                .iter()
                .map(|row| row.iter().map(|v| v * scale).collect())
                .collect(),
        }
    }

    /// (Sigma w, deviations of each contribution from the mean contribution)
    fn deviations(&self, w: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let sigma_w = mat_vec_multiply(&self.cov, w);
        let contributions: Vec<f64> = w.iter().zip(sigma_w.iter()).map(|(a, b)| a * b).collect();
        let target = contributions.iter().sum::<f64>() / w.len() as f64;
        let dev = contributions.iter().map(|c| c - target).collect();
        (sigma_w, dev)
    }
}

impl Objective for EqualRisk {
    fn value(&self, w: &[f64]) -> f64 {
        let (_, dev) = self.deviations(w);
        dev.iter().map(|d| d * d).sum()
    }

    // The deviations sum to zero, so the target term drops out of the gradient.
    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let (sigma_w, dev) = self.deviations(w);
        let dw: Vec<f64> = dev.iter().zip(w.iter()).map(|(d, wi)| d * wi).collect();
        let sigma_dw = mat_vec_multiply(&self.cov, &dw);
        (0..w.len())
            .map(|k| 2.0 * (dev[k] * sigma_w[k] + sigma_dw[k]))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Allocate across the tickers of `cov` with `strategy`.
///
/// Weights sum to 1 and respect `bounds` (default [0, 1] per ticker). Searched
/// strategies start from equal weights. Expected return, volatility and
/// Sharpe are recomputed from `mean` and `cov` with the risk-metric formulas.
pub fn optimize(
    mean: &MeanReturnVector,
    cov: &CovarianceMatrix,
    strategy: Strategy,
    bounds: Option<&WeightBounds>,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<OptimizationResult>> {
    optimize_with_loss_limit(mean, cov, strategy, bounds, None, config)
}

/// [`optimize`] with an optional cap on the parametric horizon loss.
///
/// When the strategy's optimum breaches `loss_limit`, the weights are moved
/// toward the lowest-loss allocation until the limit binds. Equal-weight and
/// single-ticker allocations cannot move, so a breach fails with
/// `ConstraintInfeasible`, as does a limit no allocation within the bounds
/// can meet.
pub fn optimize_with_loss_limit(
    mean: &MeanReturnVector,
    cov: &CovarianceMatrix,
    strategy: Strategy,
    bounds: Option<&WeightBounds>,
    loss_limit: Option<&LossLimit>,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<OptimizationResult>> {
    let start = Instant::now();
    config.validate()?;
    validate_pair(mean, cov)?;

    let tickers = &cov.tickers;
    let n = tickers.len();
    let resolved = resolve_bounds(tickers, bounds)?;
    let mut warnings: Vec<String> = Vec::new();

    let (weights, iterations) = if n == 1 {
        (vec![1.0], 0)
    } else {
        match strategy {
            Strategy::EqualWeight => (equal_weights(&resolved)?, 0),
            Strategy::MinVolatility => {
                let objective = MinVolatility {
                    cov: &cov.values,
                    annualization: config.trading_days_per_year,
                };
                search(strategy, &objective, &resolved, config, &mut warnings)?
            }
            Strategy::MaxSharpe => {
                let objective = NegativeSharpe {
                    mean: &mean.values,
                    cov: &cov.values,
                    annualization: config.trading_days_per_year,
                    risk_free_rate: config.risk_free_rate,
                };
                search(strategy, &objective, &resolved, config, &mut warnings)?
            }
            Strategy::EqualRisk => {
                let objective = EqualRisk::new(&cov.values);
                search(strategy, &objective, &resolved, config, &mut warnings)?
            }
        }
    };

    let (weights, loss_check) = match loss_limit {
        None => (weights, None),
        Some(limit) => {
            let loss = HorizonLoss::new(limit, &mean.values, &cov.values, config)?;
            let adjustable = n > 1 && strategy != Strategy::EqualWeight;
            let enforced = enforce(&loss, weights, adjustable, &resolved, config)?;
            if enforced.binding {
                warnings.push(format!(
                    "{:.1}% {} loss limit binds; weights moved toward the lowest-loss allocation",
                    limit.max_loss * 100.0,
                    limit.horizon
                ));
            }
            let check = loss.check(&enforced.weights, enforced.binding);
            (enforced.weights, Some(check))
        }
    };

    let performance = expected_performance(&weights, mean, cov, config);
    let risk_contributions = risk_contributions(tickers, &weights, &cov.values);
    let hhi = weights.iter().map(|w| w * w).sum();

    for (t, w) in tickers.iter().zip(weights.iter()) {
        if n > 1 && *w > CONCENTRATION_WARNING {
            warnings.push(format!(
                "{t} weight {:.1}% exceeds {:.0}% concentration threshold",
                w * 100.0,
                CONCENTRATION_WARNING * 100.0
            ));
        }
    }
    if performance.expected_volatility <= ZERO_VOLATILITY {
        warnings.push("Optimized portfolio has zero volatility; Sharpe ratio reported as 0".into());
    }

    debug!(
        strategy = strategy.label(),
        iterations,
        sharpe = performance.sharpe_ratio,
        "allocation complete"
    );

    let output = OptimizationResult {
        strategy,
        weights: WeightVector {
            tickers: tickers.clone(),
            weights,
        },
        expected_return: performance.expected_return,
        expected_volatility: performance.expected_volatility,
        sharpe_ratio: performance.sharpe_ratio,
        risk_contributions,
        hhi,
        iterations,
        bounds_applied: resolved.applied,
        loss_limit: loss_check,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(strategy, loss_limit.is_some()),
        &serde_json::json!({
            "strategy": strategy.label(),
            "tickers": n,
            "bounds": bounds_summary(tickers, &resolved),
            "trading_days_per_year": config.trading_days_per_year,
            "risk_free_rate": config.risk_free_rate,
            "max_iterations": config.max_iterations,
            "tolerance": config.tolerance,
            "loss_limit": loss_limit,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// `w_i (Sigma w)_i / w' Sigma w` per ticker; zeros for a riskless portfolio.
pub fn risk_contributions(
    tickers: &[String],
    weights: &[f64],
    cov: &[Vec<f64>],
) -> Vec<RiskContribution> {
    let sigma_w = mat_vec_multiply(cov, weights);
    let variance = vec_dot(weights, &sigma_w);
    tickers
        .iter()
        .zip(weights.iter().zip(sigma_w.iter()))
        .map(|(t, (w, sw))| RiskContribution {
            ticker: t.clone(),
            weight: *w,
            contribution: if variance > 0.0 { w * sw / variance } else { 0.0 },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn equal_weights(bounds: &ResolvedBounds) -> PortfolioRiskResult<Vec<f64>> {
    let n = bounds.len();
    let w = vec![1.0 / n as f64; n];
    if !bounds.contains(&w) {
        return Err(PortfolioRiskError::ConstraintInfeasible(format!(
            "Equal weight 1/{n} = {:.6} violates the supplied bounds",
            1.0 / n as f64
        )));
    }
    Ok(w)
}

fn search<O: Objective>(
    strategy: Strategy,
    objective: &O,
    bounds: &ResolvedBounds,
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> PortfolioRiskResult<(Vec<f64>, u32)> {
    let start = feasible_start(bounds);
    let n = bounds.len() as f64;
    if start.iter().any(|w| (w - 1.0 / n).abs() > 1e-12) {
        warnings.push(
            "Equal-weight starting point violates the bounds; projected onto the feasible set"
                .into(),
        );
    }
    let solution = minimize(
        strategy.label(),
        objective,
        start,
        bounds,
        SolverSettings {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        },
    )?;
    debug!(
        strategy = strategy.label(),
        objective = solution.objective,
        "search finished"
    );
    Ok((solution.weights, solution.iterations))
}

fn methodology(strategy: Strategy, loss_limited: bool) -> String {
    let base: String = match strategy {
        Strategy::EqualWeight => "Equal Weight Allocation (analytic)".into(),
        Strategy::MinVolatility => {
            "Minimum Volatility via Projected Gradient Descent (Armijo backtracking)".into()
        }
        Strategy::MaxSharpe => {
            "Maximum Sharpe Ratio via Projected Gradient Descent (Armijo backtracking)".into()
        }
        Strategy::EqualRisk => {
            "Equal Risk Contribution via Projected Gradient Descent (Armijo backtracking)".into()
        }
    };
    if loss_limited {
        format!("{base} with Parametric Horizon-Loss Limit")
    } else {
        base
    }
}

fn bounds_summary(tickers: &[String], bounds: &ResolvedBounds) -> serde_json::Value {
    tickers
        .iter()
        .enumerate()
        .map(|(i, t)| {
            (
                t.clone(),
                serde_json::json!({ "min": bounds.lower[i], "max": bounds.upper[i] }),
            )
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
