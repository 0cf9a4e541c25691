//! Projected gradient descent over the bounded simplex.

use tracing::debug;

use super::constraints::{project_bounded_simplex, ResolvedBounds};
use crate::error::PortfolioRiskError;
use crate::linalg::vec_dot;
use crate::PortfolioRiskResult;

const MAX_BACKTRACKS: usize = 60;
const STEP_GROWTH: f64 = 2.0;
const MAX_STEP: f64 = 1e6;

/// A smooth objective over weight vectors.
pub(crate) trait Objective {
    fn value(&self, w: &[f64]) -> f64;
    fn gradient(&self, w: &[f64]) -> Vec<f64>;
    /// Upper bound on the gradient's Lipschitz constant, when known cheaply.
    fn lipschitz_hint(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SolverSettings {
    pub max_iterations: u32,
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct Solution {
    pub weights: Vec<f64>,
    pub objective: f64,
    pub iterations: u32,
}

/// Minimize `objective` from `start` subject to `bounds`.
///
/// Each iteration takes a projected gradient step whose length is chosen by
/// Armijo backtracking against the quadratic upper model. Stops once the
/// objective change is within `tolerance` relative to `max(1, |f|)` and the
/// iterate has settled.
/// Exhausting `max_iterations` is an error carrying the last iterate.
pub(crate) fn minimize<O: Objective>(
    strategy: &str,
    objective: &O,
    start: Vec<f64>,
    bounds: &ResolvedBounds,
    settings: SolverSettings,
) -> PortfolioRiskResult<Solution> {
    let movement_tolerance = settings.tolerance.sqrt();
    let mut x = start;
    let mut fx = objective.value(&x);
    let mut step = objective
        .lipschitz_hint()
        .filter(|l| l.is_finite() && *l > 0.0)
        .map(|l| 1.0 / l)
        .unwrap_or(1.0)
        .min(MAX_STEP);
    let mut last_delta = f64::INFINITY;

    for iteration in 1..=settings.max_iterations {
        let g = objective.gradient(&x);

        let mut t = step;
        let mut accepted: Option<(Vec<f64>, f64)> = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial: Vec<f64> = x.iter().zip(g.iter()).map(|(xi, gi)| xi - t * gi).collect();
            let y = project_bounded_simplex(&trial, bounds);
            let fy = objective.value(&y);
            let d: Vec<f64> = y.iter().zip(x.iter()).map(|(yi, xi)| yi - xi).collect();
            let model = fx + vec_dot(&g, &d) + vec_dot(&d, &d) / (2.0 * t);
            if fy.is_finite() && fy <= model + 1e-15 * fx.abs().max(1.0) {
                accepted = Some((y, fy));
                break;
            }
            t *= 0.5;
        }

        let Some((y, fy)) = accepted else {
            // No step decreases the model: accept x when it is stationary.
            if gradient_mapping_norm(&x, &g, step, bounds) <= movement_tolerance {
                debug!(strategy, iteration, "line search stalled at a stationary point");
                return Ok(Solution {
                    weights: x,
                    objective: fx,
                    iterations: iteration,
                });
            }
            return Err(PortfolioRiskError::OptimizationDidNotConverge {
                strategy: strategy.to_string(),
                iterations: iteration,
                last_delta,
                last_iterate: x,
            });
        };

        let movement = y
            .iter()
            .zip(x.iter())
            .map(|(yi, xi)| (yi - xi).abs())
            .fold(0.0_f64, f64::max);
        last_delta = (fx - fy).abs();
        x = y;
        fx = fy;

        if last_delta <= settings.tolerance * fx.abs().max(1.0) && movement <= movement_tolerance {
            debug!(strategy, iteration, objective = fx, "solver converged");
            return Ok(Solution {
                weights: x,
                objective: fx,
                iterations: iteration,
            });
        }

        step = (t * STEP_GROWTH).min(MAX_STEP);
    }

    Err(PortfolioRiskError::OptimizationDidNotConverge {
        strategy: strategy.to_string(),
        iterations: settings.max_iterations,
        last_delta,
        last_iterate: x,
    })
}

/// `||x - P(x - t g)|| / t`, zero exactly at constrained stationary points.
fn gradient_mapping_norm(x: &[f64], g: &[f64], t: f64, bounds: &ResolvedBounds) -> f64 {
    let trial: Vec<f64> = x.iter().zip(g.iter()).map(|(xi, gi)| xi - t * gi).collect();
    let p = project_bounded_simplex(&trial, bounds);
    let d: Vec<f64> = x.iter().zip(p.iter()).map(|(xi, pi)| xi - pi).collect();
    vec_dot(&d, &d).sqrt() / t
}
