//! Parametric horizon-loss limit on an allocation.
//!
//! The worst-case horizon return of weights `w` at confidence `c` is
//! `A h w'mu - z_c sqrt(A h w' Sigma w)`; the limit requires it to stay at or
//! above `-max_loss`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::constraints::{feasible_start, ResolvedBounds};
use super::solver::{minimize, Objective, SolverSettings};
use crate::config::{validate_confidence, EngineConfig};
use crate::error::PortfolioRiskError;
use crate::linalg::{mat_vec_multiply, quadratic_form, vec_dot};
use crate::risk::performance::ZERO_VOLATILITY;
use crate::types::{Horizon, Rate};
use crate::PortfolioRiskResult;

/// Breaches smaller than this count as meeting the limit.
const LIMIT_TOLERANCE: f64 = 1e-10;
const BISECTION_STEPS: usize = 200;

fn default_limit_confidence() -> f64 {
    0.95
}

/// Largest tolerated loss over `horizon` at `confidence`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossLimit {
    /// Positive fraction, e.g. 0.15 for a 15% loss.
    pub max_loss: Rate,
    #[serde(default = "default_limit_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub horizon: Horizon,
}

impl LossLimit {
    pub fn new(max_loss: Rate) -> Self {
        Self {
            max_loss,
            confidence: default_limit_confidence(),
            horizon: Horizon::default(),
        }
    }

    pub fn validate(&self) -> PortfolioRiskResult<()> {
        if !(self.max_loss > 0.0 && self.max_loss <= 1.0) {
            return Err(PortfolioRiskError::invalid(
                "loss_limit.max_loss",
                format!("Must be in (0, 1], got {}", self.max_loss),
            ));
        }
        validate_confidence("loss_limit.confidence", self.confidence)?;
        if self.confidence < 0.5 {
            return Err(PortfolioRiskError::invalid(
                "loss_limit.confidence",
                format!("Must be at least 0.5, got {}", self.confidence),
            ));
        }
        Ok(())
    }
}

/// How the final allocation stands against the limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossLimitCheck {
    pub max_loss: Rate,
    pub confidence: f64,
    pub horizon: Horizon,
    /// Worst-case horizon return of the final weights; `>= -max_loss`.
    pub worst_case_return: Rate,
    /// The strategy's own optimum breached the limit and was pulled back.
    pub binding: bool,
}

/// Horizon loss `z sqrt(s w' Sigma w) - s w'mu` with `s = A h`, minimized to
/// find the safest allocation within the bounds.
pub(crate) struct HorizonLoss<'a> {
    mean: &'a [f64],
    cov: &'a [Vec<f64>],
    scale: f64,
    z: f64,
    limit: LossLimit,
}

impl<'a> HorizonLoss<'a> {
    pub fn new(
        limit: &LossLimit,
        mean: &'a [f64],
        cov: &'a [Vec<f64>],
        config: &EngineConfig,
    ) -> PortfolioRiskResult<Self> {
        limit.validate()?;
        let normal = Normal::new(0.0, 1.0).map_err(|e| {
            PortfolioRiskError::invalid("distribution", format!("Invalid Normal parameters: {e}"))
        })?;
        Ok(Self {
            mean,
            cov,
            scale: config.trading_days_per_year * limit.horizon.years(),
            z: normal.inverse_cdf(limit.confidence),
            limit: *limit,
        })
    }

    fn volatility(&self, w: &[f64]) -> f64 {
        (self.scale * quadratic_form(self.cov, w)).max(0.0).sqrt()
    }

    pub fn worst_case_return(&self, w: &[f64]) -> f64 {
        self.scale * vec_dot(w, self.mean) - self.z * self.volatility(w)
    }

    /// Positive when `w` loses more than the limit allows.
    fn breach(&self, w: &[f64]) -> f64 {
        -self.worst_case_return(w) - self.limit.max_loss
    }

    pub fn check(&self, w: &[f64], binding: bool) -> LossLimitCheck {
        LossLimitCheck {
            max_loss: self.limit.max_loss,
            confidence: self.limit.confidence,
            horizon: self.limit.horizon,
            worst_case_return: self.worst_case_return(w),
            binding,
        }
    }

    fn describe(&self, w: &[f64]) -> String {
        format!(
            "worst-case {} loss of {:.2}% at {:.0}% confidence exceeds the {:.2}% limit",
            self.limit.horizon,
            -self.worst_case_return(w) * 100.0,
            self.limit.confidence * 100.0,
            self.limit.max_loss * 100.0
        )
    }
}

impl Objective for HorizonLoss<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        -self.worst_case_return(w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let vol = self.volatility(w);
        if vol <= ZERO_VOLATILITY {
            return self.mean.iter().map(|m| -self.scale * m).collect();
        }
        let sigma_w = mat_vec_multiply(self.cov, w);
        self.mean
            .iter()
            .zip(sigma_w.iter())
            .map(|(m, sw)| -self.scale * m + self.z * self.scale * sw / vol)
            .collect()
    }
}

/// Outcome of holding an allocation to the limit.
#[derive(Debug)]
pub(crate) struct Enforced {
    pub weights: Vec<f64>,
    pub binding: bool,
}

/// Keep `weights` when they meet the limit. Otherwise find the lowest-loss
/// allocation within `bounds` and move from it toward `weights` as far as the
/// limit allows; the worst-case return is concave, so the segment crosses the
/// limit once.
///
/// `adjustable` is false for allocations that must not be moved (equal
/// weight, a single ticker); a breach there is `ConstraintInfeasible`.
pub(crate) fn enforce(
    loss: &HorizonLoss<'_>,
    weights: Vec<f64>,
    adjustable: bool,
    bounds: &ResolvedBounds,
    config: &EngineConfig,
) -> PortfolioRiskResult<Enforced> {
    if loss.breach(&weights) <= LIMIT_TOLERANCE {
        return Ok(Enforced {
            weights,
            binding: false,
        });
    }
    if !adjustable {
        return Err(PortfolioRiskError::ConstraintInfeasible(format!(
            "Allocation has a {}",
            loss.describe(&weights)
        )));
    }

    let safest = minimize(
        "loss_limit",
        loss,
        feasible_start(bounds),
        bounds,
        SolverSettings {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        },
    )?
    .weights;
    if loss.breach(&safest) > LIMIT_TOLERANCE {
        return Err(PortfolioRiskError::ConstraintInfeasible(format!(
            "Even the lowest-loss allocation within the bounds has a {}",
            loss.describe(&safest)
        )));
    }

    let blend = |t: f64| -> Vec<f64> {
        safest
            .iter()
            .zip(weights.iter())
            .map(|(s, w)| s + t * (w - s))
            .collect()
    };
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if loss.breach(&blend(mid)) <= 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON {
            break;
        }
    }
    debug!(share_of_optimum = lo, "loss limit binds");

    Ok(Enforced {
        weights: blend(lo),
        binding: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::constraints::resolve_bounds;

    const A: f64 = 252.0;

    /// Annual vols 20% and 5%, uncorrelated; the risky asset earns more.
    fn two_assets() -> (Vec<f64>, Vec<Vec<f64>>) {
        (
            vec![0.10 / A, 0.03 / A],
            vec![vec![0.04 / A, 0.0], vec![0.0, 0.0025 / A]],
        )
    }

    fn tickers() -> Vec<String> {
        vec!["RISKY".to_string(), "SAFE".to_string()]
    }

    #[test]
    fn test_validate() {
        assert!(LossLimit::new(0.15).validate().is_ok());
        assert!(LossLimit::new(0.0).validate().is_err());
        assert!(LossLimit::new(1.5).validate().is_err());
        let low = LossLimit {
            confidence: 0.3,
            ..LossLimit::new(0.1)
        };
        assert!(low.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let l: LossLimit = serde_json::from_str(r#"{"max_loss": 0.2}"#).unwrap();
        assert_eq!(l, LossLimit::new(0.2));
        let l: LossLimit =
            serde_json::from_str(r#"{"max_loss": 0.2, "horizon": "6m", "confidence": 0.9}"#)
                .unwrap();
        assert_eq!(l.horizon, Horizon::SixMonths);
    }

    #[test]
    fn test_worst_case_return_known_answer() {
        let (mean, cov) = two_assets();
        let loss =
            HorizonLoss::new(&LossLimit::new(0.1), &mean, &cov, &EngineConfig::default()).unwrap();
        // All in RISKY: 0.10 - 1.6449 * 0.20
        let expected = 0.10 - 1.6448536269514722 * 0.20;
        assert!((loss.worst_case_return(&[1.0, 0.0]) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_satisfied_limit_leaves_weights() {
        let (mean, cov) = two_assets();
        let cfg = EngineConfig::default();
        let loss = HorizonLoss::new(&LossLimit::new(0.5), &mean, &cov, &cfg).unwrap();
        let b = resolve_bounds(&tickers(), None).unwrap();
        let out = enforce(&loss, vec![1.0, 0.0], true, &b, &cfg).unwrap();
        assert_eq!(out.weights, vec![1.0, 0.0]);
        assert!(!out.binding);
    }

    #[test]
    fn test_binding_limit_lands_on_boundary() {
        let (mean, cov) = two_assets();
        let cfg = EngineConfig::default();
        let loss = HorizonLoss::new(&LossLimit::new(0.10), &mean, &cov, &cfg).unwrap();
        let b = resolve_bounds(&tickers(), None).unwrap();
        let out = enforce(&loss, vec![1.0, 0.0], true, &b, &cfg).unwrap();
        assert!(out.binding);
        assert!((out.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let worst = loss.worst_case_return(&out.weights);
        assert!(worst >= -0.10 - 1e-9);
        assert!((worst + 0.10).abs() < 1e-6, "worst {worst}");
        assert!(out.weights[0] < 1.0);
    }

    #[test]
    fn test_unadjustable_breach_is_infeasible() {
        let (mean, cov) = two_assets();
        let cfg = EngineConfig::default();
        let loss = HorizonLoss::new(&LossLimit::new(0.10), &mean, &cov, &cfg).unwrap();
        let b = resolve_bounds(&tickers(), None).unwrap();
        let err = enforce(&loss, vec![1.0, 0.0], false, &b, &cfg).unwrap_err();
        assert!(matches!(err, PortfolioRiskError::ConstraintInfeasible(_)));
    }
}
