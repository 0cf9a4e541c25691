use serde::{Deserialize, Serialize};

use crate::error::PortfolioRiskError;
use crate::types::{WeightBound, WeightBounds, WEIGHT_TOLERANCE};
use crate::PortfolioRiskResult;

const PROJECTION_ITERATIONS: usize = 100;

/// Per-ticker bounds resolved into input ticker order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// True when the caller supplied any bound.
    pub applied: bool,
}

impl ResolvedBounds {
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn contains(&self, w: &[f64]) -> bool {
        w.len() == self.len()
            && w.iter().enumerate().all(|(i, wi)| {
                *wi >= self.lower[i] - WEIGHT_TOLERANCE && *wi <= self.upper[i] + WEIGHT_TOLERANCE
            })
    }
}

/// Resolve optional bounds against `tickers`. Unlisted tickers get [0, 1].
///
/// Bounds naming a ticker outside the universe, bounds outside [0, 1] and
/// `min > max` are `InvalidInput`; bounds that cannot sum to 1 are
/// `ConstraintInfeasible`.
pub fn resolve_bounds(
    tickers: &[String],
    bounds: Option<&WeightBounds>,
) -> PortfolioRiskResult<ResolvedBounds> {
    let n = tickers.len();
    let mut lower = vec![0.0; n];
    let mut upper = vec![1.0; n];
    let mut applied = false;

    if let Some(map) = bounds {
        for (ticker, bound) in map {
            let i = tickers.iter().position(|t| t == ticker).ok_or_else(|| {
                PortfolioRiskError::invalid(
                    format!("bounds[{ticker}]"),
                    "Ticker is not part of the portfolio",
                )
            })?;
            validate_bound(ticker, bound)?;
            lower[i] = bound.min;
            upper[i] = bound.max;
            applied = true;
        }
    }

    let min_sum: f64 = lower.iter().sum();
    let max_sum: f64 = upper.iter().sum();
    if min_sum > 1.0 + WEIGHT_TOLERANCE {
        return Err(PortfolioRiskError::ConstraintInfeasible(format!(
            "Minimum weights sum to {min_sum:.6}, above 1"
        )));
    }
    if max_sum < 1.0 - WEIGHT_TOLERANCE {
        return Err(PortfolioRiskError::ConstraintInfeasible(format!(
            "Maximum weights sum to {max_sum:.6}, below 1"
        )));
    }

    Ok(ResolvedBounds {
        lower,
        upper,
        applied,
    })
}

fn validate_bound(ticker: &str, bound: &WeightBound) -> PortfolioRiskResult<()> {
    let field = format!("bounds[{ticker}]");
    if !bound.min.is_finite() || !bound.max.is_finite() {
        return Err(PortfolioRiskError::invalid(field, "Bounds must be finite"));
    }
    if bound.min < 0.0 || bound.max > 1.0 {
        return Err(PortfolioRiskError::invalid(
            field,
            format!("Bounds must lie in [0, 1], got ({}, {})", bound.min, bound.max),
        ));
    }
    if bound.min > bound.max {
        return Err(PortfolioRiskError::invalid(
            field,
            format!("min {} exceeds max {}", bound.min, bound.max),
        ));
    }
    Ok(())
}

/// Euclidean projection of `y` onto `{w : sum(w) = 1, lower <= w <= upper}`.
///
/// The projection has the form `w_i = clamp(y_i - tau, l_i, u_i)`; the sum is
/// monotone in `tau`, which is found by bisection. Assumes feasible bounds.
pub fn project_bounded_simplex(y: &[f64], bounds: &ResolvedBounds) -> Vec<f64> {
    let clamped = |tau: f64| -> Vec<f64> {
        y.iter()
            .enumerate()
            .map(|(i, yi)| (yi - tau).clamp(bounds.lower[i], bounds.upper[i]))
            .collect()
    };

    let mut lo = y
        .iter()
        .zip(bounds.upper.iter())
        .map(|(yi, ui)| yi - ui)
        .fold(f64::INFINITY, f64::min);
    let mut hi = y
        .iter()
        .zip(bounds.lower.iter())
        .map(|(yi, li)| yi - li)
        .fold(f64::NEG_INFINITY, f64::max);

    // At tau = lo every weight sits at its upper bound (sum >= 1); at tau = hi
    // every weight sits at its lower bound (sum <= 1).
    for _ in 0..PROJECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let s: f64 = clamped(mid).iter().sum();
        if s > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let mut w = clamped(0.5 * (lo + hi));
    absorb_residual(&mut w, bounds);
    w
}

/// Push the leftover bisection residual into weights with room to move so
/// the result sums to 1 to machine precision.
fn absorb_residual(w: &mut [f64], bounds: &ResolvedBounds) {
    let residual = 1.0 - w.iter().sum::<f64>();
    if residual == 0.0 {
        return;
    }
    for (i, wi) in w.iter_mut().enumerate() {
        let room = if residual > 0.0 {
            bounds.upper[i] - *wi
        } else {
            bounds.lower[i] - *wi
        };
        if room.abs() >= residual.abs() {
            *wi += residual;
            return;
        }
    }
}

/// Equal weights, projected when they violate the bounds.
pub fn feasible_start(bounds: &ResolvedBounds) -> Vec<f64> {
    let n = bounds.len();
    let equal = vec![1.0 / n as f64; n];
    if bounds.contains(&equal) {
        equal
    } else {
        project_bounded_simplex(&equal, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn bounds_of(entries: &[(&str, f64, f64)]) -> WeightBounds {
        entries
            .iter()
            .map(|(t, lo, hi)| (t.to_string(), WeightBound::new(*lo, *hi)))
            .collect()
    }

    #[test]
    fn test_default_bounds_long_only() {
        let b = resolve_bounds(&tickers(&["A", "B"]), None).unwrap();
        assert_eq!(b.lower, vec![0.0, 0.0]);
        assert_eq!(b.upper, vec![1.0, 1.0]);
        assert!(!b.applied);
    }

    #[test]
    fn test_unknown_ticker_rejected() {
        let err = resolve_bounds(&tickers(&["A"]), Some(&bounds_of(&[("Z", 0.0, 0.5)])))
            .unwrap_err();
        assert!(matches!(err, PortfolioRiskError::InvalidInput { .. }));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = resolve_bounds(&tickers(&["A", "B"]), Some(&bounds_of(&[("A", 0.6, 0.4)])))
            .unwrap_err();
        assert!(matches!(err, PortfolioRiskError::InvalidInput { .. }));
    }

    #[test]
    fn test_infeasible_sums() {
        let t = tickers(&["A", "B"]);
        let err = resolve_bounds(&t, Some(&bounds_of(&[("A", 0.6, 1.0), ("B", 0.6, 1.0)])))
            .unwrap_err();
        assert!(matches!(err, PortfolioRiskError::ConstraintInfeasible(_)));
        let err = resolve_bounds(&t, Some(&bounds_of(&[("A", 0.0, 0.3), ("B", 0.0, 0.3)])))
            .unwrap_err();
        assert!(matches!(err, PortfolioRiskError::ConstraintInfeasible(_)));
    }

    #[test]
    fn test_projection_onto_plain_simplex() {
        let b = resolve_bounds(&tickers(&["A", "B", "C"]), None).unwrap();
        let w = project_bounded_simplex(&[0.5, 0.5, 0.5], &b);
        for wi in &w {
            assert!((wi - 1.0 / 3.0).abs() < 1e-9);
        }
        let w = project_bounded_simplex(&[2.0, 0.0, -1.0], &b);
        assert!((w[0] - 1.0).abs() < 1e-9);
        assert!(w[1].abs() < 1e-9 && w[2].abs() < 1e-9);
    }

    #[test]
    fn test_projection_respects_box() {
        let t = tickers(&["A", "B", "C"]);
        let b = resolve_bounds(&t, Some(&bounds_of(&[("A", 0.0, 0.4), ("C", 0.1, 1.0)]))).unwrap();
        let w = project_bounded_simplex(&[1.0, 0.0, 0.0], &b);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(b.contains(&w), "{w:?}");
        assert!((w[0] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_feasible_start_equal_when_allowed() {
        let b = resolve_bounds(&tickers(&["A", "B"]), None).unwrap();
        assert_eq!(feasible_start(&b), vec![0.5, 0.5]);
    }

    #[test]
    fn test_feasible_start_projects_when_needed() {
        let t = tickers(&["A", "B"]);
        let b = resolve_bounds(&t, Some(&bounds_of(&[("A", 0.7, 1.0)]))).unwrap();
        let w = feasible_start(&b);
        assert!((w[0] - 0.7).abs() < 1e-9);
        assert!((w[1] - 0.3).abs() < 1e-9);
    }
}
