use serde::{Deserialize, Serialize};
use std::fmt;

use crate::linalg::{cholesky, Cholesky};

/// Relative pivot threshold below which a covariance matrix is treated as
/// not positive-definite.
pub const DECOMPOSITION_EPSILON: f64 = 1e-12;

/// Sampling method a simulation actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMethod {
    /// Correlated draws through the Cholesky factor.
    Decomposition,
    /// Portfolio-level normal draws ignoring cross-asset structure.
    IndependentFallback,
}

impl fmt::Display for SimulationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationMethod::Decomposition => f.write_str("decomposition"),
            SimulationMethod::IndependentFallback => f.write_str("independent-fallback"),
        }
    }
}

/// Either a lower-triangular factor `L` with `L L' = Sigma`, or the reason
/// one could not be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CovarianceFactor {
    Decomposition { factor: Vec<Vec<f64>> },
    IndependentFallback { reason: String },
}

impl CovarianceFactor {
    pub fn method(&self) -> SimulationMethod {
        match self {
            CovarianceFactor::Decomposition { .. } => SimulationMethod::Decomposition,
            CovarianceFactor::IndependentFallback { .. } => SimulationMethod::IndependentFallback,
        }
    }
}

/// Factor `cov`, falling back when it is not positive-definite (near-singular,
/// rank-deficient or collinear).
pub fn decompose(cov: &[Vec<f64>], tickers: &[String]) -> CovarianceFactor {
    match cholesky(cov, DECOMPOSITION_EPSILON) {
        Cholesky::Factor(factor) => CovarianceFactor::Decomposition { factor },
        Cholesky::NotPositiveDefinite { index, pivot } => {
            let ticker = tickers.get(index).map(String::as_str).unwrap_or("?");
            CovarianceFactor::IndependentFallback {
                reason: format!(
                    "Covariance matrix is not positive-definite (pivot {pivot:e} at {ticker})"
                ),
            }
        }
    }
}
