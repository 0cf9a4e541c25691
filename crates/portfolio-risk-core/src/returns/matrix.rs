use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioRiskError;
use crate::linalg::vec_dot;
use crate::PortfolioRiskResult;

/// Symmetry tolerance when validating caller-supplied covariance matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Daily simple returns: one row per aligned trading day, one column per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsMatrix {
    pub tickers: Vec<String>,
    /// Date of each row (the later date of each price pair).
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
}

impl ReturnsMatrix {
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> PortfolioRiskResult<Self> {
        let m = Self {
            tickers,
            dates,
            rows,
        };
        m.validate()?;
        Ok(m)
    }

    pub fn validate(&self) -> PortfolioRiskResult<()> {
        let n = self.tickers.len();
        if n == 0 {
            return Err(PortfolioRiskError::InsufficientData {
                tickers: Vec::new(),
                reason: "At least one ticker required".into(),
            });
        }
        if self.dates.len() != self.rows.len() {
            return Err(PortfolioRiskError::invalid(
                "returns.dates",
                format!("{} dates for {} rows", self.dates.len(), self.rows.len()),
            ));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != n {
                return Err(PortfolioRiskError::invalid(
                    "returns.rows",
                    format!("Row {} has {} columns, expected {}", i, row.len(), n),
                ));
            }
            if row.iter().any(|r| !r.is_finite()) {
                return Err(PortfolioRiskError::invalid(
                    "returns.rows",
                    format!("Row {i} contains a non-finite return"),
                ));
            }
        }
        Ok(())
    }

    pub fn n_observations(&self) -> usize {
        self.rows.len()
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[j]).collect()
    }

    /// Per-row weighted sum: the portfolio's daily return series.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Vec<f64> {
        self.rows.iter().map(|row| vec_dot(row, weights)).collect()
    }
}

/// Arithmetic mean of each return column (daily, not annualized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReturnVector {
    pub tickers: Vec<String>,
    pub values: Vec<f64>,
}

impl MeanReturnVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sample covariance of daily returns (denominator n - 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn variance(&self, i: usize) -> f64 {
        self.values[i][i]
    }

    /// Square, symmetric, finite, non-negative diagonal, labelled consistently.
    #[allow(clippy::needless_range_loop)]
    pub fn validate(&self) -> PortfolioRiskResult<()> {
        let n = self.tickers.len();
        if n == 0 {
            return Err(PortfolioRiskError::InsufficientData {
                tickers: Vec::new(),
                reason: "At least one ticker required".into(),
            });
        }
        if self.values.len() != n {
            return Err(PortfolioRiskError::invalid(
                "covariance",
                format!("Expected {}x{} matrix but got {} rows", n, n, self.values.len()),
            ));
        }
        for (i, row) in self.values.iter().enumerate() {
            if row.len() != n {
                return Err(PortfolioRiskError::invalid(
                    "covariance",
                    format!("Row {} has {} columns, expected {}", i, row.len(), n),
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(PortfolioRiskError::invalid(
                    "covariance",
                    format!("Row {i} contains a non-finite value"),
                ));
            }
        }
        for i in 0..n {
            if self.values[i][i] < 0.0 {
                return Err(PortfolioRiskError::invalid(
                    "covariance",
                    format!("Negative variance for {}", self.tickers[i]),
                ));
            }
            for j in (i + 1)..n {
                let (a, b) = (self.values[i][j], self.values[j][i]);
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > SYMMETRY_TOLERANCE * scale {
                    return Err(PortfolioRiskError::invalid(
                        "covariance",
                        format!("Not symmetric: [{},{}]={} != [{},{}]={}", i, j, a, j, i, b),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builder output shared by the metrics calculator, optimizer and simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub period: crate::types::Period,
    pub returns: ReturnsMatrix,
    pub mean_returns: MeanReturnVector,
    pub covariance: CovarianceMatrix,
}

impl ReturnStatistics {
    /// Shapes of all three parts, with one ticker order shared across them.
    pub fn validate(&self) -> PortfolioRiskResult<()> {
        self.returns.validate()?;
        validate_pair(&self.mean_returns, &self.covariance)?;
        if self.covariance.tickers != self.returns.tickers {
            return Err(PortfolioRiskError::invalid(
                "covariance",
                "Tickers must match the returns matrix tickers in the same order",
            ));
        }
        Ok(())
    }
}

/// Mean and covariance must describe the same tickers in the same order.
pub(crate) fn validate_pair(
    mean: &MeanReturnVector,
    cov: &CovarianceMatrix,
) -> PortfolioRiskResult<()> {
    cov.validate()?;
    if mean.tickers != cov.tickers {
        return Err(PortfolioRiskError::invalid(
            "mean_returns",
            "Tickers must match the covariance matrix tickers in the same order",
        ));
    }
    if mean.values.len() != mean.tickers.len() {
        return Err(PortfolioRiskError::invalid(
            "mean_returns",
            format!(
                "Expected {} values but got {}",
                mean.tickers.len(),
                mean.values.len()
            ),
        ));
    }
    if mean.values.iter().any(|v| !v.is_finite()) {
        return Err(PortfolioRiskError::invalid(
            "mean_returns",
            "Contains a non-finite value",
        ));
    }
    Ok(())
}
