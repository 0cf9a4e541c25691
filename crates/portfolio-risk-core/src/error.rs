use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioRiskError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data for [{}]: {reason}", tickers.join(", "))]
    InsufficientData {
        tickers: Vec<String>,
        reason: String,
    },

    #[error("Constraint infeasible: {0}")]
    ConstraintInfeasible(String),

    #[error("Optimization did not converge: {strategy} stopped after {iterations} iterations (delta: {last_delta:e})")]
    OptimizationDidNotConverge {
        strategy: String,
        iterations: u32,
        last_delta: f64,
        /// Final iterate of the solver, in input ticker order.
        last_iterate: Vec<f64>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioRiskError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PortfolioRiskError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PortfolioRiskError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioRiskError::SerializationError(e.to_string())
    }
}
