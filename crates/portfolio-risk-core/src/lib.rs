pub mod config;
pub mod error;
pub mod holdings;
pub(crate) mod linalg;
pub(crate) mod stats;
pub mod types;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "risk_metrics")]
pub mod risk;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "workflows")]
pub mod workflows;

pub use config::EngineConfig;
pub use error::PortfolioRiskError;
pub use types::*;

/// Standard result type for all portfolio-risk operations
pub type PortfolioRiskResult<T> = Result<T, PortfolioRiskError>;
