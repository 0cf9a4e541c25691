pub mod decomposition;
pub mod simulation;

pub use crate::types::Horizon;
pub use decomposition::{decompose, CovarianceFactor, SimulationMethod};
pub use simulation::{simulate, ConfidenceInterval, MonteCarloResult, SimulationParams};
