pub mod constraints;
pub mod loss_limit;
mod solver;
pub mod strategies;

pub use constraints::{resolve_bounds, ResolvedBounds};
pub use loss_limit::{LossLimit, LossLimitCheck};
pub use strategies::{
    optimize, optimize_with_loss_limit, risk_contributions, OptimizationResult, RiskContribution,
    Strategy,
};
