use clap::Args;
use serde_json::Value;

use portfolio_risk_core::optimization::{LossLimit, Strategy};
use portfolio_risk_core::types::Horizon;
use portfolio_risk_core::workflows::{optimize_portfolio, OptimizationRequest};
use portfolio_risk_core::{EngineConfig, Period};

use crate::input;

/// Arguments for allocation optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON input file ({"prices": [...], "holdings": [...], "bounds": {...}})
    #[arg(long)]
    pub input: Option<String>,

    /// Strategy: equal_weight, min_volatility, max_sharpe or equal_risk; overrides the input
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Look-back period; overrides the input
    #[arg(long)]
    pub period: Option<Period>,

    /// Also simulate the optimized allocation with this many draws
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Seed for the simulation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Largest tolerated worst-case loss as a fraction (e.g. 0.15)
    #[arg(long)]
    pub max_loss: Option<f64>,

    /// Horizon for --max-loss (1m, 3m, 6m, 1y, 2y, 5y, 10y)
    #[arg(long, requires = "max_loss")]
    pub loss_horizon: Option<Horizon>,

    /// Confidence for --max-loss
    #[arg(long, requires = "max_loss")]
    pub loss_confidence: Option<f64>,
}

pub fn run_optimize(args: OptimizeArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: OptimizationRequest = input::read_input(args.input.as_deref(), "optimization")?;
    if let Some(strategy) = args.strategy {
        request.strategy = strategy;
    }
    if let Some(period) = args.period {
        request.period = period;
    }
    if args.simulations.is_some() || args.seed.is_some() {
        let mut params = request.monte_carlo.take().unwrap_or_default();
        if let Some(n) = args.simulations {
            params.n_simulations = n;
        }
        if args.seed.is_some() {
            params.seed = args.seed;
        }
        request.monte_carlo = Some(params);
    }
    if let Some(max_loss) = args.max_loss {
        let mut limit = request.loss_limit.take().unwrap_or_else(|| LossLimit::new(max_loss));
        limit.max_loss = max_loss;
        if let Some(horizon) = args.loss_horizon {
            limit.horizon = horizon;
        }
        if let Some(confidence) = args.loss_confidence {
            limit.confidence = confidence;
        }
        request.loss_limit = Some(limit);
    }
    let result = optimize_portfolio(&request, config)?;
    Ok(serde_json::to_value(result)?)
}
