use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use portfolio_risk_core::monte_carlo::{simulate, Horizon, SimulationParams};
use portfolio_risk_core::returns::build_returns;
use portfolio_risk_core::{EngineConfig, Period, PriceSeries, WeightVector};

use crate::input;

/// Arguments for Monte Carlo simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file ({"prices": [...], "weights": {...}, "params": {...}})
    #[arg(long)]
    pub input: Option<String>,

    /// Number of simulated portfolio returns (100 to 1,000,000)
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Confidence level of the reported interval
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Seed for reproducible draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Horizon (1m, 3m, 6m, 1y, 2y, 5y, 10y)
    #[arg(long)]
    pub horizon: Option<Horizon>,

    /// Look-back period of the price history; overrides the input
    #[arg(long)]
    pub period: Option<Period>,
}

#[derive(Deserialize)]
pub struct SimulateInput {
    pub prices: Vec<PriceSeries>,
    pub weights: WeightVector,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub params: SimulationParams,
}

pub fn run_simulate(args: SimulateArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let data: SimulateInput = input::read_input(args.input.as_deref(), "Monte Carlo simulation")?;
    let mut params = data.params;
    if let Some(n) = args.simulations {
        params.n_simulations = n;
    }
    if let Some(c) = args.confidence {
        params.confidence_level = c;
    }
    if args.seed.is_some() {
        params.seed = args.seed;
    }
    if let Some(h) = args.horizon {
        params.horizon = h;
    }

    let period = args.period.unwrap_or(data.period);
    let returns = build_returns(&data.prices, period, config)?;
    let stats = &returns.result;
    let mut result = simulate(&stats.mean_returns, &stats.covariance, &data.weights, &params, config)?;
    let mut warnings = returns.warnings.clone();
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    Ok(serde_json::to_value(result)?)
}
