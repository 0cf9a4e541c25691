use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use portfolio_risk_core::returns::build_returns;
use portfolio_risk_core::{EngineConfig, Period, PriceSeries};

use crate::input;

/// Arguments for returns and covariance estimation
#[derive(Args)]
pub struct ReturnsArgs {
    /// Path to JSON input file ({"prices": [...], "period": "1y"})
    #[arg(long)]
    pub input: Option<String>,

    /// Look-back period (1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max); overrides the input
    #[arg(long)]
    pub period: Option<Period>,
}

#[derive(Deserialize)]
pub struct ReturnsInput {
    pub prices: Vec<PriceSeries>,
    #[serde(default)]
    pub period: Period,
}

pub fn run_returns(args: ReturnsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let data: ReturnsInput = input::read_input(args.input.as_deref(), "returns")?;
    let period = args.period.unwrap_or(data.period);
    let result = build_returns(&data.prices, period, config)?;
    Ok(serde_json::to_value(result)?)
}
