use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use portfolio_risk_core::returns::build_returns;
use portfolio_risk_core::risk::compute_risk_metrics;
use portfolio_risk_core::workflows::{analyze_portfolio, AnalysisRequest};
use portfolio_risk_core::{EngineConfig, Period, PriceSeries, WeightVector};

use crate::input;

/// Arguments for portfolio risk metrics
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON input file ({"prices": [...], "weights": {...}, "period": "1y"})
    #[arg(long)]
    pub input: Option<String>,

    /// Look-back period; overrides the input
    #[arg(long)]
    pub period: Option<Period>,

    /// VaR confidence level (e.g. 0.95 or 0.99)
    #[arg(long)]
    pub var_confidence: Option<f64>,
}

/// Arguments for holdings analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file ({"prices": [...], "holdings": [...], "period": "1y"})
    #[arg(long)]
    pub input: Option<String>,

    /// Look-back period; overrides the input
    #[arg(long)]
    pub period: Option<Period>,

    /// VaR confidence level (e.g. 0.95 or 0.99)
    #[arg(long)]
    pub var_confidence: Option<f64>,
}

#[derive(Deserialize)]
pub struct RiskInput {
    pub prices: Vec<PriceSeries>,
    pub weights: WeightVector,
    #[serde(default)]
    pub period: Period,
}

pub fn run_risk(args: RiskArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let data: RiskInput = input::read_input(args.input.as_deref(), "risk metrics")?;
    let config = with_var_confidence(config, args.var_confidence);
    let period = args.period.unwrap_or(data.period);

    let returns = build_returns(&data.prices, period, &config)?;
    let mut result = compute_risk_metrics(&returns.result, &data.weights, &config)?;
    let mut warnings = returns.warnings;
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: AnalyzeArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: AnalysisRequest = input::read_input(args.input.as_deref(), "analysis")?;
    if let Some(period) = args.period {
        request.period = period;
    }
    let config = with_var_confidence(config, args.var_confidence);
    let result = analyze_portfolio(&request, &config)?;
    Ok(serde_json::to_value(result)?)
}

fn with_var_confidence(config: &EngineConfig, var_confidence: Option<f64>) -> EngineConfig {
    let mut config = config.clone();
    if let Some(c) = var_confidence {
        config.var_confidence = c;
    }
    config
}
