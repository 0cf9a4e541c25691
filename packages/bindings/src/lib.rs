use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use portfolio_risk_core::monte_carlo::SimulationParams;
use portfolio_risk_core::optimization::{LossLimit, Strategy};
use portfolio_risk_core::returns::{build_returns as build_return_statistics, ReturnStatistics};
use portfolio_risk_core::{
    ComputationOutput, EngineConfig, Period, PriceSeries, WeightBounds, WeightVector,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Every binding accepts an optional `config` next to its own fields.
#[derive(Deserialize)]
struct PricesInput {
    prices: Vec<PriceSeries>,
    #[serde(default)]
    period: Period,
    #[serde(default)]
    config: EngineConfig,
}

#[derive(Deserialize)]
struct RiskInput {
    #[serde(flatten)]
    history: PricesInput,
    weights: WeightVector,
}

#[derive(Deserialize)]
struct OptimizeInput {
    #[serde(flatten)]
    history: PricesInput,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default)]
    bounds: Option<WeightBounds>,
    #[serde(default, alias = "max_drawdown")]
    loss_limit: Option<LossLimit>,
}

#[derive(Deserialize)]
struct SimulateInput {
    #[serde(flatten)]
    history: PricesInput,
    weights: WeightVector,
    #[serde(default)]
    params: SimulationParams,
}

#[derive(Deserialize)]
struct WorkflowInput<R> {
    #[serde(flatten)]
    request: R,
    #[serde(default)]
    config: EngineConfig,
}

fn parse<T: serde::de::DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn statistics(history: &PricesInput) -> NapiResult<ComputationOutput<ReturnStatistics>> {
    build_return_statistics(&history.prices, history.period, &history.config).map_err(to_napi_error)
}

/// Builder warnings come first, followed by the operation's own.
fn merge_warnings<T: serde::Serialize>(
    builder: Vec<String>,
    mut output: ComputationOutput<T>,
) -> ComputationOutput<T> {
    let mut warnings = builder;
    warnings.append(&mut output.warnings);
    output.warnings = warnings;
    output
}

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

#[napi]
pub fn build_returns(input_json: String) -> NapiResult<String> {
    let input: PricesInput = parse(&input_json)?;
    let output = statistics(&input)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Risk metrics
// ---------------------------------------------------------------------------

#[napi]
pub fn risk_metrics(input_json: String) -> NapiResult<String> {
    let input: RiskInput = parse(&input_json)?;
    let returns = statistics(&input.history)?;
    let output = portfolio_risk_core::risk::compute_risk_metrics(
        &returns.result,
        &input.weights,
        &input.history.config,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&merge_warnings(returns.warnings, output)).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

#[napi]
pub fn optimize(input_json: String) -> NapiResult<String> {
    let input: OptimizeInput = parse(&input_json)?;
    let returns = statistics(&input.history)?;
    let output = portfolio_risk_core::optimization::optimize_with_loss_limit(
        &returns.result.mean_returns,
        &returns.result.covariance,
        input.strategy,
        input.bounds.as_ref(),
        input.loss_limit.as_ref(),
        &input.history.config,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&merge_warnings(returns.warnings, output)).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate(input_json: String) -> NapiResult<String> {
    let input: SimulateInput = parse(&input_json)?;
    let returns = statistics(&input.history)?;
    let output = portfolio_risk_core::monte_carlo::simulate(
        &returns.result.mean_returns,
        &returns.result.covariance,
        &input.weights,
        &input.params,
        &input.history.config,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&merge_warnings(returns.warnings, output)).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_portfolio(input_json: String) -> NapiResult<String> {
    let input: WorkflowInput<portfolio_risk_core::workflows::AnalysisRequest> =
        parse(&input_json)?;
    let output = portfolio_risk_core::workflows::analyze_portfolio(&input.request, &input.config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn optimize_portfolio(input_json: String) -> NapiResult<String> {
    let input: WorkflowInput<portfolio_risk_core::workflows::OptimizationRequest> =
        parse(&input_json)?;
    let output = portfolio_risk_core::workflows::optimize_portfolio(&input.request, &input.config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
