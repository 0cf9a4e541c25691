use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::select_series;
use crate::config::EngineConfig;
use crate::holdings::{rebalancing_deltas, value_holdings, Holding, Rebalancing};
use crate::monte_carlo::{simulate, MonteCarloResult, SimulationParams};
use crate::optimization::{optimize_with_loss_limit, LossLimit, OptimizationResult, Strategy};
use crate::returns::build_returns;
use crate::types::{with_metadata, ComputationOutput, Period, PriceSeries, WeightBounds, WeightVector};
use crate::PortfolioRiskResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub prices: Vec<PriceSeries>,
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub bounds: Option<WeightBounds>,
    #[serde(default, alias = "max_drawdown")]
    pub loss_limit: Option<LossLimit>,
    /// Simulate the optimized allocation when present.
    #[serde(default)]
    pub monte_carlo: Option<SimulationParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOptimization {
    pub optimization: OptimizationResult,
    pub current_allocation: WeightVector,
    pub rebalancing: Rebalancing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloResult>,
}

/// Optimize the holdings' tickers, compare against the current market-value
/// allocation and optionally simulate the recommended weights.
pub fn optimize_portfolio(
    request: &OptimizationRequest,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<PortfolioOptimization>> {
    let start = Instant::now();
    let valuation = value_holdings(&request.holdings)?;
    let series = select_series(&request.prices, &valuation.tickers())?;

    let returns = build_returns(&series, request.period, config)?;
    let stats = &returns.result;
    let optimized = optimize_with_loss_limit(
        &stats.mean_returns,
        &stats.covariance,
        request.strategy,
        request.bounds.as_ref(),
        request.loss_limit.as_ref(),
        config,
    )?;

    let mut warnings = returns.warnings.clone();
    warnings.extend(optimized.warnings);

    let monte_carlo = match &request.monte_carlo {
        Some(params) => {
            let sim = simulate(
                &stats.mean_returns,
                &stats.covariance,
                &optimized.result.weights,
                params,
                config,
            )?;
            warnings.extend(sim.warnings);
            Some(sim.result)
        }
        None => None,
    };

    let rebalancing = rebalancing_deltas(&valuation.weights, &optimized.result.weights);
    let output = PortfolioOptimization {
        optimization: optimized.result,
        current_allocation: valuation.weights,
        rebalancing,
        monte_carlo,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio Optimization with Rebalancing Comparison",
        &serde_json::json!({
            "period": request.period.label(),
            "strategy": request.strategy.label(),
            "bounds_supplied": request.bounds.is_some(),
            "loss_limit": request.loss_limit,
            "monte_carlo": request.monte_carlo.is_some(),
            "risk_free_rate": config.risk_free_rate,
            "trading_days_per_year": config.trading_days_per_year,
        }),
        warnings,
        elapsed,
        output,
    ))
}
