use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::select_series;
use crate::config::EngineConfig;
use crate::holdings::{value_holdings, Holding, PortfolioValuation};
use crate::returns::{build_returns, ReturnStatistics};
use crate::risk::{compute_risk_metrics, RiskMetricsResult};
use crate::types::{with_metadata, ComputationOutput, Period, PriceSeries};
use crate::PortfolioRiskResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub prices: Vec<PriceSeries>,
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub valuation: PortfolioValuation,
    pub statistics: ReturnStatistics,
    pub risk: RiskMetricsResult,
}

/// Value the holdings, weight them by market value and report historical
/// risk over `period`.
pub fn analyze_portfolio(
    request: &AnalysisRequest,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<PortfolioAnalysis>> {
    let start = Instant::now();
    let valuation = value_holdings(&request.holdings)?;
    let series = select_series(&request.prices, &valuation.tickers())?;

    let returns = build_returns(&series, request.period, config)?;
    let risk = compute_risk_metrics(&returns.result, &valuation.weights, config)?;

    let mut warnings = returns.warnings;
    warnings.extend(risk.warnings);
    if valuation.positions.len() < 2 {
        warnings.push("Single-holding portfolio; correlation analysis is trivial".into());
    }

    let mut risk_result = risk.result;
    risk_result.total_value = Some(valuation.total_value);

    let output = PortfolioAnalysis {
        valuation,
        statistics: returns.result,
        risk: risk_result,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio Analysis: Market-Value Weights and Historical Risk Metrics",
        &serde_json::json!({
            "period": request.period.label(),
            "holdings": request.holdings.len(),
            "weighting": "market value",
            "risk_free_rate": config.risk_free_rate,
            "var_confidence": config.var_confidence,
            "trading_days_per_year": config.trading_days_per_year,
        }),
        warnings,
        elapsed,
        output,
    ))
}
