//! Market-value weights and rebalancing deltas for a set of holdings.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioRiskError;
use crate::types::{Money, WeightVector};
use crate::PortfolioRiskResult;

/// A position: shares of `ticker` at its current `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub quantity: Decimal,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    pub ticker: String,
    pub quantity: Decimal,
    pub price: Money,
    pub market_value: Money,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub positions: Vec<HoldingValuation>,
    pub total_value: Money,
    pub weights: WeightVector,
}

impl PortfolioValuation {
    pub fn tickers(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.ticker.clone()).collect()
    }
}

/// Value each holding at `quantity * price` and weight it by market value.
///
/// Repeated tickers are merged: quantities add and the last listed price wins.
/// Position order follows first appearance.
pub fn value_holdings(holdings: &[Holding]) -> PortfolioRiskResult<PortfolioValuation> {
    if holdings.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "At least one holding required",
        ));
    }

    let mut merged: Vec<(String, Decimal, Money)> = Vec::new();
    for h in holdings {
        if h.ticker.trim().is_empty() {
            return Err(PortfolioRiskError::invalid("holdings.ticker", "Ticker must not be empty"));
        }
        if h.quantity < Decimal::ZERO {
            return Err(PortfolioRiskError::invalid(
                format!("holdings[{}].quantity", h.ticker),
                "Quantity must not be negative",
            ));
        }
        if h.price < Decimal::ZERO {
            return Err(PortfolioRiskError::invalid(
                format!("holdings[{}].price", h.ticker),
                "Price must not be negative",
            ));
        }
        match merged.iter_mut().find(|(t, _, _)| *t == h.ticker) {
            Some(entry) => {
                entry.1 += h.quantity;
                entry.2 = h.price;
            }
            None => merged.push((h.ticker.clone(), h.quantity, h.price)),
        }
    }

    let values: Vec<Money> = merged.iter().map(|(_, q, p)| q * p).collect();
    let total_value: Money = values.iter().copied().sum();
    if total_value <= Decimal::ZERO {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "Total market value is zero; weights are undefined",
        ));
    }

    let mut positions = Vec::with_capacity(merged.len());
    for ((ticker, quantity, price), market_value) in merged.into_iter().zip(values) {
        let weight = (market_value / total_value).to_f64().ok_or_else(|| {
            PortfolioRiskError::invalid(format!("holdings[{ticker}]"), "Weight is not representable")
        })?;
        positions.push(HoldingValuation {
            ticker,
            quantity,
            price,
            market_value,
            weight,
        });
    }

    let weights = WeightVector::new(
        positions.iter().map(|p| p.ticker.clone()).collect(),
        positions.iter().map(|p| p.weight).collect(),
    )?;

    Ok(PortfolioValuation {
        positions,
        total_value,
        weights,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceDelta {
    pub ticker: String,
    pub current: f64,
    pub target: f64,
    /// `target - current`; positive means buy.
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebalancing {
    pub deltas: Vec<RebalanceDelta>,
    /// One-way turnover, `sum(|delta|) / 2`.
    pub turnover: f64,
}

/// Per-ticker moves from `current` to `target`. Target tickers come first;
/// tickers held only in `current` follow with a target of 0.
pub fn rebalancing_deltas(current: &WeightVector, target: &WeightVector) -> Rebalancing {
    let mut deltas: Vec<RebalanceDelta> = target
        .tickers
        .iter()
        .zip(target.weights.iter())
        .map(|(t, w)| {
            let cur = current.get(t).unwrap_or(0.0);
            RebalanceDelta {
                ticker: t.clone(),
                current: cur,
                target: *w,
                delta: w - cur,
            }
        })
        .collect();

    for (t, w) in current.tickers.iter().zip(current.weights.iter()) {
        if target.get(t).is_none() {
            deltas.push(RebalanceDelta {
                ticker: t.clone(),
                current: *w,
                target: 0.0,
                delta: -w,
            });
        }
    }

    let turnover = deltas.iter().map(|d| d.delta.abs()).sum::<f64>() / 2.0;
    Rebalancing { deltas, turnover }
}
