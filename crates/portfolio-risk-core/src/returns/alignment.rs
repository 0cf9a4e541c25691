use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::PortfolioRiskError;
use crate::types::{Period, PriceSeries};
use crate::PortfolioRiskResult;

/// Prices inner-joined on date: one row per common trading day.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlignedPrices {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// `prices[t][j]` is the close of ticker j on `dates[t]`.
    pub prices: Vec<Vec<f64>>,
    /// Raw dates that were present for some tickers but not all.
    pub dropped_dates: usize,
}

/// Intersect trading dates across all series, then trim to `period`.
///
/// Fails with `InsufficientData` when fewer than `min_prices` aligned dates
/// remain, naming the tickers whose own history is too short, or every
/// ticker when each is long enough on its own but the overlap is not.
pub(crate) fn align_prices(
    series: &[PriceSeries],
    period: Period,
    min_prices: usize,
) -> PortfolioRiskResult<AlignedPrices> {
    if series.is_empty() {
        return Err(PortfolioRiskError::InsufficientData {
            tickers: Vec::new(),
            reason: "At least one price series required".into(),
        });
    }

    let mut seen = HashSet::new();
    for s in series {
        s.validate()?;
        if !seen.insert(s.ticker.as_str()) {
            return Err(PortfolioRiskError::invalid(
                "prices",
                format!("Duplicate ticker {}", s.ticker),
            ));
        }
    }

    let lookups: Vec<BTreeMap<NaiveDate, f64>> = series
        .iter()
        .map(|s| s.points.iter().map(|p| (p.date, p.close)).collect())
        .collect();

    let union: BTreeSet<NaiveDate> = lookups.iter().flat_map(|m| m.keys().copied()).collect();
    let mut common: Vec<NaiveDate> = union
        .iter()
        .copied()
        .filter(|d| lookups.iter().all(|m| m.contains_key(d)))
        .collect();
    let dropped_dates = union.len() - common.len();

    let window_start = common.last().and_then(|end| period.window_start(*end));
    if let Some(start) = window_start {
        common.retain(|d| *d >= start);
    }

    if common.len() < min_prices {
        let short: Vec<String> = series
            .iter()
            .filter(|s| {
                let own = s
                    .points
                    .iter()
                    .filter(|p| window_start.map_or(true, |start| p.date >= start))
                    .count();
                own < min_prices
            })
            .map(|s| s.ticker.clone())
            .collect();
        let tickers = if short.is_empty() {
            series.iter().map(|s| s.ticker.clone()).collect()
        } else {
            short
        };
        return Err(PortfolioRiskError::InsufficientData {
            tickers,
            reason: format!(
                "{} aligned trading days in period {}, need at least {}",
                common.len(),
                period,
                min_prices
            ),
        });
    }

    let prices: Vec<Vec<f64>> = common
        .iter()
        .map(|d| lookups.iter().map(|m| m[d]).collect())
        .collect();

    Ok(AlignedPrices {
        tickers: series.iter().map(|s| s.ticker.clone()).collect(),
        dates: common,
        prices,
        dropped_dates,
    })
}
