//! End-to-end portfolio requests built from the individual operations.
//!
//! Each workflow computes one `ReturnStatistics` and passes it to every
//! downstream step, so optimizer expectations and simulated outcomes are
//! derived from the same covariance matrix.

pub mod analysis;
pub mod optimization;

pub use analysis::{analyze_portfolio, AnalysisRequest, PortfolioAnalysis};
pub use optimization::{optimize_portfolio, OptimizationRequest, PortfolioOptimization};

use crate::error::PortfolioRiskError;
use crate::types::PriceSeries;
use crate::PortfolioRiskResult;

/// Price series for `tickers`, in that order. Missing histories fail with
/// `InsufficientData` naming every missing ticker; extra series are ignored.
pub(crate) fn select_series(
    prices: &[PriceSeries],
    tickers: &[String],
) -> PortfolioRiskResult<Vec<PriceSeries>> {
    let missing: Vec<String> = tickers
        .iter()
        .filter(|t| !prices.iter().any(|s| &s.ticker == *t))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PortfolioRiskError::InsufficientData {
            tickers: missing,
            reason: "No price history supplied".into(),
        });
    }
    Ok(tickers
        .iter()
        .filter_map(|t| prices.iter().find(|s| &s.ticker == t).cloned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use chrono::NaiveDate;

    fn series(ticker: &str) -> PriceSeries {
        PriceSeries::new(
            ticker,
            vec![PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                close: 10.0,
            }],
        )
    }

    #[test]
    fn test_select_series_orders_by_tickers() {
        let prices = vec![series("B"), series("A"), series("EXTRA")];
        let picked = select_series(&prices, &["A".to_string(), "B".to_string()]).unwrap();
        let names: Vec<&str> = picked.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_select_series_names_missing() {
        let err = select_series(&[series("A")], &["A".into(), "X".into(), "Y".into()]).unwrap_err();
        match err {
            PortfolioRiskError::InsufficientData { tickers, .. } => {
                assert_eq!(tickers, vec!["X".to_string(), "Y".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
