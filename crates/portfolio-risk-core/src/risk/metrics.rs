use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::performance::{annualize_return, annualize_volatility, sharpe_ratio, ZERO_VOLATILITY};
use crate::config::{validate_confidence, EngineConfig};
use crate::returns::{CovarianceMatrix, ReturnStatistics};
use crate::stats;
use crate::types::{with_metadata, ComputationOutput, Money, Period, Rate, WeightVector};
use crate::PortfolioRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Pearson correlation matrix, labelled by ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        Some(self.values[i][j])
    }
}

/// Metrics of a single daily portfolio return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetrics {
    /// Mean daily return x trading days.
    pub annual_return: Rate,
    /// Sample stdev of daily returns x sqrt(trading days).
    pub volatility: Rate,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline of the compounded curve (<= 0).
    pub max_drawdown: Rate,
    /// Daily historical VaR: the (1 - confidence) quantile of daily returns.
    pub var: Rate,
    pub var_confidence: f64,
}

/// Snapshot of a portfolio's historical risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetricsResult {
    pub period: Period,
    /// Market value of the holdings, when valued from holdings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Money>,
    pub annual_return: Rate,
    pub volatility: Rate,
    pub sharpe_ratio: f64,
    pub max_drawdown: Rate,
    pub var: Rate,
    pub var_confidence: f64,
    pub correlation_matrix: CorrelationMatrix,
    pub n_observations: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the headline risk metrics of a weighted portfolio.
///
/// The portfolio's daily return series is `returns * weights`; the
/// correlation matrix is derived from the builder's covariance matrix rather
/// than re-estimated.
pub fn compute_risk_metrics(
    stats: &ReturnStatistics,
    weights: &WeightVector,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<RiskMetricsResult>> {
    let start = Instant::now();
    config.validate()?;
    stats.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let w = weights.aligned_to(&stats.returns.tickers)?;
    let daily = stats.returns.portfolio_returns(&w);
    let metrics = series_metrics(&daily, config)?;
    let correlation_matrix = correlation_matrix(&stats.covariance);

    if metrics.volatility <= ZERO_VOLATILITY {
        warnings.push("Portfolio volatility is zero; Sharpe ratio reported as 0".into());
    }
    for (i, t) in stats.covariance.tickers.iter().enumerate() {
        if stats.covariance.variance(i) <= 0.0 {
            warnings.push(format!(
                "{t} has zero return variance; its correlations are reported as 0"
            ));
        }
    }

    let output = RiskMetricsResult {
        period: stats.period,
        total_value: None,
        annual_return: metrics.annual_return,
        volatility: metrics.volatility,
        sharpe_ratio: metrics.sharpe_ratio,
        max_drawdown: metrics.max_drawdown,
        var: metrics.var,
        var_confidence: metrics.var_confidence,
        correlation_matrix,
        n_observations: daily.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Historical Portfolio Risk Metrics (Sharpe, Max Drawdown, Historical VaR)",
        &serde_json::json!({
            "period": stats.period.label(),
            "observations": daily.len(),
            "trading_days_per_year": config.trading_days_per_year,
            "risk_free_rate": config.risk_free_rate,
            "var_confidence": config.var_confidence,
            "var_method": "historical, linear interpolation",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Annualized return, volatility, Sharpe, max drawdown and historical VaR of
/// one daily return series.
pub fn series_metrics(daily: &[f64], config: &EngineConfig) -> PortfolioRiskResult<SeriesMetrics> {
    validate_confidence("config.var_confidence", config.var_confidence)?;
    if daily.len() < 2 {
        return Err(crate::error::PortfolioRiskError::InsufficientData {
            tickers: Vec::new(),
            reason: format!("{} daily returns, need at least 2", daily.len()),
        });
    }

    let annual_return = annualize_return(stats::mean(daily), config);
    let volatility = annualize_volatility(stats::sample_std(daily), config);

    Ok(SeriesMetrics {
        annual_return,
        volatility,
        sharpe_ratio: sharpe_ratio(annual_return, volatility, config.risk_free_rate),
        max_drawdown: max_drawdown(daily),
        var: historical_var(daily, config.var_confidence),
        var_confidence: config.var_confidence,
    })
}

/// Maximum drawdown of the value curve that starts at 1.0 and compounds
/// `daily`. Returned as a fraction in [-1, 0].
pub fn max_drawdown(daily: &[f64]) -> Rate {
    let mut value = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in daily {
        value *= 1.0 + r;
        if value > peak {
            peak = value;
        }
        let dd = value / peak - 1.0;
        if dd < worst {
            worst = dd;
        }
    }
    worst.max(-1.0)
}

/// Empirical `(1 - confidence)` quantile of daily returns.
pub fn historical_var(daily: &[f64], confidence: f64) -> Rate {
    let sorted = stats::sorted(daily);
    stats::quantile_sorted(&sorted, 1.0 - confidence)
}

/// Pearson correlation from covariance. Diagonal is exactly 1.0; off-diagonal
/// entries are clamped to [-1, 1] and are 0 when either variance is zero.
#[allow(clippy::needless_range_loop)]
pub fn correlation_matrix(cov: &CovarianceMatrix) -> CorrelationMatrix {
    let n = cov.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let denom = (cov.variance(i) * cov.variance(j)).sqrt();
            let rho = if denom > 0.0 && denom.is_finite() {
                (cov.values[i][j] / denom).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }
    CorrelationMatrix {
        tickers: cov.tickers.clone(),
        values,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::{estimate_statistics, ReturnsMatrix};
    use chrono::NaiveDate;

    fn stats_from_rows(tickers: &[&str], rows: Vec<Vec<f64>>) -> ReturnStatistics {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates = (0..rows.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let m = ReturnsMatrix::new(tickers.iter().map(|s| s.to_string()).collect(), dates, rows)
            .unwrap();
        estimate_statistics(m, Period::OneYear, &EngineConfig::default()).unwrap()
    }

    // ------------------------------------------------------------------
    // 1. Max drawdown
    // ------------------------------------------------------------------
    #[test]
    fn test_max_drawdown_known_answer() {
        // 1.0 -> 1.1 -> 0.88 -> 0.968 : worst is 0.88 / 1.1 - 1 = -0.2
        let dd = max_drawdown(&[0.10, -0.20, 0.10]);
        assert!((dd + 0.2).abs() < 1e-12, "dd={dd}");
    }

    #[test]
    fn test_max_drawdown_monotonic_gain_is_zero() {
        assert_eq!(max_drawdown(&[0.01, 0.02, 0.0, 0.03]), 0.0);
    }

    #[test]
    fn test_max_drawdown_counts_first_day_loss() {
        // Curve starts at 1.0 so an immediate loss is a drawdown
        let dd = max_drawdown(&[-0.05, 0.01]);
        assert!((dd + 0.05).abs() < 1e-12);
    }

    // ------------------------------------------------------------------
    // 2. VaR
    // ------------------------------------------------------------------
    #[test]
    fn test_historical_var_interpolates() {
        let daily: Vec<f64> = (0..21).map(|i| -0.10 + 0.01 * i as f64).collect();
        // 5% quantile: rank 0.05 * 20 = 1 -> second smallest = -0.09
        assert!((historical_var(&daily, 0.95) + 0.09).abs() < 1e-12);
        // 99%: rank 0.2 -> -0.10 + 0.2 * 0.01
        assert!((historical_var(&daily, 0.99) + 0.098).abs() < 1e-12);
    }

    #[test]
    fn test_var_99_at_least_as_severe_as_95() {
        let daily = [0.012, -0.031, 0.004, -0.002, 0.021, -0.018, 0.007, -0.044, 0.015, 0.001];
        let v95 = historical_var(&daily, 0.95);
        let v99 = historical_var(&daily, 0.99);
        assert!(v99 <= v95, "v99={v99} v95={v95}");
    }

    // ------------------------------------------------------------------
    // 3. Correlation
    // ------------------------------------------------------------------
    #[test]
    fn test_correlation_diagonal_and_range() {
        let s = stats_from_rows(
            &["A", "B", "C"],
            vec![
                vec![0.01, 0.02, -0.01],
                vec![-0.02, -0.01, 0.03],
                vec![0.015, 0.01, 0.0],
                vec![0.0, 0.005, -0.02],
            ],
        );
        let corr = correlation_matrix(&s.covariance);
        for i in 0..3 {
            assert_eq!(corr.values[i][i], 1.0);
            for j in 0..3 {
                assert!((-1.0..=1.0).contains(&corr.values[i][j]));
                assert_eq!(corr.values[i][j], corr.values[j][i]);
            }
        }
    }

    #[test]
    fn test_correlation_zero_variance_asset() {
        let s = stats_from_rows(&["A", "CASH"], vec![vec![0.01, 0.0], vec![-0.01, 0.0], vec![0.02, 0.0]]);
        let corr = correlation_matrix(&s.covariance);
        assert_eq!(corr.get("A", "CASH"), Some(0.0));
        assert_eq!(corr.get("CASH", "CASH"), Some(1.0));
    }

    // ------------------------------------------------------------------
    // 4. End to end
    // ------------------------------------------------------------------
    #[test]
    fn test_perfect_hedge_has_zero_volatility() {
        let rows: Vec<Vec<f64>> = [0.01, -0.02, 0.015, -0.005, 0.03]
            .iter()
            .map(|r| vec![*r, -*r])
            .collect();
        let s = stats_from_rows(&["LONG", "SHORT"], rows);
        let w = WeightVector::new(vec!["LONG".into(), "SHORT".into()], vec![0.5, 0.5]).unwrap();
        let out = compute_risk_metrics(&s, &w, &EngineConfig::default()).unwrap();
        let m = &out.result;
        assert!(m.volatility.abs() < 1e-12);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert!((m.correlation_matrix.get("LONG", "SHORT").unwrap() + 1.0).abs() < 1e-12);
        assert!(out.warnings.iter().any(|w| w.contains("volatility is zero")));
    }

    #[test]
    fn test_metrics_known_answer_single_asset() {
        let daily = vec![0.01, -0.01, 0.02, 0.0];
        let s = stats_from_rows(&["A"], daily.iter().map(|r| vec![*r]).collect());
        let w = WeightVector::new(vec!["A".into()], vec![1.0]).unwrap();
        let cfg = EngineConfig::default();
        let m = compute_risk_metrics(&s, &w, &cfg).unwrap().result;
        let mean = 0.005;
        assert!((m.annual_return - mean * 252.0).abs() < 1e-12);
        let var: f64 = daily.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0;
        assert!((m.volatility - var.sqrt() * 252f64.sqrt()).abs() < 1e-12);
        assert!((m.sharpe_ratio - (m.annual_return - 0.04) / m.volatility).abs() < 1e-12);
        assert!(m.max_drawdown <= 0.0);
        assert_eq!(m.period, Period::OneYear);
        assert_eq!(m.total_value, None);
    }

    #[test]
    fn test_weights_for_unknown_ticker_rejected() {
        let s = stats_from_rows(&["A", "B"], vec![vec![0.01, 0.0], vec![0.0, 0.01], vec![0.02, 0.01]]);
        let w = WeightVector::new(vec!["A".into(), "C".into()], vec![0.5, 0.5]).unwrap();
        assert!(compute_risk_metrics(&s, &w, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_inconsistent_covariance_rejected() {
        let rows = vec![vec![0.01, 0.0], vec![0.0, 0.01], vec![0.02, 0.01]];
        let w = WeightVector::new(vec!["A".into(), "B".into()], vec![0.5, 0.5]).unwrap();
        let cfg = EngineConfig::default();

        let mut ragged = stats_from_rows(&["A", "B"], rows.clone());
        ragged.covariance.values[1].truncate(1);
        assert!(matches!(
            compute_risk_metrics(&ragged, &w, &cfg),
            Err(crate::error::PortfolioRiskError::InvalidInput { .. })
        ));

        let mut relabelled = stats_from_rows(&["A", "B"], rows);
        relabelled.covariance.tickers.reverse();
        relabelled.mean_returns.tickers.reverse();
        assert!(matches!(
            compute_risk_metrics(&relabelled, &w, &cfg),
            Err(crate::error::PortfolioRiskError::InvalidInput { .. })
        ));
    }
}
