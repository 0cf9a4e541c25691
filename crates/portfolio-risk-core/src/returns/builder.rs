use serde::Serialize;
use std::time::Instant;

use super::alignment::align_prices;
use super::matrix::{CovarianceMatrix, MeanReturnVector, ReturnStatistics, ReturnsMatrix};
use crate::config::EngineConfig;
use crate::error::PortfolioRiskError;
use crate::stats;
use crate::types::{with_metadata, ComputationOutput, Period, PriceSeries};
use crate::PortfolioRiskResult;

#[derive(Serialize)]
struct BuilderAssumptions<'a> {
    period: &'a str,
    return_type: &'static str,
    covariance: &'static str,
    min_observations: usize,
    n_assets: usize,
    n_observations: usize,
}

/// Build the returns matrix, mean-return vector and covariance matrix from
/// per-ticker adjusted closes.
///
/// Dates are inner-joined across tickers and trimmed to `period` before
/// simple returns `p_t / p_{t-1} - 1` are taken. Column order follows the
/// order of `prices`.
pub fn build_returns(
    prices: &[PriceSeries],
    period: Period,
    config: &EngineConfig,
) -> PortfolioRiskResult<ComputationOutput<ReturnStatistics>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings = Vec::new();

    // n returns need n + 1 prices
    let aligned = align_prices(prices, period, config.min_observations + 1)?;
    if aligned.dropped_dates > 0 {
        tracing::debug!(
            dropped = aligned.dropped_dates,
            "dates missing from at least one ticker were excluded"
        );
        warnings.push(format!(
            "{} trading day(s) not shared by every ticker were excluded",
            aligned.dropped_dates
        ));
    }

    let rows: Vec<Vec<f64>> = aligned
        .prices
        .windows(2)
        .map(|pair| {
            pair[1]
                .iter()
                .zip(pair[0].iter())
                .map(|(p1, p0)| p1 / p0 - 1.0)
                .collect()
        })
        .collect();
    let returns = ReturnsMatrix::new(aligned.tickers, aligned.dates[1..].to_vec(), rows)?;

    let stats = estimate_statistics(returns, period, config)?;
    if stats.returns.n_observations() < config.recommended_observations {
        tracing::warn!(
            observations = stats.returns.n_observations(),
            recommended = config.recommended_observations,
            "short return history"
        );
        warnings.push(format!(
            "Only {} return observations; at least {} recommended for stable estimates",
            stats.returns.n_observations(),
            config.recommended_observations
        ));
    }

    let assumptions = BuilderAssumptions {
        period: period.label(),
        return_type: "simple",
        covariance: "sample (n - 1)",
        min_observations: config.min_observations,
        n_assets: stats.returns.n_assets(),
        n_observations: stats.returns.n_observations(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Simple Returns, Sample Mean and Covariance",
        &assumptions,
        warnings,
        elapsed,
        stats,
    ))
}

/// Mean vector and sample covariance of an existing returns matrix.
#[allow(clippy::needless_range_loop)]
pub fn estimate_statistics(
    returns: ReturnsMatrix,
    period: Period,
    config: &EngineConfig,
) -> PortfolioRiskResult<ReturnStatistics> {
    returns.validate()?;
    let n_obs = returns.n_observations();
    if n_obs < config.min_observations {
        return Err(PortfolioRiskError::InsufficientData {
            tickers: returns.tickers.clone(),
            reason: format!(
                "{} return observations, need at least {}",
                n_obs, config.min_observations
            ),
        });
    }

    let n = returns.n_assets();
    let columns: Vec<Vec<f64>> = (0..n).map(|j| returns.column(j)).collect();
    let means: Vec<f64> = columns.iter().map(|c| stats::mean(c)).collect();

    let mut cov = vec![vec![0.0; n]; n];
    let denom = (n_obs - 1) as f64;
    for i in 0..n {
        for j in i..n {
            let s: f64 = columns[i]
                .iter()
                .zip(columns[j].iter())
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum();
            cov[i][j] = s / denom;
            cov[j][i] = cov[i][j];
        }
    }

    tracing::debug!(assets = n, observations = n_obs, "estimated return statistics");

    Ok(ReturnStatistics {
        period,
        mean_returns: MeanReturnVector {
            tickers: returns.tickers.clone(),
            values: means,
        },
        covariance: CovarianceMatrix {
            tickers: returns.tickers.clone(),
            values: cov,
        },
        returns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use chrono::NaiveDate;

    fn series(ticker: &str, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            ticker,
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close: *c,
                })
                .collect(),
        )
    }

    #[test]
    fn test_simple_returns() {
        let out = build_returns(
            &[series("A", &[100.0, 110.0, 99.0])],
            Period::Max,
            &EngineConfig::default(),
        )
        .unwrap();
        let rows = &out.result.returns.rows;
        assert!((rows[0][0] - 0.10).abs() < 1e-12);
        assert!((rows[1][0] + 0.10).abs() < 1e-12);
        assert!(out.result.mean_returns.values[0].abs() < 1e-12);
    }

    #[test]
    fn test_sample_covariance_known_answer() {
        // returns A: 0.1, -0.1 ; B: 0.05, 0.0
        let out = build_returns(
            &[
                series("A", &[100.0, 110.0, 99.0]),
                series("B", &[100.0, 105.0, 105.0]),
            ],
            Period::Max,
            &EngineConfig::default(),
        )
        .unwrap();
        let cov = &out.result.covariance.values;
        // var A = (0.1^2 + 0.1^2) / 1 = 0.02
        assert!((cov[0][0] - 0.02).abs() < 1e-12);
        // var B = (0.025^2 * 2) / 1 = 0.00125
        assert!((cov[1][1] - 0.00125).abs() < 1e-12);
        // cov = (0.1*0.025 + -0.1*-0.025) / 1 = 0.005
        assert!((cov[0][1] - 0.005).abs() < 1e-12);
        assert_eq!(cov[0][1], cov[1][0]);
    }

    #[test]
    fn test_two_prices_is_insufficient() {
        let err = build_returns(
            &[series("A", &[100.0, 101.0]), series("B", &[50.0, 51.0])],
            Period::Max,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PortfolioRiskError::InsufficientData { .. }));
    }

    #[test]
    fn test_short_history_warning() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let out = build_returns(&[series("A", &closes)], Period::Max, &EngineConfig::default())
            .unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("recommended")));
    }
}
