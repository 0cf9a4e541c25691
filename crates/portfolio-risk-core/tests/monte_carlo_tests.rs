#![cfg(feature = "monte_carlo")]

use pretty_assertions::assert_eq;

use portfolio_risk_core::monte_carlo::{simulate, Horizon, SimulationMethod, SimulationParams};
use portfolio_risk_core::returns::{CovarianceMatrix, MeanReturnVector};
use portfolio_risk_core::{EngineConfig, PortfolioRiskError, WeightVector};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn diagonal() -> (MeanReturnVector, CovarianceMatrix, WeightVector) {
    let t = names(&["A", "B"]);
    (
        MeanReturnVector {
            tickers: t.clone(),
            values: vec![0.0005, 0.0002],
        },
        CovarianceMatrix {
            tickers: t.clone(),
            values: vec![vec![0.0002, 0.0], vec![0.0, 0.00005]],
        },
        WeightVector::new(t, vec![0.6, 0.4]).unwrap(),
    )
}

fn correlated() -> (MeanReturnVector, CovarianceMatrix, WeightVector) {
    let t = names(&["EQ", "HY", "IG"]);
    (
        MeanReturnVector {
            tickers: t.clone(),
            values: vec![0.0004, 0.0003, 0.0001],
        },
        CovarianceMatrix {
            tickers: t.clone(),
            values: vec![
                vec![0.00020, 0.00008, 0.00001],
                vec![0.00008, 0.00010, 0.00002],
                vec![0.00001, 0.00002, 0.00003],
            ],
        },
        WeightVector::new(t, vec![0.5, 0.3, 0.2]).unwrap(),
    )
}

fn params(n: u32, seed: u64) -> SimulationParams {
    SimulationParams {
        n_simulations: n,
        seed: Some(seed),
        ..SimulationParams::default()
    }
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn test_seeded_runs_are_bit_identical() {
    let (mean, cov, w) = correlated();
    let cfg = EngineConfig::default();
    let a = simulate(&mean, &cov, &w, &params(10_000, 42), &cfg).unwrap();
    let b = simulate(&mean, &cov, &w, &params(10_000, 42), &cfg).unwrap();
    assert_eq!(a.result, b.result);
    assert_eq!(a.result.method, SimulationMethod::Decomposition);
}

#[test]
fn test_different_seeds_differ() {
    let (mean, cov, w) = correlated();
    let cfg = EngineConfig::default();
    let a = simulate(&mean, &cov, &w, &params(1_000, 1), &cfg).unwrap().result;
    let b = simulate(&mean, &cov, &w, &params(1_000, 2), &cfg).unwrap().result;
    assert!(a.mean_return != b.mean_return);
}

// ---------------------------------------------------------------------------
// Convergence to the analytic moments
// ---------------------------------------------------------------------------

#[test]
fn test_diagonal_decomposition_converges() {
    let (mean, cov, w) = diagonal();
    let r = simulate(&mean, &cov, &w, &params(50_000, 7), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(r.method, SimulationMethod::Decomposition);
    let tol = 0.02 * r.expected_volatility;
    assert!((r.mean_return - r.expected_return).abs() < tol);
    assert!((r.std_dev - r.expected_volatility).abs() < tol);
}

#[test]
fn test_collinear_covariance_falls_back() {
    // Two listings of the same asset: rank-deficient covariance
    let t = names(&["ABC", "ABC.L"]);
    let mean = MeanReturnVector {
        tickers: t.clone(),
        values: vec![0.0004, 0.0004],
    };
    let cov = CovarianceMatrix {
        tickers: t.clone(),
        values: vec![vec![0.0001, 0.0001], vec![0.0001, 0.0001]],
    };
    let w = WeightVector::new(t, vec![0.5, 0.5]).unwrap();
    let out = simulate(&mean, &cov, &w, &params(50_000, 3), &EngineConfig::default()).unwrap();
    let r = &out.result;
    assert_eq!(r.method, SimulationMethod::IndependentFallback);
    assert!(out.warnings.iter().any(|w| w.contains("not positive-definite")));

    // Portfolio of one asset held twice: vol = sqrt(0.0001 * 252)
    let vol = (0.0001f64 * 252.0).sqrt();
    assert!((r.expected_volatility - vol).abs() < 1e-12);
    assert!((r.std_dev - vol).abs() < 0.02 * vol);
    assert!((r.mean_return - 0.0004 * 252.0).abs() < 0.02 * vol);
}

#[test]
fn test_single_ticker_uses_decomposition() {
    let t = names(&["SPY"]);
    let mean = MeanReturnVector {
        tickers: t.clone(),
        values: vec![0.0003],
    };
    let cov = CovarianceMatrix {
        tickers: t.clone(),
        values: vec![vec![0.0001]],
    };
    let w = WeightVector::new(t, vec![1.0]).unwrap();
    let r = simulate(&mean, &cov, &w, &params(20_000, 5), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(r.method, SimulationMethod::Decomposition);
    assert!((r.std_dev - r.expected_volatility).abs() < 0.03 * r.expected_volatility);
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn test_wider_confidence_widens_interval() {
    let (mean, cov, w) = correlated();
    let cfg = EngineConfig::default();
    let mut p = params(10_000, 21);
    let narrow = simulate(&mean, &cov, &w, &p, &cfg).unwrap().result;
    p.confidence_level = 0.99;
    let wide = simulate(&mean, &cov, &w, &p, &cfg).unwrap().result;
    assert!(wide.confidence_interval.lower <= narrow.confidence_interval.lower);
    assert!(wide.confidence_interval.upper >= narrow.confidence_interval.upper);
    assert_eq!(wide.confidence_interval.level, 0.99);
}

#[test]
fn test_raw_kurtosis_near_three() {
    let (mean, cov, w) = correlated();
    let r = simulate(&mean, &cov, &w, &params(50_000, 8), &EngineConfig::default())
        .unwrap()
        .result;
    assert!((r.kurtosis - 3.0).abs() < 0.15, "kurtosis={}", r.kurtosis);
    assert!(r.skewness.abs() < 0.05);
    assert!(r.probability_of_loss > 0.0 && r.probability_of_loss < 0.5);
}

#[test]
fn test_short_horizon_shrinks_dispersion() {
    let (mean, cov, w) = correlated();
    let cfg = EngineConfig::default();
    let mut p = params(5_000, 13);
    let year = simulate(&mean, &cov, &w, &p, &cfg).unwrap().result;
    p.horizon = Horizon::OneMonth;
    let month = simulate(&mean, &cov, &w, &p, &cfg).unwrap().result;
    assert!(month.std_dev < year.std_dev);
    assert!((month.horizon_years - 1.0 / 12.0).abs() < 1e-15);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_weights_must_cover_covariance_tickers() {
    let (mean, cov, _) = correlated();
    let w = WeightVector::new(names(&["EQ", "HY"]), vec![0.5, 0.5]).unwrap();
    let err = simulate(&mean, &cov, &w, &params(1_000, 1), &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, PortfolioRiskError::InvalidInput { .. }));
}

#[test]
fn test_confidence_level_range() {
    let (mean, cov, w) = correlated();
    let mut p = params(1_000, 1);
    p.confidence_level = 1.0;
    assert!(simulate(&mean, &cov, &w, &p, &EngineConfig::default()).is_err());
}
