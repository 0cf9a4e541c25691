pub mod metrics;
pub mod performance;

pub use metrics::{
    compute_risk_metrics, correlation_matrix, historical_var, max_drawdown, series_metrics,
    CorrelationMatrix, RiskMetricsResult, SeriesMetrics,
};
pub use performance::{expected_performance, sharpe_ratio, ExpectedPerformance};
