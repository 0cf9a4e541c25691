use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioRiskError;
use crate::PortfolioRiskResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Weights must sum to one within this tolerance.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// One adjusted close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    /// Close adjusted for splits and dividends.
    pub close: f64,
}

/// Ordered price history for a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    /// Dates must be strictly increasing and prices positive and finite.
    pub fn validate(&self) -> PortfolioRiskResult<()> {
        let field = format!("prices[{}]", self.ticker);
        if self.ticker.trim().is_empty() {
            return Err(PortfolioRiskError::invalid("prices", "Ticker must not be empty"));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(PortfolioRiskError::invalid(
                    field,
                    format!("Price on {} must be positive and finite, got {}", p.date, p.close),
                ));
            }
            if i > 0 && p.date <= self.points[i - 1].date {
                return Err(PortfolioRiskError::invalid(
                    field,
                    format!(
                        "Dates must be strictly increasing: {} follows {}",
                        p.date,
                        self.points[i - 1].date
                    ),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Portfolio weights keyed by position to `tickers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
}

impl WeightVector {
    /// Build a weight vector, rejecting weights outside [0,1] or not summing to 1.
    pub fn new(tickers: Vec<String>, weights: Vec<f64>) -> PortfolioRiskResult<Self> {
        let wv = Self { tickers, weights };
        wv.validate()?;
        Ok(wv)
    }

    /// 1/N for each ticker.
    pub fn equal(tickers: &[String]) -> PortfolioRiskResult<Self> {
        if tickers.is_empty() {
            return Err(PortfolioRiskError::InsufficientData {
                tickers: Vec::new(),
                reason: "At least one ticker required".into(),
            });
        }
        let w = 1.0 / tickers.len() as f64;
        Ok(Self {
            tickers: tickers.to_vec(),
            weights: vec![w; tickers.len()],
        })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.weights[i])
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn validate(&self) -> PortfolioRiskResult<()> {
        if self.tickers.len() != self.weights.len() {
            return Err(PortfolioRiskError::invalid(
                "weights",
                format!(
                    "{} tickers but {} weights",
                    self.tickers.len(),
                    self.weights.len()
                ),
            ));
        }
        if self.weights.is_empty() {
            return Err(PortfolioRiskError::invalid("weights", "At least one weight required"));
        }
        for (t, w) in self.tickers.iter().zip(self.weights.iter()) {
            if !w.is_finite() || *w < -WEIGHT_TOLERANCE || *w > 1.0 + WEIGHT_TOLERANCE {
                return Err(PortfolioRiskError::invalid(
                    format!("weights[{t}]"),
                    format!("Weight must lie in [0, 1], got {w}"),
                ));
            }
        }
        let total = self.sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PortfolioRiskError::invalid(
                "weights",
                format!("Weights must sum to 1, got {total}"),
            ));
        }
        Ok(())
    }

    /// Reorder weights to match `tickers`. Every ticker must be present.
    pub fn aligned_to(&self, tickers: &[String]) -> PortfolioRiskResult<Vec<f64>> {
        self.validate()?;
        if tickers.len() != self.tickers.len() {
            return Err(PortfolioRiskError::invalid(
                "weights",
                format!(
                    "Expected weights for {} tickers but got {}",
                    tickers.len(),
                    self.tickers.len()
                ),
            ));
        }
        tickers
            .iter()
            .map(|t| {
                self.get(t).ok_or_else(|| {
                    PortfolioRiskError::invalid("weights", format!("No weight supplied for {t}"))
                })
            })
            .collect()
    }
}

/// Inclusive per-ticker weight bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBound {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_max_weight")]
    pub max: f64,
}

fn default_max_weight() -> f64 {
    1.0
}

impl Default for WeightBound {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl WeightBound {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, w: f64) -> bool {
        w >= self.min - WEIGHT_TOLERANCE && w <= self.max + WEIGHT_TOLERANCE
    }
}

/// Per-ticker bounds; tickers not listed default to [0, 1].
pub type WeightBounds = BTreeMap<String, WeightBound>;

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Look-back window for price history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// First date (inclusive) of the window ending at `end`. `None` keeps all history.
    pub fn window_start(&self, end: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::OneYear => 12,
            Period::TwoYears => 24,
            Period::FiveYears => 60,
            Period::TenYears => 120,
            Period::YearToDate => return NaiveDate::from_ymd_opt(end.year(), 1, 1),
            Period::Max => return None,
        };
        end.checked_sub_months(Months::new(months))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = PortfolioRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            other => Err(PortfolioRiskError::invalid(
                "period",
                format!("Unknown period '{other}'. Use: 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Horizon
// ---------------------------------------------------------------------------

/// Forward holding period for simulations and loss limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Horizon {
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::OneMonth => "1m",
            Horizon::ThreeMonths => "3m",
            Horizon::SixMonths => "6m",
            Horizon::OneYear => "1y",
            Horizon::TwoYears => "2y",
            Horizon::FiveYears => "5y",
            Horizon::TenYears => "10y",
        }
    }

    pub fn years(&self) -> f64 {
        match self {
            Horizon::OneMonth => 1.0 / 12.0,
            Horizon::ThreeMonths => 0.25,
            Horizon::SixMonths => 0.5,
            Horizon::OneYear => 1.0,
            Horizon::TwoYears => 2.0,
            Horizon::FiveYears => 5.0,
            Horizon::TenYears => 10.0,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Horizon {
    type Err = PortfolioRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Horizon::OneMonth),
            "3m" => Ok(Horizon::ThreeMonths),
            "6m" => Ok(Horizon::SixMonths),
            "1y" => Ok(Horizon::OneYear),
            "2y" => Ok(Horizon::TwoYears),
            "5y" => Ok(Horizon::FiveYears),
            "10y" => Ok(Horizon::TenYears),
            other => Err(PortfolioRiskError::invalid(
                "horizon",
                format!("Unknown horizon '{other}'; expected 1m, 3m, 6m, 1y, 2y, 5y or 10y"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_price_series_rejects_duplicate_dates() {
        let series = PriceSeries::new(
            "AAPL",
            vec![
                PricePoint { date: d(2024, 1, 2), close: 100.0 },
                PricePoint { date: d(2024, 1, 2), close: 101.0 },
            ],
        );
        assert!(series.validate().is_err());
    }

    #[test]
    fn test_price_series_rejects_non_positive_price() {
        let series = PriceSeries::new(
            "AAPL",
            vec![
                PricePoint { date: d(2024, 1, 2), close: 100.0 },
                PricePoint { date: d(2024, 1, 3), close: 0.0 },
            ],
        );
        assert!(series.validate().is_err());
    }

    #[test]
    fn test_weight_vector_sum_tolerance() {
        let tickers = vec!["A".to_string(), "B".to_string()];
        assert!(WeightVector::new(tickers.clone(), vec![0.5, 0.5000005]).is_ok());
        assert!(WeightVector::new(tickers.clone(), vec![0.5, 0.51]).is_err());
        assert!(WeightVector::new(tickers, vec![1.2, -0.2]).is_err());
    }

    #[test]
    fn test_weight_vector_aligned_to_reorders() {
        let wv = WeightVector::new(vec!["B".into(), "A".into()], vec![0.7, 0.3]).unwrap();
        let aligned = wv.aligned_to(&["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(aligned, vec![0.3, 0.7]);
        assert!(wv.aligned_to(&["A".to_string(), "C".to_string()]).is_err());
    }

    #[test]
    fn test_equal_weights() {
        let tickers: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let wv = WeightVector::equal(&tickers).unwrap();
        assert!(wv.weights.iter().all(|w| (*w - 0.25).abs() < 1e-15));
    }

    #[test]
    fn test_period_round_trip_labels() {
        for label in ["1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"] {
            let p: Period = label.parse().unwrap();
            assert_eq!(p.label(), label);
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{label}\""));
        }
        assert!("3y".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_window_start() {
        let end = d(2024, 6, 28);
        assert_eq!(Period::OneYear.window_start(end), Some(d(2023, 6, 28)));
        assert_eq!(Period::SixMonths.window_start(end), Some(d(2023, 12, 28)));
        assert_eq!(Period::YearToDate.window_start(end), Some(d(2024, 1, 1)));
        assert_eq!(Period::Max.window_start(end), None);
    }
}
