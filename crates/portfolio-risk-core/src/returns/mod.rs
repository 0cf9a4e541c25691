mod alignment;
pub mod builder;
pub mod matrix;

pub use builder::{build_returns, estimate_statistics};
pub use matrix::{CovarianceMatrix, MeanReturnVector, ReturnStatistics, ReturnsMatrix};
