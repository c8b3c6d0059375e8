//! Trend classification built on a linear regression of closes and the ATR series.

pub mod classifier;
pub mod regression;

pub use classifier::{classify_trend, Trend, TrendConfig, TrendResult, VolatilityRegime, MIN_ATR};
pub use regression::{linear_regression, LinearFit};
