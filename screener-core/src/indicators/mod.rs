//! Indicator library.
//!
//! Pure functions over price slices, oldest value first. Each returns `None`
//! when the history is too short (or a period is zero): insufficient history is
//! an expected state on young listings and fresh caches, not a fault.
//!
//! Only the latest value is returned, except for [`atr_series`], which the
//! trend classifier needs in full for its volatility moving average.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use atr::{atr, atr_series, true_range};
pub use ema::{ema, EMA_WARMUP};
pub use rsi::rsi;
pub use sma::{mean, trailing_sma};
pub use stochastic::{stochastic, Stochastic};

/// Wilder smoothing: seed with the mean of the first `period` values, then
/// `avg = (avg * (period - 1) + x) / period` for every remaining value.
///
/// Returns the seed followed by each smoothed value, i.e. `len - period + 1`
/// values, or an empty vector when fewer than `period` values exist.
pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let p = period as f64;
    let mut avg = values[..period].iter().sum::<f64>() / p;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(avg);

    for &x in &values[period..] {
        avg = (avg * (p - 1.0) + x) / p;
        out.push(avg);
    }

    out
}

/// Build OHLC columns from close prices for testing.
///
/// high = close + 1.0, low = close - 1.0.
#[cfg(test)]
pub fn make_hlc(closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let highs = closes.iter().map(|c| c + 1.0).collect();
    let lows = closes.iter().map(|c| c - 1.0).collect();
    (highs, lows, closes.to_vec())
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
