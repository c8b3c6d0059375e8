//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), defined from
//! the second candle on.
//! ATR uses Wilder smoothing seeded with the mean of the first `period` true ranges.
//! Needs period + 1 candles.

use super::wilder_smooth;

/// True range series for candles 1..n (the first candle has no previous close).
///
/// Returns an empty vector when the three columns differ in length.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    if highs.len() != closes.len() || lows.len() != closes.len() {
        return Vec::new();
    }

    (1..closes.len())
        .map(|i| {
            let h = highs[i];
            let l = lows[i];
            let pc = closes[i - 1];
            (h - l).max((h - pc).abs()).max((l - pc).abs())
        })
        .collect()
}

/// Every smoothed ATR value, seed first: `len - period` values.
///
/// Empty when there are fewer than `period + 1` candles.
pub fn atr_series(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }
    wilder_smooth(&true_range(highs, lows, closes), period)
}

/// Latest ATR value, or `None` with fewer than `period + 1` candles.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    atr_series(highs, lows, closes, period).last().copied()
}
