//! Stochastic oscillator (%K / %D).
//!
//! Raw %K[i] = (close[i] - lowest_low) / (highest_high - lowest_low) * 100 over
//! the trailing `k_period` window; a flat window (max == min) reads 100.
//! %K = SMA(raw %K, k_smooth); %D = SMA(%K, d_smooth).
//! Needs k_period + k_smooth + d_smooth - 2 candles.

use serde::{Deserialize, Serialize};

use super::sma::trailing_sma;

/// Latest smoothed %K and %D pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Latest (%K, %D), or `None` when history is too short or a period is zero.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> Option<Stochastic> {
    if k_period == 0 || k_smooth == 0 || d_smooth == 0 {
        return None;
    }
    if highs.len() != closes.len() || lows.len() != closes.len() {
        return None;
    }
    if closes.len() < k_period + k_smooth + d_smooth - 2 {
        return None;
    }

    let raw_k: Vec<f64> = (k_period - 1..closes.len())
        .map(|i| {
            let window = i + 1 - k_period..=i;
            let highest = highs[window.clone()]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let lowest = lows[window].iter().copied().fold(f64::INFINITY, f64::min);
            if highest == lowest {
                100.0
            } else {
                (closes[i] - lowest) / (highest - lowest) * 100.0
            }
        })
        .collect();

    let smoothed_k = trailing_sma(&raw_k, k_smooth);
    let d_values = trailing_sma(&smoothed_k, d_smooth);

    Some(Stochastic {
        k: *smoothed_k.last()?,
        d: *d_values.last()?,
    })
}
