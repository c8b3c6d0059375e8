//! Regression-based trend, volatility regime and confidence classification.
//!
//! The slope of a least-squares fit is divided by the current ATR so that one
//! set of thresholds works across assets and timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::regression::linear_regression;
use crate::indicators::{atr_series, mean};

/// ATR values below this are treated as degenerate volatility.
pub const MIN_ATR: f64 = 1e-12;

/// Parameters for one classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    pub length: usize,
    pub atr_length: usize,
    pub r2_threshold: f64,
    pub slope_threshold: f64,
    pub sideways_slope_threshold: f64,
    pub volatility_ma_length: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            length: 200,
            atr_length: 14,
            r2_threshold: 0.3,
            slope_threshold: 0.5,
            sideways_slope_threshold: 0.2,
            volatility_ma_length: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Uptrend => "Uptrend",
            Trend::Downtrend => "Downtrend",
            Trend::Sideways => "Sideways",
        };
        f.write_str(s)
    }
}

/// Current ATR compared with its own recent average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRegime {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "LOW")]
    Low,
    /// Not enough ATR history for the moving average.
    #[serde(rename = "N/A")]
    Unknown,
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolatilityRegime::High => "HIGH",
            VolatilityRegime::Low => "LOW",
            VolatilityRegime::Unknown => "N/A",
        };
        f.write_str(s)
    }
}

/// Output of one classification pass. Produced fresh each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub slope: f64,
    pub normalized_slope: f64,
    pub r_squared: f64,
    pub atr: f64,
    pub volatility_regime: VolatilityRegime,
    pub trend: Trend,
    /// `r_squared * min(|normalized_slope|, 1)`, clamped to [0, 1].
    pub confidence: f64,
}

/// Classify the trend of a series.
///
/// `None` when there are fewer than `config.length` closes, the ATR series
/// cannot be formed, or the current ATR is degenerate (below [`MIN_ATR`]).
pub fn classify_trend(
    closes: &[f64],
    highs: &[f64],
    lows: &[f64],
    config: &TrendConfig,
) -> Option<TrendResult> {
    let fit = linear_regression(closes, config.length)?;

    let atrs = atr_series(highs, lows, closes, config.atr_length);
    let current_atr = *atrs.last()?;
    if current_atr < MIN_ATR {
        return None;
    }

    let normalized_slope = fit.slope / current_atr;
    let volatility_regime = volatility_regime(&atrs, config.volatility_ma_length);
    let trend = decide_trend(normalized_slope, fit.r_squared, config);
    let confidence = (fit.r_squared * normalized_slope.abs().min(1.0)).clamp(0.0, 1.0);

    Some(TrendResult {
        slope: fit.slope,
        normalized_slope,
        r_squared: fit.r_squared,
        atr: current_atr,
        volatility_regime,
        trend,
        confidence,
    })
}

fn volatility_regime(atrs: &[f64], ma_length: usize) -> VolatilityRegime {
    if ma_length == 0 || atrs.len() < ma_length {
        return VolatilityRegime::Unknown;
    }
    let current = atrs[atrs.len() - 1];
    match mean(&atrs[atrs.len() - ma_length..]) {
        Some(avg) if current > avg => VolatilityRegime::High,
        Some(_) => VolatilityRegime::Low,
        None => VolatilityRegime::Unknown,
    }
}

/// Priority order matters: the sideways test runs first, and anything that
/// passes it without clearing the trend threshold also ends up sideways.
fn decide_trend(normalized_slope: f64, r_squared: f64, config: &TrendConfig) -> Trend {
    if normalized_slope.abs() < config.sideways_slope_threshold
        || r_squared < config.r2_threshold
    {
        Trend::Sideways
    } else if normalized_slope > config.slope_threshold && r_squared >= config.r2_threshold {
        Trend::Uptrend
    } else if normalized_slope < -config.slope_threshold && r_squared >= config.r2_threshold {
        Trend::Downtrend
    } else {
        Trend::Sideways
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn small_config() -> TrendConfig {
        TrendConfig {
            length: 50,
            atr_length: 14,
            volatility_ma_length: 20,
            ..TrendConfig::default()
        }
    }

    /// close[i] = a + b*i with a constant high-low spread of 2.
    fn linear(n: usize, a: f64, b: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let closes: Vec<f64> = (0..n).map(|i| a + b * i as f64).collect();
        let highs = closes.iter().map(|c| c + 1.0).collect();
        let lows = closes.iter().map(|c| c - 1.0).collect();
        (closes, highs, lows)
    }

    #[test]
    fn linear_uptrend() {
        let (c, h, l) = linear(80, 100.0, 1.5);
        let result = classify_trend(&c, &h, &l, &small_config()).unwrap();
        assert_approx(result.r_squared, 1.0, 1e-9);
        assert_approx(result.slope, 1.5, 1e-9);
        assert_eq!(result.trend, Trend::Uptrend);
        assert!(result.confidence > 0.0);
        // Constant spread: TR = max(2, |h - c_prev|, ...) = 2.5 each bar
        assert_approx(result.atr, 2.5, 1e-9);
        assert_approx(result.normalized_slope, 0.6, 1e-9);
    }

    #[test]
    fn linear_downtrend() {
        let (c, h, l) = linear(80, 500.0, -3.0);
        let result = classify_trend(&c, &h, &l, &small_config()).unwrap();
        assert_eq!(result.trend, Trend::Downtrend);
        // TR = |low - prev_close| = 4 → ns = -0.75
        assert_approx(result.normalized_slope, -0.75, 1e-9);
        assert_approx(result.confidence, 0.75, 1e-9);
    }

    #[test]
    fn constant_closes_with_spread_are_sideways() {
        let c = vec![100.0; 80];
        let h = vec![101.0; 80];
        let l = vec![99.0; 80];
        let result = classify_trend(&c, &h, &l, &small_config()).unwrap();
        assert_eq!(result.r_squared, 0.0);
        assert_eq!(result.trend, Trend::Sideways);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn flat_candles_are_undefined() {
        let flat = vec![100.0; 80];
        assert_eq!(classify_trend(&flat, &flat, &flat, &small_config()), None);
    }

    #[test]
    fn too_short_is_undefined() {
        let (c, h, l) = linear(49, 100.0, 1.0);
        assert_eq!(classify_trend(&c, &h, &l, &small_config()), None);
    }

    #[test]
    fn residual_band_is_sideways() {
        // |ns| between sideways (0.2) and slope (0.5) thresholds with a perfect fit
        let (c, h, l) = linear(80, 100.0, 0.75); // ATR = 2 → ns = 0.375
        let result = classify_trend(&c, &h, &l, &small_config()).unwrap();
        assert!(result.normalized_slope > 0.2 && result.normalized_slope < 0.5);
        assert!(result.r_squared >= 0.3);
        assert_eq!(result.trend, Trend::Sideways);
    }

    #[test]
    fn volatility_regime_reads_expansion() {
        let (c, mut h, mut l) = linear(80, 100.0, 1.0);
        // Widen the last candle's range → current ATR above its average
        let last = c.len() - 1;
        h[last] += 20.0;
        l[last] -= 20.0;
        let result = classify_trend(&c, &h, &l, &small_config()).unwrap();
        assert_eq!(result.volatility_regime, VolatilityRegime::High);
    }

    #[test]
    fn volatility_regime_unknown_without_history() {
        let config = TrendConfig {
            length: 20,
            atr_length: 14,
            volatility_ma_length: 50,
            ..TrendConfig::default()
        };
        let (c, h, l) = linear(30, 100.0, 1.0);
        let result = classify_trend(&c, &h, &l, &config).unwrap();
        assert_eq!(result.volatility_regime, VolatilityRegime::Unknown);
    }

    #[test]
    fn regime_serializes_with_display_labels() {
        assert_eq!(
            serde_json::to_string(&VolatilityRegime::Unknown).unwrap(),
            "\"N/A\""
        );
        assert_eq!(serde_json::to_string(&Trend::Uptrend).unwrap(), "\"Uptrend\"");
    }
}
