//! Per-symbol analysis: indicators, trend on both timeframes, alerts.
//!
//! [`analyze`] is the single place where a cached series turns into an
//! [`AssetReport`]. Both the console and the session queues consume the same
//! report.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::alerts::{compose, AlertEvent, FilteredSignal, IndicatorSnapshot};
use crate::config::ScreenerConfig;
use crate::data::DataError;
use crate::domain::CandleSeries;
use crate::indicators::{atr, ema, rsi, stochastic};
use crate::trend::{classify_trend, Trend, TrendResult, VolatilityRegime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricePosition {
    Above,
    Below,
}

impl PricePosition {
    /// Strictly greater is above; equal counts as below.
    pub fn of(price: f64, reference: f64) -> Self {
        if price > reference {
            PricePosition::Above
        } else {
            PricePosition::Below
        }
    }
}

impl fmt::Display for PricePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PricePosition::Above => "ABOVE",
            PricePosition::Below => "BELOW",
        })
    }
}

/// Trend classification as shown to a user, tagged with its interval label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub label: String,
    pub trend: Trend,
    pub confidence: f64,
    pub r_squared: f64,
    pub normalized_slope: f64,
    pub volatility: VolatilityRegime,
}

impl TrendSummary {
    fn new(label: &str, result: &TrendResult) -> Self {
        Self {
            label: label.to_string(),
            trend: result.trend,
            confidence: result.confidence,
            r_squared: result.r_squared,
            normalized_slope: result.normalized_slope,
            volatility: result.volatility_regime,
        }
    }
}

/// Everything computed for one symbol in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    pub symbol: String,
    pub price: f64,
    pub rsi: Option<f64>,
    pub ema_long: Option<f64>,
    pub ema_long_position: Option<PricePosition>,
    pub ema_short: Option<f64>,
    pub atr: Option<f64>,
    pub atr_ratio: Option<f64>,
    /// Set when the price sits within the proximity band of the short EMA.
    pub ema_proximity: Option<String>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub trend: Option<TrendSummary>,
    pub higher_trend: Option<TrendSummary>,
    /// Why the higher-timeframe trend is missing, when it was requested.
    pub higher_note: Option<String>,
    pub alerts: Vec<AlertEvent>,
    pub filtered: Vec<FilteredSignal>,
    pub method2_fallback: bool,
    /// One line per indicator that lacked history.
    pub notes: Vec<String>,
}

/// Outcome of the higher-timeframe retrieval handed to [`analyze`].
#[derive(Debug, Clone, Copy)]
pub enum HigherTimeframe<'a> {
    /// Same as the base timeframe; nothing was fetched.
    NotRequested,
    Series(&'a CandleSeries),
    Failed(&'a DataError),
}

/// Analyze one symbol. `None` for an empty series.
pub fn analyze(
    symbol: &str,
    series: &CandleSeries,
    higher: HigherTimeframe<'_>,
    config: &ScreenerConfig,
) -> Option<AssetReport> {
    let price = series.last_close()?;
    let (highs, lows, closes) = (series.highs(), series.lows(), series.closes());

    let snapshot = IndicatorSnapshot {
        price,
        rsi: rsi(closes, config.rsi_period),
        ema_long: ema(closes, config.ema_long_period),
        ema_short: ema(closes, config.ema_short_period),
        atr: atr(highs, lows, closes, config.atr_period),
        stoch: stochastic(
            highs,
            lows,
            closes,
            config.stoch_k_period,
            config.stoch_k_smooth,
            config.stoch_d_smooth,
        ),
    };
    let composition = compose(symbol, &snapshot, &config.alert_thresholds());

    let mut notes = Vec::new();
    if snapshot.rsi.is_none() {
        notes.push(format!("RSI({}): Not enough data", config.rsi_period));
    }
    if snapshot.ema_long.is_none() {
        notes.push(format!("Not old enough for EMA({})", config.ema_long_period));
    }
    if snapshot.ema_short.is_none() {
        notes.push(format!("Not old enough for EMA({})", config.ema_short_period));
    } else if snapshot.atr_ratio().is_none() {
        notes.push(format!("ATR({}): not enough data", config.atr_period));
    }
    if snapshot.stoch.is_none() {
        notes.push("Stochastic: Not enough data".to_string());
    }

    let trend_config = config.trend_config();
    let base_label = config.timeframe.label();
    let trend = classify_trend(closes, highs, lows, &trend_config)
        .map(|result| TrendSummary::new(base_label, &result));
    if trend.is_none() {
        notes.push(format!("LR({base_label}): Not enough data"));
    }

    let higher_label = config.lr_higher_timeframe.label();
    let (higher_trend, higher_note) = match higher {
        HigherTimeframe::NotRequested => (None, None),
        HigherTimeframe::Series(htf) => {
            match classify_trend(htf.closes(), htf.highs(), htf.lows(), &trend_config) {
                Some(result) => (Some(TrendSummary::new(higher_label, &result)), None),
                None => (None, Some("Not enough data".to_string())),
            }
        }
        HigherTimeframe::Failed(err) => {
            let note = match err {
                DataError::ParseFailure(_) | DataError::InvalidSeries(_) => "Failed to parse",
                _ => "Failed to fetch",
            };
            (None, Some(note.to_string()))
        }
    };

    let atr_ratio = snapshot.atr_ratio();
    let ema_proximity = match (snapshot.ema_short, atr_ratio) {
        (Some(ema_short), Some(ratio)) if ratio <= config.ema_proximity_atr_ratio => {
            let side = match PricePosition::of(price, ema_short) {
                PricePosition::Above => "above",
                PricePosition::Below => "below",
            };
            Some(format!("Price is {side} EMA({})", config.ema_short_period))
        }
        _ => None,
    };

    Some(AssetReport {
        symbol: symbol.to_string(),
        price,
        rsi: snapshot.rsi,
        ema_long: snapshot.ema_long,
        ema_long_position: snapshot.ema_long.map(|ema| PricePosition::of(price, ema)),
        ema_short: snapshot.ema_short,
        atr: snapshot.atr,
        atr_ratio,
        ema_proximity,
        stoch_k: snapshot.stoch.map(|s| s.k),
        stoch_d: snapshot.stoch.map(|s| s.d),
        trend,
        higher_trend,
        higher_note,
        alerts: composition.alerts,
        filtered: composition.filtered,
        method2_fallback: composition.method2_fallback,
        notes,
    })
}
