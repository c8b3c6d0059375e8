//! Alert composition.
//!
//! Combines one symbol's indicator readings into alert events. RSI and EMA
//! proximity are independent; the stochastic alerts follow the configured
//! interaction method:
//!
//! - **Method 1**: overbought if %K or %D is above the upper threshold, oversold
//!   if either is below the lower one. Overbought wins when both hold.
//! - **Method 2**: the stochastic condition must agree with the price's side of
//!   the long EMA. Disagreeing signals are reported as filtered, not alerted.
//!   Without a long EMA the cycle falls back to method 1.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::Stochastic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    RsiOverbought,
    RsiOversold,
    StochOverbought,
    StochOversold,
    StochOversoldAboveEma,
    StochOverboughtBelowEma,
    EmaProximity,
}

impl AlertKind {
    pub fn severity(self) -> Severity {
        match self {
            AlertKind::RsiOverbought
            | AlertKind::StochOverbought
            | AlertKind::StochOverboughtBelowEma => Severity::Danger,
            AlertKind::RsiOversold
            | AlertKind::StochOversold
            | AlertKind::StochOversoldAboveEma => Severity::Success,
            AlertKind::EmaProximity => Severity::Warning,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertKind::RsiOverbought => "RSI_OVERBOUGHT",
            AlertKind::RsiOversold => "RSI_OVERSOLD",
            AlertKind::StochOverbought => "STOCH_OVERBOUGHT",
            AlertKind::StochOversold => "STOCH_OVERSOLD",
            AlertKind::StochOversoldAboveEma => "STOCH_OVERSOLD_ABOVE_EMA",
            AlertKind::StochOverboughtBelowEma => "STOCH_OVERBOUGHT_BELOW_EMA",
            AlertKind::EmaProximity => "EMA_PROXIMITY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Success,
    Warning,
}

/// One alert for one symbol in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Indicator reading that triggered the alert.
    pub value: f64,
    /// Human-readable condition, e.g. `STOCH OVERSOLD + Above EMA(200)`.
    pub label: String,
}

/// Stochastic/EMA interaction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StochAlertMethod {
    /// Stochastic alerts fire on their own.
    #[default]
    Independent,
    /// Stochastic alerts are gated by the long EMA.
    EmaGated,
}

impl TryFrom<u8> for StochAlertMethod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StochAlertMethod::Independent),
            2 => Ok(StochAlertMethod::EmaGated),
            other => Err(format!("unknown stochastic alert method {other} (expected 1 or 2)")),
        }
    }
}

impl From<StochAlertMethod> for u8 {
    fn from(method: StochAlertMethod) -> u8 {
        match method {
            StochAlertMethod::Independent => 1,
            StochAlertMethod::EmaGated => 2,
        }
    }
}

/// Thresholds and periods the composer needs. Periods only feed labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_method: StochAlertMethod,
    pub ema_long_period: usize,
    pub ema_short_period: usize,
    pub proximity_atr_ratio: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            stoch_overbought: 80.0,
            stoch_oversold: 20.0,
            stoch_method: StochAlertMethod::Independent,
            ema_long_period: 200,
            ema_short_period: 21,
            proximity_atr_ratio: 0.5,
        }
    }
}

/// Indicator readings for one symbol; `None` means insufficient history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub rsi: Option<f64>,
    pub ema_long: Option<f64>,
    pub ema_short: Option<f64>,
    pub atr: Option<f64>,
    pub stoch: Option<Stochastic>,
}

impl IndicatorSnapshot {
    /// `|price - ema_short| / atr`, defined only for a positive ATR.
    pub fn atr_ratio(&self) -> Option<f64> {
        let ema_short = self.ema_short?;
        match self.atr {
            Some(atr) if atr > 0.0 => Some((self.price - ema_short).abs() / atr),
            _ => None,
        }
    }
}

/// A method-2 stochastic condition that the EMA gate suppressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredSignal {
    pub symbol: String,
    pub message: String,
}

/// Everything the composer decided for one symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    pub alerts: Vec<AlertEvent>,
    pub filtered: Vec<FilteredSignal>,
    /// Method 2 was requested but the long EMA was missing.
    pub method2_fallback: bool,
}

/// Compose the alerts for one symbol.
pub fn compose(
    symbol: &str,
    snapshot: &IndicatorSnapshot,
    thresholds: &AlertThresholds,
) -> Composition {
    let mut out = Composition::default();
    let alert = |kind: AlertKind, value: f64, label: String| AlertEvent {
        symbol: symbol.to_string(),
        kind,
        severity: kind.severity(),
        value,
        label,
    };

    if let Some(rsi) = snapshot.rsi {
        if rsi > thresholds.rsi_overbought {
            out.alerts
                .push(alert(AlertKind::RsiOverbought, rsi, "RSI OVERBOUGHT".into()));
        } else if rsi < thresholds.rsi_oversold {
            out.alerts
                .push(alert(AlertKind::RsiOversold, rsi, "RSI OVERSOLD".into()));
        }
    }

    if let Some(ratio) = snapshot.atr_ratio() {
        if ratio <= thresholds.proximity_atr_ratio {
            out.alerts.push(alert(
                AlertKind::EmaProximity,
                ratio,
                format!("EMA({}) Proximity", thresholds.ema_short_period),
            ));
        }
    }

    let Some(stoch) = snapshot.stoch else {
        return out;
    };
    let overbought = stoch.k > thresholds.stoch_overbought || stoch.d > thresholds.stoch_overbought;
    let oversold = stoch.k < thresholds.stoch_oversold || stoch.d < thresholds.stoch_oversold;

    let ema_long = match (thresholds.stoch_method, snapshot.ema_long) {
        (StochAlertMethod::Independent, _) => None,
        (StochAlertMethod::EmaGated, None) => {
            out.method2_fallback = true;
            None
        }
        (StochAlertMethod::EmaGated, Some(ema)) => Some(ema),
    };

    match ema_long {
        None => {
            if overbought {
                out.alerts.push(alert(
                    AlertKind::StochOverbought,
                    stoch.k,
                    "STOCH OVERBOUGHT".into(),
                ));
            } else if oversold {
                out.alerts.push(alert(
                    AlertKind::StochOversold,
                    stoch.d,
                    "STOCH OVERSOLD".into(),
                ));
            }
        }
        Some(ema) => {
            let period = thresholds.ema_long_period;
            if oversold {
                if snapshot.price > ema {
                    out.alerts.push(alert(
                        AlertKind::StochOversoldAboveEma,
                        stoch.d,
                        format!("STOCH OVERSOLD + Above EMA({period})"),
                    ));
                } else {
                    out.filtered.push(FilteredSignal {
                        symbol: symbol.to_string(),
                        message: format!("Oversold but below EMA({period})"),
                    });
                }
            }
            if overbought {
                if snapshot.price < ema {
                    out.alerts.push(alert(
                        AlertKind::StochOverboughtBelowEma,
                        stoch.d,
                        format!("STOCH OVERBOUGHT + Below EMA({period})"),
                    ));
                } else {
                    out.filtered.push(FilteredSignal {
                        symbol: symbol.to_string(),
                        message: format!("Overbought but above EMA({period})"),
                    });
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(c: &Composition) -> Vec<AlertKind> {
        c.alerts.iter().map(|a| a.kind).collect()
    }

    fn gated() -> AlertThresholds {
        AlertThresholds {
            stoch_method: StochAlertMethod::EmaGated,
            ..AlertThresholds::default()
        }
    }

    #[test]
    fn rsi_overbought_and_oversold() {
        let t = AlertThresholds::default();
        let hot = IndicatorSnapshot {
            price: 10.0,
            rsi: Some(75.0),
            ..Default::default()
        };
        let c = compose("BTC_USDT", &hot, &t);
        assert_eq!(kinds(&c), vec![AlertKind::RsiOverbought]);
        assert_eq!(c.alerts[0].severity, Severity::Danger);
        assert_eq!(c.alerts[0].value, 75.0);

        let cold = IndicatorSnapshot {
            rsi: Some(25.0),
            ..hot
        };
        assert_eq!(kinds(&compose("BTC_USDT", &cold, &t)), vec![AlertKind::RsiOversold]);

        let neutral = IndicatorSnapshot {
            rsi: Some(70.0),
            ..hot
        };
        assert!(compose("BTC_USDT", &neutral, &t).alerts.is_empty());
    }

    #[test]
    fn ema_proximity_requires_positive_atr() {
        let t = AlertThresholds::default();
        let near = IndicatorSnapshot {
            price: 100.0,
            ema_short: Some(100.4),
            atr: Some(1.0),
            ..Default::default()
        };
        let c = compose("ETH_USDT", &near, &t);
        assert_eq!(kinds(&c), vec![AlertKind::EmaProximity]);
        assert_eq!(c.alerts[0].label, "EMA(21) Proximity");
        assert_eq!(c.alerts[0].severity, Severity::Warning);

        let zero_atr = IndicatorSnapshot {
            atr: Some(0.0),
            ..near
        };
        assert!(compose("ETH_USDT", &zero_atr, &t).alerts.is_empty());

        let far = IndicatorSnapshot {
            ema_short: Some(101.0),
            ..near
        };
        assert!(compose("ETH_USDT", &far, &t).alerts.is_empty());
    }

    #[test]
    fn method1_overbought_wins() {
        // %K above 80 and %D below 20 at once
        let snap = IndicatorSnapshot {
            price: 50.0,
            stoch: Some(Stochastic { k: 85.0, d: 15.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &AlertThresholds::default());
        assert_eq!(kinds(&c), vec![AlertKind::StochOverbought]);
        assert_eq!(c.alerts[0].value, 85.0);
    }

    #[test]
    fn method1_oversold_reports_d() {
        let snap = IndicatorSnapshot {
            price: 50.0,
            stoch: Some(Stochastic { k: 25.0, d: 12.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &AlertThresholds::default());
        assert_eq!(kinds(&c), vec![AlertKind::StochOversold]);
        assert_eq!(c.alerts[0].value, 12.0);
    }

    #[test]
    fn method2_oversold_above_ema_alerts() {
        let snap = IndicatorSnapshot {
            price: 110.0,
            ema_long: Some(100.0),
            stoch: Some(Stochastic { k: 10.0, d: 15.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert_eq!(kinds(&c), vec![AlertKind::StochOversoldAboveEma]);
        assert_eq!(c.alerts[0].label, "STOCH OVERSOLD + Above EMA(200)");
        assert!(c.filtered.is_empty());
        assert!(!c.method2_fallback);
    }

    #[test]
    fn method2_oversold_below_ema_is_filtered() {
        let snap = IndicatorSnapshot {
            price: 90.0,
            ema_long: Some(100.0),
            stoch: Some(Stochastic { k: 10.0, d: 15.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert!(c.alerts.is_empty());
        assert_eq!(c.filtered.len(), 1);
        assert_eq!(c.filtered[0].message, "Oversold but below EMA(200)");
    }

    #[test]
    fn method2_price_equal_to_ema_filters_oversold() {
        let snap = IndicatorSnapshot {
            price: 100.0,
            ema_long: Some(100.0),
            stoch: Some(Stochastic { k: 10.0, d: 10.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert!(c.alerts.is_empty());
        assert_eq!(c.filtered.len(), 1);
    }

    #[test]
    fn method2_overbought_below_ema_alerts() {
        let snap = IndicatorSnapshot {
            price: 90.0,
            ema_long: Some(100.0),
            stoch: Some(Stochastic { k: 90.0, d: 85.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert_eq!(kinds(&c), vec![AlertKind::StochOverboughtBelowEma]);
        assert_eq!(c.alerts[0].value, 85.0);
    }

    #[test]
    fn method2_branches_are_independent() {
        // %K overbought and %D oversold, price above EMA: oversold alerts,
        // overbought is filtered.
        let snap = IndicatorSnapshot {
            price: 110.0,
            ema_long: Some(100.0),
            stoch: Some(Stochastic { k: 85.0, d: 15.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert_eq!(kinds(&c), vec![AlertKind::StochOversoldAboveEma]);
        assert_eq!(c.filtered.len(), 1);
        assert_eq!(c.filtered[0].message, "Overbought but above EMA(200)");
    }

    #[test]
    fn method2_without_long_ema_falls_back() {
        let snap = IndicatorSnapshot {
            price: 110.0,
            ema_long: None,
            stoch: Some(Stochastic { k: 10.0, d: 15.0 }),
            ..Default::default()
        };
        let c = compose("X", &snap, &gated());
        assert!(c.method2_fallback);
        assert_eq!(kinds(&c), vec![AlertKind::StochOversold]);
    }

    #[test]
    fn method_round_trips_as_integer() {
        assert_eq!(serde_json::to_string(&StochAlertMethod::EmaGated).unwrap(), "2");
        let m: StochAlertMethod = serde_json::from_str("1").unwrap();
        assert_eq!(m, StochAlertMethod::Independent);
        assert!(serde_json::from_str::<StochAlertMethod>("3").is_err());
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&AlertKind::StochOversoldAboveEma).unwrap(),
            "\"STOCH_OVERSOLD_ABOVE_EMA\""
        );
        assert_eq!(AlertKind::EmaProximity.to_string(), "EMA_PROXIMITY");
    }
}
