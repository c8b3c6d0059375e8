//! Single-process rendering: events become log records; RSI and stochastic
//! alerts also go to the notifier.

use tracing::{debug, error, info, warn};

use screener_core::alerts::AlertKind;
use screener_core::analysis::AssetReport;

use crate::events::{LogLevel, ScreenerEvent};
use crate::notifier::Notifier;
use crate::sink::EventSink;

pub struct ConsoleSink {
    notifier: Box<dyn Notifier>,
}

impl ConsoleSink {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self { notifier }
    }

    fn report(&self, report: &AssetReport) {
        let symbol = report.symbol.as_str();
        info!(
            %symbol,
            price = report.price,
            rsi = ?report.rsi,
            stoch_k = ?report.stoch_k,
            stoch_d = ?report.stoch_d,
            "asset updated"
        );
        if let (Some(ema), Some(position)) = (report.ema_long, report.ema_long_position) {
            info!(%symbol, ema_long = ema, "price is {position} the long EMA");
        }
        if let Some(ratio) = report.atr_ratio {
            debug!(%symbol, ema_short = ?report.ema_short, atr = ?report.atr, ratio, "short EMA distance");
        }
        if let Some(note) = &report.ema_proximity {
            info!(%symbol, "{note}");
        }
        for trend in report.trend.iter().chain(report.higher_trend.iter()) {
            info!(
                %symbol,
                timeframe = %trend.label,
                trend = %trend.trend,
                confidence = trend.confidence,
                r_squared = trend.r_squared,
                volatility = %trend.volatility,
                "trend"
            );
        }
        if let Some(note) = &report.higher_note {
            info!(%symbol, "higher timeframe trend: {note}");
        }
        for note in &report.notes {
            debug!(%symbol, "{note}");
        }
        if report.method2_fallback {
            info!(%symbol, "stochastic method 2 needs the long EMA, falling back to method 1");
        }
        for filtered in &report.filtered {
            info!(%symbol, "{} - filtered", filtered.message);
        }

        for alert in &report.alerts {
            warn!(%symbol, kind = %alert.kind, value = alert.value, "[ALERT] {}", alert.label);
            // Proximity carries a distance/ATR ratio, not an oscillator reading.
            if alert.kind == AlertKind::EmaProximity {
                continue;
            }
            if let Err(e) = self.notifier.notify(symbol, alert.value, &alert.label) {
                error!(%symbol, error = %e, "failed to send notification");
            }
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: ScreenerEvent) {
        match event {
            ScreenerEvent::Log { message, level } => match level {
                LogLevel::Info | LogLevel::Success => info!("{message}"),
                LogLevel::Warning => warn!("{message}"),
                LogLevel::Error => error!("{message}"),
            },
            ScreenerEvent::AssetUpdate(report) => self.report(&report),
            ScreenerEvent::CycleComplete {
                count,
                total,
                timestamp,
            } => info!(%timestamp, "Refreshed {count}/{total} assets."),
            ScreenerEvent::Countdown { seconds_left } => {
                debug!("Next check in {seconds_left}s...")
            }
            ScreenerEvent::Status { running } => debug!(running, "status"),
            ScreenerEvent::Reset {} | ScreenerEvent::Heartbeat {} => {}
        }
    }
}
