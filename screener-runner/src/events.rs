//! Events a scheduler emits while it runs.
//!
//! Serialized adjacently tagged, `{"type": "...", "data": {...}}`, which is the
//! shape stream consumers read.

use serde::{Deserialize, Serialize};

use screener_core::analysis::AssetReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ScreenerEvent {
    Status {
        running: bool,
    },
    Log {
        message: String,
        level: LogLevel,
    },
    AssetUpdate(Box<AssetReport>),
    CycleComplete {
        count: usize,
        total: usize,
        /// Local wall-clock time, `HH:MM:SS`.
        timestamp: String,
    },
    Countdown {
        seconds_left: u64,
    },
    Reset {},
    Heartbeat {},
}

impl ScreenerEvent {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        ScreenerEvent::Log {
            message: message.into(),
            level,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScreenerEvent::Status { .. } => "status",
            ScreenerEvent::Log { .. } => "log",
            ScreenerEvent::AssetUpdate(_) => "asset_update",
            ScreenerEvent::CycleComplete { .. } => "cycle_complete",
            ScreenerEvent::Countdown { .. } => "countdown",
            ScreenerEvent::Reset {} => "reset",
            ScreenerEvent::Heartbeat {} => "heartbeat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let event = ScreenerEvent::log(LogLevel::Success, "Screener started.");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "log", "data": {"message": "Screener started.", "level": "success"}})
        );

        assert_eq!(
            serde_json::to_value(ScreenerEvent::Heartbeat {}).unwrap(),
            json!({"type": "heartbeat", "data": {}})
        );
        assert_eq!(
            serde_json::to_value(ScreenerEvent::Countdown { seconds_left: 5 }).unwrap(),
            json!({"type": "countdown", "data": {"seconds_left": 5}})
        );
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let events = [
            ScreenerEvent::Status { running: true },
            ScreenerEvent::Reset {},
            ScreenerEvent::CycleComplete {
                count: 1,
                total: 2,
                timestamp: "12:00:00".into(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }
}
