//! Candle timeframe in minutes, its exchange interval label, and boundary math.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Candle granularity, expressed in minutes (the unit the configuration uses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe(pub u32);

/// Supported exchange intervals: (minutes, label, seconds).
const INTERVALS: [(u32, &str, u64); 10] = [
    (1, "Min1", 60),
    (5, "Min5", 300),
    (15, "Min15", 900),
    (30, "Min30", 1_800),
    (60, "Min60", 3_600),
    (240, "Hour4", 14_400),
    (480, "Hour8", 28_800),
    (1_440, "Day1", 86_400),
    (10_080, "Week1", 604_800),
    (43_200, "Month1", 2_592_000),
];

/// Interval used for retrieval when the configured minutes have no exchange label.
const FALLBACK_INTERVAL: (&str, u64) = ("Min15", 900);

impl Timeframe {
    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Exchange interval label (e.g. `Min15`, `Hour4`). Unknown minute counts map to `Min15`.
    pub fn label(self) -> &'static str {
        INTERVALS
            .iter()
            .find(|(m, _, _)| *m == self.0)
            .map(|(_, label, _)| *label)
            .unwrap_or(FALLBACK_INTERVAL.0)
    }

    /// Whether the exchange has a native interval for this timeframe.
    pub fn is_supported(self) -> bool {
        INTERVALS.iter().any(|(m, _, _)| *m == self.0)
    }

    /// Length in seconds of the interval actually requested from the exchange.
    pub fn label_secs(self) -> u64 {
        INTERVALS
            .iter()
            .find(|(m, _, _)| *m == self.0)
            .map(|(_, _, secs)| *secs)
            .unwrap_or(FALLBACK_INTERVAL.1)
    }

    /// Length in seconds of one candle of the configured timeframe.
    pub fn interval_secs(self) -> u64 {
        u64::from(self.0) * 60
    }

    /// Unix timestamp of the next candle close strictly after `now_secs`.
    ///
    /// Returns `None` for a zero-length timeframe.
    pub fn next_boundary(self, now_secs: u64) -> Option<u64> {
        let interval = self.interval_secs();
        if interval == 0 {
            return None;
        }
        Some((now_secs / interval + 1) * interval)
    }

    /// Whole seconds from `now_secs` until the next candle close (always >= 1).
    pub fn secs_until_next_boundary(self, now_secs: u64) -> Option<u64> {
        self.next_boundary(now_secs).map(|next| next - now_secs)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<u32> for Timeframe {
    fn from(minutes: u32) -> Self {
        Timeframe(minutes)
    }
}
