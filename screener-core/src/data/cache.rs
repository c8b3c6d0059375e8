//! In-memory series cache.
//!
//! Holds the latest candle series per symbol plus the timeframe the series
//! were fetched at. The timeframe tag lives beside the symbol map rather than
//! inside it, and a mismatch on lookup wipes every entry: series of different
//! timeframes are never mixed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::domain::{CandleSeries, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub series: CandleSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesCache {
    timeframe: Option<Timeframe>,
    #[serde(default)]
    symbols: BTreeMap<String, CacheEntry>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeframe the cached series belong to; `None` for a fresh cache.
    pub fn timeframe(&self) -> Option<Timeframe> {
        self.timeframe
    }

    /// Retag the cache for `timeframe`, discarding every entry if the tag
    /// differs. Returns `true` when entries were discarded.
    pub fn ensure_timeframe(&mut self, timeframe: Timeframe) -> bool {
        if self.timeframe == Some(timeframe) {
            return false;
        }
        let wiped = !self.symbols.is_empty();
        if let Some(previous) = self.timeframe {
            info!(from = %previous, to = %timeframe, "timeframe changed, wiping cache");
        }
        self.symbols.clear();
        self.timeframe = Some(timeframe);
        wiped
    }

    /// Replace a symbol's entry with a freshly fetched series.
    pub fn update(&mut self, symbol: &str, series: CandleSeries, now: DateTime<Utc>) {
        self.symbols.insert(
            symbol.to_string(),
            CacheEntry {
                last_updated: now,
                series,
            },
        );
    }

    pub fn get(&self, symbol: &str) -> Option<&CacheEntry> {
        self.symbols.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.timeframe = None;
    }
}
