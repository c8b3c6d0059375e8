//! Shared fakes for runner integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use screener_core::config::ScreenerConfig;
use screener_core::data::{CandleProvider, DataError};
use screener_core::domain::{Candle, Timeframe};
use screener_runner::{MissingConfig, SchedulerOptions};

/// Deterministic oscillating candles; every symbol gets the same shape.
pub fn candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let c = 100.0 + (i as f64 * 0.25).sin() * 8.0 + i as f64 * 0.02;
            Candle::new(c + 1.2, c - 1.2, c)
        })
        .collect()
}

/// Serves `count` candles for any symbol until told to fail.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pub failing: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
    /// Time each fetch takes.
    pub delay: Duration,
}

impl FakeProvider {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl CandleProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DataError::retrieval(symbol, "exchange unreachable"));
        }
        Ok(candles(count))
    }
}

pub fn fast_options(on_missing_config: MissingConfig) -> SchedulerOptions {
    SchedulerOptions {
        pacing: Duration::ZERO,
        tick: Duration::from_millis(1),
        config_retry: Duration::from_millis(5),
        on_missing_config,
    }
}

pub fn config(assets: &[&str]) -> ScreenerConfig {
    ScreenerConfig {
        timeframe: Timeframe(1),
        assets: assets.iter().map(|s| s.to_string()).collect(),
        ..ScreenerConfig::default()
    }
}
