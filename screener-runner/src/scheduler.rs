//! Refresh scheduler.
//!
//! One scheduler owns one series cache and runs cycles until its [`RunSignal`]
//! is cleared. A cycle:
//!
//! 1. load the configuration (unavailable: retry after a pause, or stop)
//! 2. wipe the cache if the timeframe changed
//! 3. per symbol, in configured order: pacing delay, fetch, update the cache,
//!    analyze (on stale data if the fetch failed), emit the report
//! 4. persist the cache if anything was refreshed
//! 5. wait for the next candle boundary, emitting countdown events
//!
//! The stop flag is checked before each symbol and once per wait tick. An
//! in-flight fetch is never interrupted.

use chrono::{Local, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use screener_core::analysis::{analyze, AssetReport, HigherTimeframe};
use screener_core::config::{ConfigSource, ScreenerConfig};
use screener_core::data::{CacheStore, CandleProvider, DataError, SeriesCache};
use screener_core::domain::{CandleSeries, Timeframe};

use crate::events::{LogLevel, ScreenerEvent};
use crate::sink::EventSink;

/// Cooperative stop flag shared between a worker and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct RunSignal(Arc<AtomicBool>);

impl RunSignal {
    /// A signal that is already running.
    pub fn running() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What to do when the configuration cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingConfig {
    /// Pause for `config_retry`, then try again (single-process mode).
    Retry,
    /// Log and stop (session mode).
    Stop,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Delay before every exchange request.
    pub pacing: Duration,
    /// Granularity of the boundary wait; one countdown step per tick.
    pub tick: Duration,
    pub config_retry: Duration,
    pub on_missing_config: MissingConfig,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(150),
            tick: Duration::from_secs(1),
            config_retry: Duration::from_secs(60),
            on_missing_config: MissingConfig::Retry,
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    /// Symbols whose series were fetched successfully this cycle.
    pub refreshed: usize,
    pub total: usize,
    pub reports: Vec<AssetReport>,
    /// The stop flag was cleared part way through.
    pub interrupted: bool,
}

pub struct Scheduler {
    provider: Box<dyn CandleProvider>,
    config_source: Box<dyn ConfigSource>,
    store: Box<dyn CacheStore>,
    sink: Arc<dyn EventSink>,
    options: SchedulerOptions,
    cache: SeriesCache,
}

impl Scheduler {
    /// Build a scheduler; its cache starts from whatever `store` holds.
    pub fn new(
        provider: Box<dyn CandleProvider>,
        config_source: Box<dyn ConfigSource>,
        store: Box<dyn CacheStore>,
        sink: Arc<dyn EventSink>,
        options: SchedulerOptions,
    ) -> Self {
        let cache = store.load();
        Self {
            provider,
            config_source,
            store,
            sink,
            options,
            cache,
        }
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    fn emit(&self, event: ScreenerEvent) {
        self.sink.emit(event);
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(ScreenerEvent::log(level, message));
    }

    /// Run cycles until `signal` is cleared.
    pub fn run(&mut self, signal: &RunSignal) {
        self.emit(ScreenerEvent::Status { running: true });
        self.log(LogLevel::Success, "Screener started.");
        info!(provider = self.provider.name(), "scheduler started");

        while signal.is_running() {
            let config = match self.config_source.load() {
                Ok(config) => config,
                Err(e) => match self.options.on_missing_config {
                    MissingConfig::Retry => {
                        warn!(error = %e, "config missing or invalid");
                        let secs = self.options.config_retry.as_secs();
                        self.log(
                            LogLevel::Error,
                            format!("Config missing or invalid ({e}). Retrying in {secs}s..."),
                        );
                        self.sleep_interruptibly(self.options.config_retry, signal);
                        continue;
                    }
                    MissingConfig::Stop => {
                        warn!(error = %e, "no config, stopping");
                        self.log(LogLevel::Error, "No config received. Stopping.");
                        signal.stop();
                        break;
                    }
                },
            };

            let summary = self.run_cycle(&config, signal);
            if summary.interrupted || !self.wait_for_boundary(config.timeframe, signal) {
                break;
            }
            self.log(LogLevel::Info, "Checking for updates...");
        }

        self.emit(ScreenerEvent::Status { running: false });
        self.log(LogLevel::Warning, "Screener stopped.");
        info!("scheduler stopped");
    }

    /// One refresh cycle over every configured symbol.
    pub fn run_cycle(&mut self, config: &ScreenerConfig, signal: &RunSignal) -> CycleSummary {
        let mut summary = CycleSummary {
            total: config.assets.len(),
            ..CycleSummary::default()
        };

        if self.cache.ensure_timeframe(config.timeframe) {
            self.log(
                LogLevel::Info,
                format!("Timeframe changed to {}. Cache wiped.", config.timeframe),
            );
        }

        for symbol in &config.assets {
            if !signal.is_running() {
                summary.interrupted = true;
                return summary;
            }

            self.log(LogLevel::Info, format!("Fetching data for {symbol}..."));
            thread::sleep(self.options.pacing);

            match self.fetch_series(symbol, config.timeframe, config.candle_count) {
                Ok(series) => {
                    self.cache.update(symbol, series, Utc::now());
                    summary.refreshed += 1;
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "fetch failed");
                    let what = match e {
                        DataError::ParseFailure(_) | DataError::InvalidSeries(_) => "parse",
                        _ => "fetch",
                    };
                    self.log(LogLevel::Error, format!("{symbol}: Failed to {what} data."));
                    match self.cache.get(symbol) {
                        Some(entry) => self.log(
                            LogLevel::Warning,
                            format!(
                                "{symbol}: Using cached data from {}.",
                                entry.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
                            ),
                        ),
                        None => continue,
                    }
                }
            }

            let higher = if config.needs_higher_timeframe() {
                thread::sleep(self.options.pacing);
                Some(self.fetch_series(
                    symbol,
                    config.lr_higher_timeframe,
                    config.higher_timeframe_count(),
                ))
            } else {
                None
            };
            let higher = match &higher {
                None => HigherTimeframe::NotRequested,
                Some(Ok(series)) => HigherTimeframe::Series(series),
                Some(Err(e)) => {
                    warn!(%symbol, timeframe = %config.lr_higher_timeframe, error = %e, "higher timeframe fetch failed");
                    HigherTimeframe::Failed(e)
                }
            };

            let Some(entry) = self.cache.get(symbol) else {
                continue;
            };
            if let Some(report) = analyze(symbol, &entry.series, higher, config) {
                self.emit(ScreenerEvent::AssetUpdate(Box::new(report.clone())));
                summary.reports.push(report);
            }
        }

        if summary.refreshed > 0 {
            if let Err(e) = self.store.save(&self.cache) {
                warn!(error = %e, "failed to persist cache");
                self.log(LogLevel::Error, format!("Failed to save market data: {e}"));
            }
        }

        info!(refreshed = summary.refreshed, total = summary.total, "cycle complete");
        self.emit(ScreenerEvent::CycleComplete {
            count: summary.refreshed,
            total: summary.total,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        });
        summary
    }

    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, DataError> {
        let candles = self.provider.fetch(symbol, timeframe, count)?;
        if candles.is_empty() {
            return Err(DataError::ParseFailure(format!("no candles for {symbol}")));
        }
        Ok(CandleSeries::from_candles(&candles))
    }

    /// Count down to the next candle boundary. Countdown events go out every
    /// fifth second and every second of the last ten. Returns `false` if
    /// stopped while waiting.
    fn wait_for_boundary(&self, timeframe: Timeframe, signal: &RunSignal) -> bool {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let Some(wait) = timeframe.secs_until_next_boundary(now) else {
            return signal.is_running();
        };

        for seconds_left in (1..=wait).rev() {
            if !signal.is_running() {
                return false;
            }
            if seconds_left % 5 == 0 || seconds_left <= 10 {
                self.emit(ScreenerEvent::Countdown { seconds_left });
            }
            thread::sleep(self.options.tick);
        }
        signal.is_running()
    }

    fn sleep_interruptibly(&self, total: Duration, signal: &RunSignal) {
        let tick = self.options.tick.max(Duration::from_millis(1));
        let mut waited = Duration::ZERO;
        while waited < total && signal.is_running() {
            thread::sleep(tick);
            waited += tick;
        }
    }
}
