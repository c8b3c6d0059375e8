//! Multi-client sessions.
//!
//! Each session owns its configuration, a bounded event queue and (while
//! running) one worker thread with its own scheduler and series cache. The
//! registry is the only shared structure; its lock covers map operations and
//! is never held while a session does work.

use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use screener_core::analysis::AssetReport;
use screener_core::config::{ScreenerConfig, SharedConfigSource};
use screener_core::data::{CandleProvider, DataError, NullStore};

use crate::events::{LogLevel, ScreenerEvent};
use crate::scheduler::{MissingConfig, RunSignal, Scheduler, SchedulerOptions};
use crate::sink::EventSink;

pub const QUEUE_CAPACITY: usize = 500;
/// A stream read that sees nothing for this long yields a heartbeat.
pub const HEARTBEAT_AFTER: Duration = Duration::from_secs(25);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Pause between stopping a worker and clearing its results on reset.
pub const RESET_GRACE: Duration = Duration::from_millis(1500);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("failed to create candle provider: {0}")]
    Provider(#[from] DataError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded event queue. Producers never block: when full, the newest event
/// is dropped and counted.
pub struct SessionQueue {
    tx: SyncSender<ScreenerEvent>,
    rx: Mutex<Receiver<ScreenerEvent>>,
    dropped: AtomicU64,
}

impl SessionQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue without blocking. `false` if the event was dropped.
    pub fn push(&self, event: ScreenerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(kind = event.kind(), dropped, "event queue full, dropping event");
                false
            }
            // The receiver lives as long as the queue.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Next event, or a heartbeat if nothing arrives within `timeout`.
    ///
    /// Single consumer: the receiver lock is held for the whole wait, so a
    /// second concurrent reader can block for up to twice `timeout`.
    pub fn next_event(&self, timeout: Duration) -> ScreenerEvent {
        match lock(&self.rx).recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                ScreenerEvent::Heartbeat {}
            }
        }
    }

    /// Everything currently queued, without waiting.
    pub fn drain(&self) -> Vec<ScreenerEvent> {
        lock(&self.rx).try_iter().collect()
    }

    /// Events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct Results {
    pending: Vec<AssetReport>,
    last_cycle: Vec<AssetReport>,
}

pub struct Session {
    id: String,
    config: SharedConfigSource,
    signal: Mutex<Option<RunSignal>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    queue: SessionQueue,
    results: Mutex<Results>,
    last_active: Mutex<Instant>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            config: SharedConfigSource::new(None),
            signal: Mutex::new(None),
            worker: Mutex::new(None),
            queue: SessionQueue::new(QUEUE_CAPACITY),
            results: Mutex::new(Results::default()),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> Option<ScreenerConfig> {
        self.config.get()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.signal)
            .as_ref()
            .is_some_and(RunSignal::is_running)
    }

    pub fn queue(&self) -> &SessionQueue {
        &self.queue
    }

    /// Reports from the last completed cycle.
    pub fn results(&self) -> Vec<AssetReport> {
        lock(&self.results).last_cycle.clone()
    }

    pub fn last_active(&self) -> Instant {
        *lock(&self.last_active)
    }

    pub fn touch(&self) {
        *lock(&self.last_active) = Instant::now();
    }

    /// Block for the next event (heartbeat after [`HEARTBEAT_AFTER`]).
    pub fn next_event(&self) -> ScreenerEvent {
        self.touch();
        self.queue.next_event(HEARTBEAT_AFTER)
    }

    /// Wait for the current worker, if any, to finish.
    pub fn join(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(session = %self.id, "session worker panicked");
            }
        }
    }

    fn stop_worker(&self) {
        if let Some(signal) = lock(&self.signal).as_ref() {
            signal.stop();
        }
    }

    fn clear_results(&self) {
        *lock(&self.results) = Results::default();
    }
}

impl EventSink for Session {
    fn emit(&self, event: ScreenerEvent) {
        match &event {
            ScreenerEvent::AssetUpdate(report) => {
                lock(&self.results).pending.push((**report).clone());
            }
            ScreenerEvent::CycleComplete { .. } => {
                let mut results = lock(&self.results);
                results.last_cycle = std::mem::take(&mut results.pending);
            }
            _ => {}
        }
        self.queue.push(event);
    }
}

/// Builds one candle provider per started session.
pub type ProviderFactory =
    Arc<dyn Fn() -> Result<Box<dyn CandleProvider>, DataError> + Send + Sync>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    provider_factory: ProviderFactory,
    options: SchedulerOptions,
    idle_timeout: Duration,
    reset_grace: Duration,
}

impl SessionRegistry {
    pub fn new(provider_factory: ProviderFactory) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            provider_factory,
            options: SchedulerOptions {
                on_missing_config: MissingConfig::Stop,
                ..SchedulerOptions::default()
            },
            idle_timeout: IDLE_TIMEOUT,
            reset_grace: RESET_GRACE,
        }
    }

    /// Override scheduler timings. Session workers always stop on a missing config.
    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = SchedulerOptions {
            on_missing_config: MissingConfig::Stop,
            ..options
        };
        self
    }

    pub fn with_reset_grace(mut self, grace: Duration) -> Self {
        self.reset_grace = grace;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// The session for `id`, created on first reference.
    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        lock(&self.sessions)
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(session = %id, "session created");
                Arc::new(Session::new(id))
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        lock(&self.sessions).get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        lock(&self.sessions).remove(id)
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sessions not running and inactive for longer than the idle timeout.
    pub fn list_idle(&self, now: Instant) -> Vec<String> {
        let sessions: Vec<Arc<Session>> = lock(&self.sessions).values().cloned().collect();
        sessions
            .into_iter()
            .filter(|s| {
                !s.is_running() && now.saturating_duration_since(s.last_active()) > self.idle_timeout
            })
            .map(|s| s.id.clone())
            .collect()
    }

    /// Start the session's worker. Starting a running session changes
    /// nothing and returns `Ok(false)`; its configuration stays as it was.
    pub fn start(&self, id: &str, config: Option<ScreenerConfig>) -> Result<bool, SessionError> {
        let session = self.get_or_create(id);
        session.touch();

        let mut current = lock(&session.signal);
        if current.as_ref().is_some_and(RunSignal::is_running) {
            return Ok(false);
        }

        let provider = (self.provider_factory)()?;
        session.config.set(config);
        // Reports from an interrupted cycle never saw a CycleComplete.
        session.clear_results();
        let signal = RunSignal::running();
        let mut scheduler = Scheduler::new(
            provider,
            Box::new(session.config.clone()),
            Box::new(NullStore),
            session.clone(),
            self.options.clone(),
        );

        let worker_signal = signal.clone();
        let handle = thread::Builder::new()
            .name(format!("screener-session-{id}"))
            .spawn(move || {
                scheduler.run(&worker_signal);
                worker_signal.stop();
            })
            .map_err(SessionError::Spawn)?;

        *current = Some(signal);
        drop(current);

        // A previous worker may still be finishing its in-flight fetch.
        let previous = lock(&session.worker).replace(handle);
        drop(previous);
        info!(session = %id, "session started");
        Ok(true)
    }

    /// Clear the session's run flag. The worker exits at its next checkpoint.
    pub fn stop(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .get(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        session.touch();
        session.stop_worker();
        info!(session = %id, "session stopped");
        Ok(())
    }

    /// Stop, wait out the grace period, clear results and announce the reset.
    pub fn reset(&self, id: &str) -> Result<(), SessionError> {
        self.stop(id)?;
        thread::sleep(self.reset_grace);

        let session = self
            .get(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        session.clear_results();
        session.emit(ScreenerEvent::Reset {});
        session.emit(ScreenerEvent::log(LogLevel::Info, "Screener reset."));
        Ok(())
    }

    /// Remove idle sessions. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let idle = self.list_idle(now);
        for id in &idle {
            self.remove(id);
        }
        if !idle.is_empty() {
            info!(removed = idle.len(), "swept idle sessions");
        }
        idle.len()
    }

    /// Sweep every `interval` on a background thread until `signal` is cleared.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        signal: RunSignal,
    ) -> Result<JoinHandle<()>, SessionError> {
        let registry = Arc::clone(self);
        let tick = interval.min(Duration::from_secs(1));
        thread::Builder::new()
            .name("screener-session-sweeper".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                while signal.is_running() {
                    thread::sleep(tick);
                    let now = Instant::now();
                    if now >= next {
                        registry.sweep(now);
                        next = now + interval;
                    }
                }
            })
            .map_err(SessionError::Spawn)
    }
}
