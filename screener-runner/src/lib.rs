//! Screener Runner: refresh scheduling, event delivery, notifications, sessions.
//!
//! This crate builds on `screener-core` to provide:
//! - The refresh scheduler with candle-boundary waits and a cooperative stop flag
//! - Event types and sinks (console rendering, in-memory collection)
//! - Notification collaborators (log, external command)
//! - The session registry: one worker and one bounded event queue per client

pub mod console;
pub mod events;
pub mod notifier;
pub mod scheduler;
pub mod session;
pub mod sink;

pub use console::ConsoleSink;
pub use events::{LogLevel, ScreenerEvent};
pub use notifier::{CommandNotifier, LogNotifier, Notifier, NotifyError};
pub use scheduler::{CycleSummary, MissingConfig, RunSignal, Scheduler, SchedulerOptions};
pub use session::{
    ProviderFactory, Session, SessionError, SessionQueue, SessionRegistry, HEARTBEAT_AFTER,
    IDLE_TIMEOUT, QUEUE_CAPACITY, RESET_GRACE, SWEEP_INTERVAL,
};
pub use sink::{CollectingSink, EventSink};
