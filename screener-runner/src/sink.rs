//! Where scheduler events go.

use std::sync::{Mutex, PoisonError};

use crate::events::ScreenerEvent;

/// Receives every event a scheduler emits. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScreenerEvent);
}

/// Keeps every event in memory. Used by `once` to print a cycle's reports.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ScreenerEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<ScreenerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: ScreenerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: ScreenerEvent) {
        (**self).emit(event)
    }
}
