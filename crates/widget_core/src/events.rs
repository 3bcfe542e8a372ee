//! Typed publish/subscribe channel between the widget and its host.
//!
//! Callbacks are registered per [`EventKind`] with set semantics: the same
//! handler reference registered twice is invoked once. Dispatch is supervised,
//! so a handler that errors or panics is reported and its siblings still run.
//! Every emitted event is also fanned out on a broadcast channel for async hosts.

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use shared::{
    domain::{SubmissionPayload, SubmissionResult},
    error::ApiError,
};
use tokio::sync::broadcast;
use tracing::{error, trace};

const STREAM_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Opened,
    Closed,
    Submitted,
    Succeeded,
    Failed,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Opened,
        EventKind::Closed,
        EventKind::Submitted,
        EventKind::Succeeded,
        EventKind::Failed,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub error: ApiError,
    pub payload: SubmissionPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Opened,
    Closed,
    Submitted(SubmissionPayload),
    Succeeded(SubmissionResult),
    Failed(SubmissionFailure),
}

impl WidgetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WidgetEvent::Opened => EventKind::Opened,
            WidgetEvent::Closed => EventKind::Closed,
            WidgetEvent::Submitted(_) => EventKind::Submitted,
            WidgetEvent::Succeeded(_) => EventKind::Succeeded,
            WidgetEvent::Failed(_) => EventKind::Failed,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&WidgetEvent) -> anyhow::Result<()> + Send + Sync>;

/// Wraps a closure as a shareable handler. Keep the returned handle to
/// unregister it later.
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&WidgetEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct EventBus {
    handlers: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
    stream: broadcast::Sender<WidgetEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            stream: broadcast::channel(STREAM_CAPACITY).0,
        }
    }

    /// Registers `handler` for `kind`. Returns `false` when that exact handler
    /// was already registered.
    pub fn on(&self, kind: EventKind, handler: EventHandler) -> bool {
        let mut handlers = self.handlers();
        let registered = handlers.entry(kind).or_default();
        if registered.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }
        registered.push(handler);
        true
    }

    /// Unregisters `handler`. Returns `false` when it was not registered.
    pub fn off(&self, kind: EventKind, handler: &EventHandler) -> bool {
        let mut handlers = self.handlers();
        let Some(registered) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|h| !Arc::ptr_eq(h, handler));
        registered.len() != before
    }

    pub fn clear(&self) {
        self.handlers().clear();
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers().get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers().values().all(Vec::is_empty)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.stream.subscribe()
    }

    /// Invokes every handler registered for the event's kind and returns how
    /// many of them failed. Failures never reach the caller.
    pub fn emit(&self, event: WidgetEvent) -> usize {
        let kind = event.kind();
        // Snapshot so handlers may call on/off without deadlocking.
        let snapshot = self.handlers().get(&kind).cloned().unwrap_or_default();

        let mut failures = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    error!(event = ?kind, error = %format!("{err:#}"), "event handler failed");
                }
                Err(panic) => {
                    failures += 1;
                    error!(event = ?kind, panic = %panic_message(&*panic), "event handler panicked");
                }
            }
        }

        if self.stream.send(event).is_err() {
            trace!(event = ?kind, "no stream subscribers");
        }
        failures
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<EventHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
