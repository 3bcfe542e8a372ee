//! Process-wide widget slot for hosts that want a single embedded widget.
//!
//! The free functions delegate to [`global()`]. Hosts needing isolation
//! (tests, multi-tenant shells) can own a [`WidgetRegistry`] instead.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use shared::{domain::WidgetOptions, error::ConfigError};
use tracing::{debug, error};

use crate::{EventHandler, EventKind, FeedbackWidget};

#[derive(Default)]
pub struct WidgetRegistry {
    active: Mutex<Option<FeedbackWidget>>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a widget from `options` and makes it the active one. Any
    /// previous instance is destroyed first, even if the new options are
    /// rejected.
    pub fn init(&self, options: WidgetOptions) -> Result<FeedbackWidget, ConfigError> {
        self.teardown();
        let widget = FeedbackWidget::new(options)?;
        self.slot().replace(widget.clone());
        Ok(widget)
    }

    /// Same as [`init`](Self::init) for a widget the host built itself.
    pub fn install(&self, widget: FeedbackWidget) {
        self.teardown();
        self.slot().replace(widget);
    }

    pub fn open(&self) {
        match self.instance() {
            Some(widget) => widget.open(),
            None => error!("FeedbackWidget: call init() before open()"),
        }
    }

    pub fn close(&self) {
        if let Some(widget) = self.instance() {
            widget.close();
        }
    }

    pub fn on(&self, kind: EventKind, handler: EventHandler) -> bool {
        match self.instance() {
            Some(widget) => widget.on(kind, handler),
            None => {
                error!(event = ?kind, "FeedbackWidget: call init() before on()");
                false
            }
        }
    }

    pub fn instance(&self) -> Option<FeedbackWidget> {
        self.slot().clone()
    }

    /// Destroys the active widget, if any, and empties the slot.
    pub fn teardown(&self) {
        let previous = self.slot().take();
        if let Some(widget) = previous {
            debug!(project_id = %widget.config().project_id, "replacing active feedback widget");
            widget.destroy();
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<FeedbackWidget>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn global() -> &'static WidgetRegistry {
    static REGISTRY: OnceLock<WidgetRegistry> = OnceLock::new();
    REGISTRY.get_or_init(WidgetRegistry::new)
}

pub fn init(options: WidgetOptions) -> Result<FeedbackWidget, ConfigError> {
    global().init(options)
}

pub fn open() {
    global().open()
}

pub fn close() {
    global().close()
}

pub fn on(kind: EventKind, handler: EventHandler) -> bool {
    global().on(kind, handler)
}

pub fn instance() -> Option<FeedbackWidget> {
    global().instance()
}

pub fn teardown() {
    global().teardown()
}

#[cfg(test)]
#[path = "tests/global_tests.rs"]
mod tests;
