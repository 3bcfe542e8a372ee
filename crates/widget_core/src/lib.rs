use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use shared::{
    domain::{SubmissionPayload, WidgetConfig, WidgetOptions},
    error::ConfigError,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub mod events;
pub mod global;
pub mod identity;
pub mod presentation;
mod state;
pub mod transport;

pub use events::{handler, EventBus, EventHandler, EventKind, SubmissionFailure, WidgetEvent};
pub use identity::{FileStore, IdentityResolver, IdentityStore, SessionStore};
pub use presentation::{MessageKind, NoopPresenter, PresentationAdapter, ViewMessage, WidgetView};
pub use state::Lifecycle;
pub use transport::{FeedbackTransport, HttpFeedbackClient};

use state::{is_valid_rating, WidgetState};

/// Exit animation before a close completes.
pub const CLOSE_ANIMATION_DELAY: Duration = Duration::from_millis(200);
/// How long the success message stays up before the widget closes itself.
pub const SUCCESS_CLOSE_DELAY: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Char(char),
}

/// Embeddable rating widget: lifecycle state machine plus submit orchestration.
///
/// Cloning yields another handle to the same widget. Delayed transitions run
/// on the ambient Tokio runtime and never keep the widget alive on their own.
#[derive(Clone)]
pub struct FeedbackWidget {
    inner: Arc<WidgetInner>,
}

struct WidgetInner {
    config: WidgetConfig,
    transport: Arc<dyn FeedbackTransport>,
    identity: Arc<IdentityResolver>,
    presenter: Arc<dyn PresentationAdapter>,
    events: EventBus,
    state: Mutex<WidgetState>,
}

impl FeedbackWidget {
    /// Headless widget talking HTTP to `apiUrl`, with the default identity tiers.
    pub fn new(options: WidgetOptions) -> Result<Self, ConfigError> {
        let config = WidgetConfig::from_options(options)?;
        let transport = Arc::new(HttpFeedbackClient::from_config(&config));
        Ok(Self::from_parts(
            config,
            transport,
            Arc::new(IdentityResolver::with_default_tiers()),
            Arc::new(NoopPresenter),
        ))
    }

    pub fn new_with_presenter(
        options: WidgetOptions,
        presenter: Arc<dyn PresentationAdapter>,
    ) -> Result<Self, ConfigError> {
        let config = WidgetConfig::from_options(options)?;
        let transport = Arc::new(HttpFeedbackClient::from_config(&config));
        Ok(Self::from_parts(
            config,
            transport,
            Arc::new(IdentityResolver::with_default_tiers()),
            presenter,
        ))
    }

    pub fn new_with_dependencies(
        options: WidgetOptions,
        transport: Arc<dyn FeedbackTransport>,
        identity: Arc<IdentityResolver>,
        presenter: Arc<dyn PresentationAdapter>,
    ) -> Result<Self, ConfigError> {
        let config = WidgetConfig::from_options(options)?;
        Ok(Self::from_parts(config, transport, identity, presenter))
    }

    fn from_parts(
        config: WidgetConfig,
        transport: Arc<dyn FeedbackTransport>,
        identity: Arc<IdentityResolver>,
        presenter: Arc<dyn PresentationAdapter>,
    ) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                config,
                transport,
                identity,
                presenter,
                events: EventBus::new(),
                state: Mutex::new(WidgetState::default()),
            }),
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state().lifecycle
    }

    pub fn current_rating(&self) -> u8 {
        self.state().rating
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.state().submit_enabled()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    pub fn view(&self) -> WidgetView {
        self.state().view(&self.inner.config)
    }

    pub fn open(&self) {
        let (first_mount, opening) = {
            let mut state = self.state();
            if state.destroyed {
                warn!("open() called on a destroyed feedback widget");
                return;
            }
            if state.lifecycle != Lifecycle::Closed || state.closing {
                debug!(lifecycle = ?state.lifecycle, "widget already open");
                return;
            }
            state.lifecycle = Lifecycle::Opening;
            state.cycle += 1;
            state.reset_form();
            let first_mount = !state.initialized;
            state.initialized = true;
            (first_mount, state.view(&self.inner.config))
        };

        if first_mount {
            self.inner.presenter.initialize(&self.inner.config);
        }
        self.inner.presenter.render(&opening);
        self.inner.events.emit(WidgetEvent::Opened);

        self.update(|state| {
            if state.lifecycle == Lifecycle::Opening {
                state.lifecycle = Lifecycle::Open;
            }
        });
        debug!(project_id = %self.inner.config.project_id, "feedback widget opened");
    }

    /// Starts the exit animation; `Closed` is emitted once it finishes.
    pub fn close(&self) {
        let cycle = {
            let mut state = self.state();
            if state.destroyed || state.lifecycle == Lifecycle::Closed || state.closing {
                return;
            }
            state.closing = true;
            state.cycle
        };
        self.render();
        self.schedule(CLOSE_ANIMATION_DELAY, move |widget| widget.finish_close(cycle));
    }

    fn finish_close(&self, cycle: u64) {
        {
            let mut state = self.state();
            if !state.is_current(cycle) || !state.closing {
                return;
            }
            state.lifecycle = Lifecycle::Closed;
            state.closing = false;
            state.reset_form();
        }
        self.inner.presenter.unmount();
        self.inner.events.emit(WidgetEvent::Closed);
        debug!(project_id = %self.inner.config.project_id, "feedback widget closed");
    }

    fn close_if_current(&self, cycle: u64) {
        let current = self.state().is_current(cycle);
        if current {
            self.close();
        }
    }

    /// Escape closes the dialog, but only while the form is interactive.
    pub fn handle_key(&self, key: Key) {
        let interactive = self.state().accepts_input();
        if key == Key::Escape && interactive {
            self.close();
        }
    }

    /// Click outside the dialog. Only honoured while the form is interactive,
    /// so it cannot cut a submission or the success message short.
    pub fn dismiss(&self) {
        let interactive = self.state().accepts_input();
        if interactive {
            self.close();
        }
    }

    pub fn select_rating(&self, rating: u8) {
        if !is_valid_rating(rating) {
            debug!(rating, "ignoring out-of-range rating");
            return;
        }
        self.update(|state| {
            if state.accepts_input() {
                state.rating = rating;
                state.hover = None;
            }
        });
    }

    pub fn hover_rating(&self, rating: u8) {
        if !is_valid_rating(rating) {
            return;
        }
        self.update(|state| {
            if state.accepts_input() {
                state.hover = Some(rating);
            }
        });
    }

    pub fn clear_hover(&self) {
        self.update(|state| state.hover = None);
    }

    pub fn set_comment(&self, comment: impl Into<String>) {
        let comment = comment.into();
        self.update(|state| {
            if state.accepts_input() {
                state.comment = comment;
            }
        });
    }

    /// Sends the current rating and comment. Outcomes are reported through
    /// events and the rendered view only; this never fails.
    pub async fn submit(&self) {
        let (cycle, rating, comment) = {
            let mut state = self.state();
            if !state.submit_enabled() {
                debug!(lifecycle = ?state.lifecycle, rating = state.rating, "submit ignored");
                return;
            }
            state.lifecycle = Lifecycle::Submitting;
            state.message = None;
            (state.cycle, state.rating, state.comment.clone())
        };
        self.render();

        let payload = SubmissionPayload::new(
            &self.inner.config.project_id,
            self.inner.identity.user_id(),
            rating,
            &comment,
            Utc::now(),
        );
        let outcome = self.inner.transport.submit(&payload).await;

        // A close during the call leaves the cycle intact: the host still
        // hears the outcome, but the dismissed form is left alone.
        let dismissed = {
            let state = self.state();
            if !state.is_current(cycle) {
                debug!(cycle, "discarding result of a stale submission");
                return;
            }
            state.lifecycle == Lifecycle::Closed || state.closing
        };

        match outcome {
            Ok(result) => {
                info!(
                    project_id = %payload.project_id,
                    rating = payload.rating,
                    dismissed,
                    "feedback submitted"
                );
                if !dismissed {
                    let success = self.inner.config.labels.success.clone();
                    self.update(|state| {
                        state.lifecycle = Lifecycle::Succeeded;
                        state.show(MessageKind::Success, success);
                    });
                }
                self.inner.events.emit(WidgetEvent::Submitted(payload));
                self.inner.events.emit(WidgetEvent::Succeeded(result));
                if !dismissed {
                    self.schedule(SUCCESS_CLOSE_DELAY, move |widget| {
                        widget.close_if_current(cycle)
                    });
                }
            }
            Err(error) => {
                if !dismissed {
                    let text = error.to_string();
                    self.update(|state| {
                        state.lifecycle = Lifecycle::Failed;
                        state.show(MessageKind::Error, text);
                    });
                    self.update(|state| state.lifecycle = Lifecycle::Open);
                }
                self.inner
                    .events
                    .emit(WidgetEvent::Failed(SubmissionFailure { error, payload }));
            }
        }
    }

    pub fn get_user_id(&self) -> String {
        self.inner.identity.user_id()
    }

    pub async fn check_connection(&self) -> bool {
        self.inner.transport.health_check().await
    }

    pub fn on(&self, kind: EventKind, handler: EventHandler) -> bool {
        if self.is_destroyed() {
            warn!(event = ?kind, "ignoring subscription on a destroyed feedback widget");
            return false;
        }
        self.inner.events.on(kind, handler)
    }

    pub fn off(&self, kind: EventKind, handler: &EventHandler) -> bool {
        self.inner.events.off(kind, handler)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    pub fn has_subscriptions(&self) -> bool {
        !self.inner.events.is_empty()
    }

    /// Tears the widget down for good. Later calls are no-ops.
    pub fn destroy(&self) {
        let had_resources = {
            let mut state = self.state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.cycle += 1;
            state.lifecycle = Lifecycle::Closed;
            state.closing = false;
            state.reset_form();
            std::mem::replace(&mut state.initialized, false)
        };

        self.inner.events.clear();
        if had_resources {
            self.inner.presenter.unmount();
            self.inner.presenter.teardown();
        }
        debug!(project_id = %self.inner.config.project_id, "feedback widget destroyed");
    }

    fn state(&self) -> MutexGuard<'_, WidgetState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` and re-renders when the widget is mounted.
    fn update(&self, change: impl FnOnce(&mut WidgetState)) {
        let view = {
            let mut state = self.state();
            change(&mut state);
            (state.lifecycle != Lifecycle::Closed).then(|| state.view(&self.inner.config))
        };
        if let Some(view) = view {
            self.inner.presenter.render(&view);
        }
    }

    fn render(&self) {
        self.update(|_| {});
    }

    fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce(FeedbackWidget) + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::downgrade(&self.inner);
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(inner) = inner.upgrade() {
                        task(FeedbackWidget { inner });
                    }
                });
            }
            Err(_) => {
                debug!("no async runtime, completing delayed transition immediately");
                task(self.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
