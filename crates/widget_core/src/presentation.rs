//! Seam between the lifecycle state machine and whatever draws it.

use serde::Serialize;
use shared::domain::{Labels, Position, Theme, WidgetConfig};

use crate::state::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// Everything an adapter needs to draw the widget for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetView {
    pub lifecycle: Lifecycle,
    pub theme: Theme,
    pub position: Position,
    pub labels: Labels,
    /// Committed rating, 0 when none picked yet.
    pub rating: u8,
    /// Stars to draw filled: the hover preview if any, else the committed rating.
    pub highlighted: u8,
    pub comment: String,
    pub submit_enabled: bool,
    pub submit_label: String,
    pub busy: bool,
    pub form_visible: bool,
    /// Exit animation in progress.
    pub closing: bool,
    pub message: Option<ViewMessage>,
}

pub trait PresentationAdapter: Send + Sync {
    /// One-time creation of presentation resources, before the first render.
    fn initialize(&self, _config: &WidgetConfig) {}

    fn render(&self, view: &WidgetView);

    /// Removes the dialog once a close completes. Resources stay allocated.
    fn unmount(&self) {}

    /// Releases everything created by `initialize`.
    fn teardown(&self) {}
}

/// Adapter for headless use.
pub struct NoopPresenter;

impl PresentationAdapter for NoopPresenter {
    fn render(&self, _view: &WidgetView) {}
}
