use serde::Serialize;
use shared::domain::{WidgetConfig, MAX_RATING, MIN_RATING};

use crate::presentation::{MessageKind, ViewMessage, WidgetView};

const BUSY_SUBMIT_LABEL: &str = "Enviando...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Closed,
    Opening,
    Open,
    Submitting,
    Succeeded,
    Failed,
}

/// Mutable widget state. Only the controller touches it, always under its lock.
#[derive(Debug, Default)]
pub(crate) struct WidgetState {
    pub lifecycle: Lifecycle,
    pub rating: u8,
    pub hover: Option<u8>,
    pub comment: String,
    pub message: Option<ViewMessage>,
    pub closing: bool,
    pub initialized: bool,
    pub destroyed: bool,
    /// Advanced on every open and on destroy; async work started in an older
    /// cycle must not touch the state.
    pub cycle: u64,
}

impl WidgetState {
    pub fn reset_form(&mut self) {
        self.rating = 0;
        self.hover = None;
        self.comment.clear();
        self.message = None;
    }

    /// Rating intents are honoured only while the form is interactive.
    pub fn accepts_input(&self) -> bool {
        self.lifecycle == Lifecycle::Open && !self.closing && !self.destroyed
    }

    pub fn submit_enabled(&self) -> bool {
        self.accepts_input() && self.rating >= MIN_RATING
    }

    pub fn is_current(&self, cycle: u64) -> bool {
        !self.destroyed && self.cycle == cycle
    }

    pub fn show(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.message = Some(ViewMessage {
            kind,
            text: text.into(),
        });
    }

    pub fn view(&self, config: &WidgetConfig) -> WidgetView {
        let busy = self.lifecycle == Lifecycle::Submitting;
        WidgetView {
            lifecycle: self.lifecycle,
            theme: config.theme,
            position: config.position,
            labels: config.labels.clone(),
            rating: self.rating,
            highlighted: self.hover.unwrap_or(self.rating),
            comment: self.comment.clone(),
            submit_enabled: self.submit_enabled(),
            submit_label: if busy {
                BUSY_SUBMIT_LABEL.to_string()
            } else {
                config.labels.submit.clone()
            },
            busy,
            form_visible: self.lifecycle != Lifecycle::Succeeded,
            closing: self.closing,
            message: self.message.clone(),
        }
    }
}

pub(crate) fn is_valid_rating(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
