use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code reported for failures that never produced an HTTP response.
pub const TRANSPORT_ERROR_CODE: u16 = 0;
/// Status code reported when a request exceeds its deadline.
pub const TIMEOUT_ERROR_CODE: u16 = 408;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("FeedbackWidget: {0} is required")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Timeout,
    RemoteRejected,
}

/// Classified outcome of a failed exchange with the feedback backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Transport { message: String },
    #[error("Request timeout")]
    Timeout,
    #[error("{message}")]
    RemoteRejected { status: u16, message: String },
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout => ErrorKind::Timeout,
            Self::RemoteRejected { .. } => ErrorKind::RemoteRejected,
        }
    }

    /// Numeric code surfaced to hosts: 0 for transport failures, 408 for
    /// timeouts, the HTTP status for rejections.
    pub fn code(&self) -> u16 {
        match self {
            Self::Transport { .. } => TRANSPORT_ERROR_CODE,
            Self::Timeout => TIMEOUT_ERROR_CODE,
            Self::RemoteRejected { status, .. } => *status,
        }
    }
}

/// Serializable view of an [`ApiError`], handed to hosts inside `Failed` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub code: u16,
    pub message: String,
}

impl From<&ApiError> for ErrorReport {
    fn from(value: &ApiError) -> Self {
        Self {
            kind: value.kind(),
            code: value.code(),
            message: value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_error_class() {
        assert_eq!(ApiError::transport("dns failure").code(), 0);
        assert_eq!(ApiError::Timeout.code(), 408);
        assert_eq!(ApiError::rejected(422, "bad rating").code(), 422);
    }

    #[test]
    fn report_carries_display_message() {
        let report = ErrorReport::from(&ApiError::Timeout);
        assert_eq!(report.kind, ErrorKind::Timeout);
        assert_eq!(report.code, 408);
        assert_eq!(report.message, "Request timeout");
    }

    #[test]
    fn config_error_names_the_field() {
        assert_eq!(
            ConfigError::MissingField("apiKey").to_string(),
            "FeedbackWidget: apiKey is required"
        );
    }
}
