use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

const DEFAULT_TITLE: &str = "¿Cómo fue tu experiencia?";
const DEFAULT_PLACEHOLDER: &str = "Cuéntanos más (opcional)...";
const DEFAULT_SUBMIT: &str = "Enviar";
const DEFAULT_CANCEL: &str = "Cancelar";
const DEFAULT_SUCCESS: &str = "¡Gracias por tu feedback!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    Center,
}

/// Label overrides supplied by the host. Unset or empty entries fall back to
/// the defaults one field at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOptions {
    pub title: Option<String>,
    pub placeholder: Option<String>,
    pub submit: Option<String>,
    pub cancel: Option<String>,
    pub success: Option<String>,
}

/// Raw host configuration, before validation and defaulting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub theme: Option<Theme>,
    pub position: Option<Position>,
    pub labels: Option<LabelOptions>,
    pub timeout_ms: Option<u64>,
}

impl WidgetOptions {
    pub fn new(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: Some(project_id.into()),
            api_key: Some(api_key.into()),
            api_url: Some(api_url.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub title: String,
    pub placeholder: String,
    pub submit: String,
    pub cancel: String,
    pub success: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self::merged(LabelOptions::default())
    }
}

impl Labels {
    fn merged(options: LabelOptions) -> Self {
        Self {
            title: or_default(options.title, DEFAULT_TITLE),
            placeholder: or_default(options.placeholder, DEFAULT_PLACEHOLDER),
            submit: or_default(options.submit, DEFAULT_SUBMIT),
            cancel: or_default(options.cancel, DEFAULT_CANCEL),
            success: or_default(options.success, DEFAULT_SUCCESS),
        }
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Validated, immutable widget configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub project_id: String,
    pub api_key: String,
    pub api_url: String,
    pub theme: Theme,
    pub position: Position,
    pub labels: Labels,
    pub timeout: Duration,
}

impl WidgetConfig {
    pub fn from_options(options: WidgetOptions) -> Result<Self, ConfigError> {
        let project_id = required(options.project_id, "projectId")?;
        let api_key = required(options.api_key, "apiKey")?;
        let api_url = required(options.api_url, "apiUrl")?;
        let api_url = api_url.strip_suffix('/').unwrap_or(&api_url).to_string();

        Ok(Self {
            project_id,
            api_key,
            api_url,
            theme: options.theme.unwrap_or_default(),
            position: options.position.unwrap_or_default(),
            labels: Labels::merged(options.labels.unwrap_or_default()),
            timeout: options
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField(field)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub project_id: String,
    pub user_id: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionPayload {
    /// Builds a payload, trimming the comment and dropping it when blank.
    pub fn new(
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        rating: u8,
        comment: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let comment = comment.trim();
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            rating,
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<String>,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
