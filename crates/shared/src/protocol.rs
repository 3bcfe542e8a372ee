use serde::Deserialize;

pub const API_KEY_HEADER: &str = "X-Api-Key";

pub fn feedback_route() -> &'static str {
    "/api/feedback"
}

pub fn health_route() -> &'static str {
    "/health"
}

pub fn feedback_url(api_url: &str) -> String {
    format!("{api_url}{}", feedback_route())
}

pub fn health_url(api_url: &str) -> String {
    format!("{api_url}{}", health_route())
}

/// Error body returned by the backend on non-2xx responses. Only `message` is
/// read; any other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
