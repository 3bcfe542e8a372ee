use std::{fs, io, path::Path};

use anyhow::Context;
use shared::domain::WidgetOptions;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_PATH: &str = "widget.toml";

/// Command-line values that win over file and environment settings.
#[derive(Debug, Default)]
pub struct Overrides {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl Overrides {
    fn apply(self, options: &mut WidgetOptions) {
        if let Some(v) = self.project_id {
            options.project_id = Some(v);
        }
        if let Some(v) = self.api_key {
            options.api_key = Some(v);
        }
        if let Some(v) = self.api_url {
            options.api_url = Some(v);
        }
        if let Some(v) = self.timeout_ms {
            options.timeout_ms = Some(v);
        }
    }
}

pub fn load_settings(path: &Path, overrides: Overrides) -> anyhow::Result<WidgetOptions> {
    load_settings_with(path, overrides, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: &Path,
    overrides: Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<WidgetOptions> {
    let mut options = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<WidgetOptions>(&raw)
            .with_context(|| format!("failed to parse widget config '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no widget config file, using defaults");
            WidgetOptions::default()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read widget config '{}'", path.display()))
        }
    };

    if let Some(v) = env("FEEDBACK_PROJECT_ID") {
        options.project_id = Some(v);
    }
    if let Some(v) = env("APP__PROJECT_ID") {
        options.project_id = Some(v);
    }

    if let Some(v) = env("FEEDBACK_API_KEY") {
        options.api_key = Some(v);
    }
    if let Some(v) = env("APP__API_KEY") {
        options.api_key = Some(v);
    }

    if let Some(v) = env("FEEDBACK_API_URL") {
        options.api_url = Some(v);
    }
    if let Some(v) = env("APP__API_URL") {
        options.api_url = Some(v);
    }

    if let Some(v) = env("APP__TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => options.timeout_ms = Some(parsed),
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__TIMEOUT_MS"),
        }
    }

    overrides.apply(&mut options);
    Ok(options)
}
