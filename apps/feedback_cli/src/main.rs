mod config;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use shared::error::ErrorReport;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use widget_core::{
    global, handler, EventKind, FeedbackWidget, Lifecycle, MessageKind, PresentationAdapter,
    WidgetEvent, WidgetView,
};

use crate::config::{load_settings, Overrides, DEFAULT_CONFIG_PATH};

const CLOSE_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(about = "Send a star rating to a feedback collection service")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    project_id: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    rating: Option<u8>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Only probe the service health endpoint.
    #[arg(long)]
    check: bool,
}

/// Draws the widget as log lines.
struct TerminalPresenter;

impl PresentationAdapter for TerminalPresenter {
    fn initialize(&self, config: &shared::domain::WidgetConfig) {
        info!(theme = ?config.theme, position = ?config.position, "{}", config.labels.title);
    }

    fn render(&self, view: &WidgetView) {
        let stars: String = (1..=5u8)
            .map(|n| if n <= view.highlighted { '★' } else { '☆' })
            .collect();
        info!(
            lifecycle = ?view.lifecycle,
            submit = %view.submit_label,
            enabled = view.submit_enabled,
            "{stars}"
        );
        match &view.message {
            Some(message) if message.kind == MessageKind::Success => info!("{}", message.text),
            Some(message) => warn!("{}", message.text),
            None => {}
        }
    }

    fn unmount(&self) {
        info!("dialog closed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let options = load_settings(
        &args.config,
        Overrides {
            project_id: args.project_id,
            api_key: args.api_key,
            api_url: args.api_url,
            timeout_ms: args.timeout_ms,
        },
    )?;
    let widget = FeedbackWidget::new_with_presenter(options, Arc::new(TerminalPresenter))?;

    if args.check {
        let reachable = widget.check_connection().await;
        info!(api_url = %widget.config().api_url, reachable, "health check");
        if !reachable {
            bail!("feedback service at {} is unreachable", widget.config().api_url);
        }
        return Ok(());
    }

    let Some(rating) = args.rating else {
        bail!("--rating is required unless --check is given");
    };

    global::global().install(widget.clone());
    let failure = register_handlers(&widget);
    let mut events = widget.subscribe();

    global::open();
    widget.select_rating(rating);
    if let Some(comment) = args.comment {
        widget.set_comment(comment);
    }
    widget.submit().await;

    if widget.lifecycle() != Lifecycle::Succeeded {
        global::close();
    }
    tokio::time::timeout(CLOSE_WAIT, async {
        while let Ok(event) = events.recv().await {
            if event == WidgetEvent::Closed {
                break;
            }
        }
    })
    .await
    .context("widget did not close in time")?;
    global::teardown();

    let report = failure.lock().map(|slot| slot.clone()).unwrap_or_default();
    if let Some(report) = report {
        bail!(
            "submission failed ({:?}, code {}): {}",
            report.kind,
            report.code,
            report.message
        );
    }
    Ok(())
}

fn register_handlers(widget: &FeedbackWidget) -> Arc<Mutex<Option<ErrorReport>>> {
    let failure = Arc::new(Mutex::new(None));

    widget.on(
        EventKind::Opened,
        handler(|_| {
            info!("widget opened");
            Ok(())
        }),
    );
    widget.on(
        EventKind::Closed,
        handler(|_| {
            info!("widget closed");
            Ok(())
        }),
    );
    widget.on(
        EventKind::Submitted,
        handler(|event| {
            if let WidgetEvent::Submitted(payload) = event {
                info!(user_id = %payload.user_id, rating = payload.rating, "feedback sent");
            }
            Ok(())
        }),
    );
    widget.on(
        EventKind::Succeeded,
        handler(|event| {
            if let WidgetEvent::Succeeded(result) = event {
                info!(feedback_id = ?result.feedback_id, "{}", result.message);
            }
            Ok(())
        }),
    );
    let slot = failure.clone();
    widget.on(
        EventKind::Failed,
        handler(move |event| {
            if let WidgetEvent::Failed(failure) = event {
                let mut slot = slot
                    .lock()
                    .map_err(|_| anyhow::anyhow!("failure slot poisoned"))?;
                *slot = Some(ErrorReport::from(&failure.error));
            }
            Ok(())
        }),
    );

    failure
}
