use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{handler, Lifecycle};

fn options(project_id: &str) -> WidgetOptions {
    WidgetOptions::new(project_id, "test-api-key", "http://localhost:5000")
}

#[test]
fn calls_before_init_are_harmless() {
    let registry = WidgetRegistry::new();

    registry.open();
    registry.close();
    registry.teardown();

    assert!(!registry.on(EventKind::Opened, handler(|_| Ok(()))));
    assert!(registry.instance().is_none());
}

#[test]
fn init_then_open_drives_the_active_widget() {
    let registry = WidgetRegistry::new();
    let opened = Arc::new(AtomicUsize::new(0));
    let widget = registry.init(options("p1")).expect("init");

    let counter = opened.clone();
    assert!(registry.on(
        EventKind::Opened,
        handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    ));
    registry.open();

    assert_eq!(widget.lifecycle(), Lifecycle::Open);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    registry.teardown();
}

#[test]
fn reinit_destroys_previous_instance() {
    let registry = WidgetRegistry::new();
    let first = registry.init(options("p1")).expect("init");
    first.open();

    let second = registry.init(options("p2")).expect("init");

    assert!(first.is_destroyed());
    assert_eq!(first.lifecycle(), Lifecycle::Closed);
    assert!(!second.is_destroyed());
    let active = registry.instance().expect("active widget");
    assert_eq!(active.config().project_id, "p2");
    registry.teardown();
}

#[test]
fn failed_init_still_clears_previous_instance() {
    let registry = WidgetRegistry::new();
    let first = registry.init(options("p1")).expect("init");

    let err = registry.init(options("")).err().expect("must fail");

    assert_eq!(err, ConfigError::MissingField("projectId"));
    assert!(first.is_destroyed());
    assert!(registry.instance().is_none());
}

#[test]
fn teardown_destroys_and_empties_slot() {
    let registry = WidgetRegistry::new();
    let widget = registry.init(options("p1")).expect("init");

    registry.teardown();

    assert!(widget.is_destroyed());
    assert!(registry.instance().is_none());
}

#[test]
fn install_replaces_active_widget() {
    let registry = WidgetRegistry::new();
    let first = registry.init(options("p1")).expect("init");
    let custom = FeedbackWidget::new(options("custom")).expect("widget");

    registry.install(custom);

    assert!(first.is_destroyed());
    let active = registry.instance().expect("active widget");
    assert_eq!(active.config().project_id, "custom");
    registry.teardown();
}

#[test]
fn global_registry_is_shared() {
    assert!(std::ptr::eq(global(), global()));
}
