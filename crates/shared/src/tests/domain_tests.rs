use super::*;

fn valid_options() -> WidgetOptions {
    WidgetOptions::new("test-project", "test-api-key", "http://localhost:5000")
}

#[test]
fn builds_config_with_defaults() {
    let config = WidgetConfig::from_options(valid_options()).expect("config");
    assert_eq!(config.theme, Theme::Light);
    assert_eq!(config.position, Position::BottomRight);
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    assert_eq!(config.labels.title, "¿Cómo fue tu experiencia?");
    assert_eq!(config.labels.placeholder, "Cuéntanos más (opcional)...");
    assert_eq!(config.labels.submit, "Enviar");
    assert_eq!(config.labels.cancel, "Cancelar");
    assert_eq!(config.labels.success, "¡Gracias por tu feedback!");
}

#[test]
fn rejects_missing_or_blank_required_fields() {
    let cases: [(fn(&mut WidgetOptions), &str); 6] = [
        (|o| o.project_id = None, "projectId"),
        (|o| o.project_id = Some("   ".into()), "projectId"),
        (|o| o.api_key = Some(String::new()), "apiKey"),
        (|o| o.api_key = Some("\t\n".into()), "apiKey"),
        (|o| o.api_url = None, "apiUrl"),
        (|o| o.api_url = Some(" ".into()), "apiUrl"),
    ];

    for (mutate, field) in cases {
        let mut options = valid_options();
        mutate(&mut options);
        let err = WidgetConfig::from_options(options).expect_err("must fail");
        assert_eq!(err, ConfigError::MissingField(field));
    }
}

#[test]
fn merges_labels_field_by_field() {
    let mut options = valid_options();
    options.labels = Some(LabelOptions {
        title: Some("Custom Title".into()),
        submit: Some("Send".into()),
        cancel: Some(String::new()),
        ..LabelOptions::default()
    });

    let labels = WidgetConfig::from_options(options).expect("config").labels;
    assert_eq!(labels.title, "Custom Title");
    assert_eq!(labels.submit, "Send");
    assert_eq!(labels.cancel, "Cancelar");
    assert_eq!(labels.success, "¡Gracias por tu feedback!");
}

#[test]
fn keeps_custom_theme_position_and_timeout() {
    let mut options = valid_options();
    options.theme = Some(Theme::Dark);
    options.position = Some(Position::Center);
    options.timeout_ms = Some(2_500);

    let config = WidgetConfig::from_options(options).expect("config");
    assert_eq!(config.theme, Theme::Dark);
    assert_eq!(config.position, Position::Center);
    assert_eq!(config.timeout, Duration::from_millis(2_500));
}

#[test]
fn strips_single_trailing_slash_from_api_url() {
    let mut options = valid_options();
    options.api_url = Some("https://feedback.example.com/".into());
    let config = WidgetConfig::from_options(options).expect("config");
    assert_eq!(config.api_url, "https://feedback.example.com");
}

#[test]
fn parses_options_from_camel_case_toml() {
    let raw = r#"
        projectId = "shop"
        apiKey = "k"
        apiUrl = "https://api.example.com"
        theme = "dark"
        position = "bottom-left"

        [labels]
        title = "Rate us"
    "#;
    let options: WidgetOptions = toml::from_str(raw).expect("parse");
    let config = WidgetConfig::from_options(options).expect("config");
    assert_eq!(config.position, Position::BottomLeft);
    assert_eq!(config.theme, Theme::Dark);
    assert_eq!(config.labels.title, "Rate us");
    assert_eq!(config.labels.submit, "Enviar");
}

#[test]
fn payload_trims_comment_and_omits_blank_one() {
    let ts: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().expect("timestamp");

    let with_comment = SubmissionPayload::new("p", "u", 4, "  great app  ", ts);
    assert_eq!(with_comment.comment.as_deref(), Some("great app"));

    let blank = SubmissionPayload::new("p", "u", 4, "   ", ts);
    assert_eq!(blank.comment, None);

    let json = serde_json::to_value(&blank).expect("json");
    assert_eq!(json["projectId"], "p");
    assert_eq!(json["userId"], "u");
    assert_eq!(json["rating"], 4);
    assert!(json.get("comment").is_none());
    assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
}

#[test]
fn result_accepts_missing_feedback_id() {
    let result: SubmissionResult =
        serde_json::from_str(r#"{"success":true,"message":"ok"}"#).expect("parse");
    assert!(result.success);
    assert_eq!(result.feedback_id, None);
}
