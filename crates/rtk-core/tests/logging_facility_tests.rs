#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{report_from, sample_report};
use rtk_core::errors::{ExErrorKind, RtkError};
use rtk_core::logging_facility::test_capture::init_test_capture;
use rtk_core::{api, builtin_registry, Config, InspectOptions, TransformOptions};
use rtk_core::{log_op_end, log_op_error, log_op_start};
use rtk_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ERR_CODE, FIELD_ERR_KIND,
    FIELD_RESULT_COUNT, FIELD_RULE_ID,
};
use serde_json::json;
use tracing::Level;

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let events = capture.events();
    let start_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert!(!start_events.is_empty(), "Should have captured a start event");
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events = capture.events_for_op(op_name);
    assert_eq!(end_events.len(), 1);
    assert_eq!(end_events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(end_events[0].fields.get(FIELD_DURATION_MS), Some(&"42".to_string()));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = RtkError::UnknownRule {
        rule_id: "nope".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let error_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(error_events.len(), 1);
    assert_eq!(
        error_events[0].fields.get(FIELD_ERR_CODE),
        Some(&ExErrorKind::ConfigValidation.code().to_string())
    );
    assert_eq!(
        error_events[0].fields.get(FIELD_ERR_KIND).map(String::as_str),
        Some("ConfigValidation")
    );
}

#[test]
fn test_engine_runs_are_correlated_and_closed() {
    let capture = init_test_capture();
    let registry = builtin_registry();

    api::inspect(
        vec![Ok(sample_report("a.json"))],
        &registry,
        &Config::default(),
        &InspectOptions::default(),
    )
    .unwrap();
    let _ = api::transform(
        &["no-such-transformer"],
        std::iter::empty(),
        &registry,
        &Config::default(),
        &TransformOptions::default(),
    );

    capture.assert_runs_closed("inspect");
    capture.assert_runs_closed("transform");

    let failed = capture
        .events_for_op("transform")
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("transform error event");
    let run_id = failed.run_id().expect("run id on error event").to_string();
    let run = capture.events_for_run(&run_id);
    assert!(run.iter().any(|e| e.event.as_deref() == Some(EVENT_START)));
}

#[test]
fn test_inspect_end_carries_result_count() {
    let capture = init_test_capture();
    let registry = builtin_registry();

    let messages = api::inspect(
        vec![Ok(sample_report("count.json"))],
        &registry,
        &Config::default(),
        &InspectOptions::default(),
    )
    .unwrap();

    let expected = messages.len().to_string();
    assert!(capture
        .events_for_op("inspect")
        .iter()
        .any(|e| e.event.as_deref() == Some(EVENT_END)
            && e.fields.get(FIELD_RESULT_COUNT) == Some(&expected)));
}

#[test]
fn test_degraded_rule_failure_warns_with_rule_id() {
    let capture = init_test_capture();
    let registry = builtin_registry();

    api::inspect(
        vec![Ok(report_from(json!({"header": {}}), "no-cpus.json"))],
        &registry,
        &Config::default(),
        &InspectOptions::default(),
    )
    .unwrap();

    let warned = capture.count_events(|e| {
        e.level == Level::WARN
            && e.fields.get(FIELD_RULE_ID).map(String::as_str) == Some("cpu-usage")
            && e.fields.get(FIELD_ERR_CODE).map(String::as_str) == Some("ERR_MISSING_PROPERTY")
    });
    assert!(warned >= 1);
}
