//! Inspection Engine behaviour through the public API.

mod common;

use std::sync::Arc;

use common::{report_from, report_with_cpu, sample_report, sample_value};
use rtk_core::config::{ConfigObject, RuleSetting};
use rtk_core::errors::ExErrorKind;
use rtk_core::inspect::{ErrorPolicy, InspectOptions, InspectScope, Inspector, SortDirection};
use rtk_core::rules::{Options, RuleDefinition, RuleDocs, RuleInstance, RuleMeta};
use rtk_core::{api, builtin_registry, Config, Finding, RawConfig, Report, Result, Severity};
use serde_json::json;

fn ok(reports: Vec<Report>) -> impl Iterator<Item = Result<Report>> {
    reports.into_iter().map(Ok)
}

fn only(rule: &str) -> Config {
    let registry = builtin_registry();
    let raw = RawConfig::from(ConfigObject::default().with_rule(rule, RuleSetting::Enabled(true)));
    api::load_config(&raw, &registry).unwrap()
}

#[test]
fn test_cpu_usage_mean_of_two_cpus() {
    let registry = builtin_registry();
    let messages = api::inspect(
        ok(vec![sample_report("report-1.json")]),
        &registry,
        &only("cpu-usage"),
        &InspectOptions::default(),
    )
    .unwrap();

    assert_eq!(messages.len(), 1);
    let m = &messages[0];
    assert_eq!(m.rule_id, "cpu-usage");
    assert_eq!(m.severity, Severity::Info);
    assert_eq!(m.filename.as_deref(), Some("report-1.json"));
    assert_eq!(m.data, json!({"max": 50, "min": 0, "mode": "mean", "usage": 12.5}));
}

#[test]
fn test_default_config_runs_every_rule_in_order() {
    let registry = builtin_registry();
    let mut value = sample_value();
    value["sharedObjects"] = json!(["/usr/lib/libssl.so.1.0.2k", "/usr/lib/libopenssl.so.1.0.2k"]);
    let messages = api::inspect(
        ok(vec![report_from(value, "r.json")]),
        &registry,
        &Config::default(),
        &InspectOptions::default(),
    )
    .unwrap();
    let ids: Vec<_> = messages.iter().map(|m| m.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["cpu-usage", "library-mismatch"]);
    assert_eq!(messages[1].severity, Severity::Error);
}

#[test]
fn test_severity_threshold_filters() {
    let registry = builtin_registry();
    let options = InspectOptions::default().with_severity(Severity::Warning);
    let messages = api::inspect(
        ok(vec![sample_report("r.json")]),
        &registry,
        &only("cpu-usage"),
        &options,
    )
    .unwrap();
    assert!(messages.is_empty());
}

#[test]
fn test_rule_config_overrides_and_enables() {
    let registry = builtin_registry();
    let mut overrides = Options::new();
    overrides.insert("max".into(), json!(10));
    let options = InspectOptions::default().with_rule_config("cpu-usage", overrides);
    let messages = api::inspect(
        ok(vec![sample_report("r.json")]),
        &registry,
        &only("library-mismatch"),
        &options,
    )
    .unwrap();
    let cpu: Vec<_> = messages.iter().filter(|m| m.rule_id == "cpu-usage").collect();
    assert_eq!(cpu.len(), 1);
    assert_eq!(cpu[0].severity, Severity::Error);
    assert!(cpu[0].message.contains("outside the allowed range of 0-10%"));
}

#[test]
fn test_unknown_rule_in_rule_config_fails_before_reading() {
    let registry = builtin_registry();
    let options = InspectOptions::default().with_rule_config("no-such-rule", Options::new());
    let pulled = std::cell::Cell::new(false);
    let source = std::iter::once_with(|| {
        pulled.set(true);
        Ok(sample_report("r.json"))
    });
    let err = api::inspect(source, &registry, &Config::default(), &options).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConfigValidation);
    assert!(!pulled.get());
}

#[test]
fn test_missing_property_degrades_to_error_message() {
    let registry = builtin_registry();
    let mut value = sample_value();
    value["header"].as_object_mut().unwrap().remove("cpus");
    let messages = api::inspect(
        ok(vec![report_from(value, "broken.json"), sample_report("fine.json")]),
        &registry,
        &only("cpu-usage"),
        &InspectOptions::default(),
    )
    .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].severity, Severity::Error);
    assert_eq!(messages[0].filename.as_deref(), Some("broken.json"));
    assert_eq!(messages[0].data["code"], json!("ERR_MISSING_PROPERTY"));
    assert_eq!(messages[0].data["path"], json!("header.cpus"));
    assert_eq!(messages[1].severity, Severity::Info);
}

#[test]
fn test_strict_policy_yields_error_then_continues() {
    let registry = builtin_registry();
    let mut value = sample_value();
    value["header"].as_object_mut().unwrap().remove("cpus");
    let options = InspectOptions::default().with_error_policy(ErrorPolicy::Strict);
    let out: Vec<_> = Inspector::new(
        ok(vec![report_from(value, "broken.json"), sample_report("fine.json")]),
        &registry,
        &only("cpu-usage"),
        &options,
    )
    .unwrap()
    .collect();

    assert_eq!(out.len(), 2);
    let err = out[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingProperty);
    assert_eq!(err.rule_id(), Some("cpu-usage"));
    assert_eq!(err.filename(), Some("broken.json"));
    assert!(out[1].is_ok());

    let failed = api::inspect(
        ok(vec![sample_report("fine.json")]).chain(std::iter::once(Ok(report_from(
            json!({"header": {}}),
            "empty.json",
        )))),
        &registry,
        &only("cpu-usage"),
        &options,
    );
    assert!(failed.is_err());
}

#[test]
fn test_best_effort_keeps_messages_and_errors() {
    let registry = builtin_registry();
    let options = InspectOptions::default().with_error_policy(ErrorPolicy::Strict);
    let partial = api::inspect_best_effort(
        ok(vec![
            report_from(json!({"header": {}}), "empty.json"),
            sample_report("fine.json"),
        ]),
        &registry,
        &only("cpu-usage"),
        &options,
    )
    .unwrap();

    assert_eq!(partial.items.len(), 1);
    assert_eq!(partial.items[0].filename.as_deref(), Some("fine.json"));
    assert_eq!(partial.errors.len(), 1);
    assert_eq!(partial.errors[0].kind(), ExErrorKind::MissingProperty);
}

#[test]
fn test_sort_by_report_timestamp_desc() {
    let registry = builtin_registry();
    let reports = vec![
        report_with_cpu("old.json", 10.0, "1000"),
        report_with_cpu("new.json", 20.0, "3000"),
        report_with_cpu("mid.json", 30.0, "2000"),
    ];
    let options = InspectOptions::default()
        .sorted_by("header.dumpEventTimestamp", SortDirection::Desc);
    let messages = api::inspect(ok(reports), &registry, &only("cpu-usage"), &options).unwrap();
    let files: Vec<_> = messages.iter().filter_map(|m| m.filename.as_deref()).collect();
    assert_eq!(files, vec!["new.json", "mid.json", "old.json"]);
}

#[test]
fn test_sort_by_message_field() {
    let registry = builtin_registry();
    let reports = vec![
        report_with_cpu("a.json", 60.0, "1"),
        report_with_cpu("b.json", 20.0, "2"),
    ];
    let options = InspectOptions::default().sorted_by("data.usage", SortDirection::Asc);
    let messages = api::inspect(ok(reports), &registry, &only("cpu-usage"), &options).unwrap();
    let usages: Vec<_> = messages.iter().map(|m| m.data["usage"].clone()).collect();
    assert_eq!(usages, vec![json!(10.0), json!(30.0)]);
}

#[test]
fn test_aggregate_scope_reduces_across_reports() {
    let registry = builtin_registry();
    let mut options = InspectOptions::default().with_scope(InspectScope::Aggregate);
    options.rule_config.insert(
        "cpu-usage".into(),
        json!({"mode": "max"}).as_object().cloned().unwrap(),
    );
    let reports = vec![
        report_with_cpu("a.json", 20.0, "1"),
        report_with_cpu("b.json", 90.0, "2"),
    ];
    let messages = api::inspect(ok(reports), &registry, &only("cpu-usage"), &options).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].data["usage"], json!(45.0));
    assert_eq!(messages[0].severity, Severity::Info);
    assert_eq!(messages[0].filename, None);
}

/// Counts contexts and reports the count on completion
struct Counter {
    meta: RuleMeta,
}

struct CounterInstance {
    seen: usize,
}

impl RuleDefinition for Counter {
    fn id(&self) -> &str {
        "counter"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inspect(&self, _options: &Options) -> Result<Box<dyn RuleInstance>> {
        Ok(Box::new(CounterInstance { seen: 0 }))
    }
}

impl RuleInstance for CounterInstance {
    fn next(&mut self, _context: &Report) -> Result<Option<Finding>> {
        self.seen += 1;
        Ok(Some(
            Finding::new(format!("context {}", self.seen)).with_severity(Severity::Warning),
        ))
    }

    fn complete(&mut self) -> Result<Option<Finding>> {
        Ok(Some(
            Finding::new(format!("saw {}", self.seen)).with_data(json!({"seen": self.seen})),
        ))
    }
}

fn counter() -> Arc<dyn RuleDefinition> {
    Arc::new(Counter {
        meta: RuleMeta {
            docs: RuleDocs {
                category: "test".into(),
                description: "counts contexts".into(),
                url: None,
            },
            schema: json!({}),
            constants: Default::default(),
        },
    })
}

#[test]
fn test_instances_are_fresh_per_report_and_complete_comes_last() {
    let mut registry = rtk_core::Registry::new();
    registry.register_rule(counter());
    let messages = api::inspect(
        ok(vec![sample_report("a.json"), sample_report("b.json")]),
        &registry,
        &Config::default(),
        &InspectOptions::default(),
    )
    .unwrap();
    let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["context 1", "saw 1", "context 1", "saw 1"]);
    assert_eq!(messages[1].severity, Severity::Error);
}

#[test]
fn test_stop_leaves_remaining_reports_unread() {
    let mut registry = rtk_core::Registry::new();
    registry.register_rule(counter());
    let pulled = std::cell::Cell::new(0);
    let source = (0..5).map(|i| {
        pulled.set(pulled.get() + 1);
        Ok(sample_report(&format!("r{}.json", i)))
    });
    let mut inspector =
        Inspector::new(source, &registry, &Config::default(), &InspectOptions::default()).unwrap();
    assert!(inspector.next().unwrap().is_ok());
    inspector.stop();
    assert!(inspector.next().is_none());
    assert_eq!(pulled.get(), 1);
}
