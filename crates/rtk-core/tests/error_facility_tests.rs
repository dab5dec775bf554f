use rtk_core::errors::{ExError, ExErrorKind, RtkError};

#[test]
fn test_unknown_ids_are_config_validation() {
    let rule: ExError = RtkError::UnknownRule {
        rule_id: "nope".to_string(),
    }
    .into();
    assert_eq!(rule.kind(), ExErrorKind::ConfigValidation);
    assert_eq!(rule.code(), "ERR_CONFIG_VALIDATION");
    assert_eq!(rule.rule_id(), Some("nope"));

    let transformer: ExError = RtkError::UnknownTransformer {
        transformer_id: "table".to_string(),
    }
    .into();
    assert_eq!(transformer.kind(), ExErrorKind::ConfigValidation);
    assert_eq!(transformer.transformer_id(), Some("table"));

    let preset: ExError = RtkError::UnknownPreset {
        name: "x:y".to_string(),
    }
    .into();
    assert_eq!(preset.kind(), ExErrorKind::ConfigValidation);
    assert!(preset.message().contains("x:y"));
}

#[test]
fn test_missing_property_structured_fields() {
    let ex: ExError = RtkError::MissingProperty {
        path: "header.cpus".to_string(),
        filename: "report-1.json".to_string(),
    }
    .into();

    assert_eq!(ex.kind(), ExErrorKind::MissingProperty);
    assert_eq!(ex.code(), "ERR_MISSING_PROPERTY");
    assert_eq!(ex.path(), Some("header.cpus"));
    assert_eq!(ex.filename(), Some("report-1.json"));
    assert!(ex.message().contains("header.cpus"));
}

#[test]
fn test_plugin_not_found_is_plugin_load() {
    let ex: ExError = RtkError::PluginNotFound {
        plugin_id: "some-plugin".to_string(),
    }
    .into();
    assert_eq!(ex.kind(), ExErrorKind::PluginLoad);
    assert_ne!(ex.kind(), ExErrorKind::ConfigValidation);
}

#[test]
fn test_diff_depth_is_diff_comparison() {
    let ex: ExError = RtkError::DiffDepthExceeded {
        path: "a.b.c".to_string(),
        max_depth: 2,
    }
    .into();
    assert_eq!(ex.kind(), ExErrorKind::DiffComparison);
    assert_eq!(ex.path(), Some("a.b.c"));
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::ConfigValidation, "ERR_CONFIG_VALIDATION"),
        (ExErrorKind::ChainTypeMismatch, "ERR_CHAIN_TYPE_MISMATCH"),
        (ExErrorKind::PluginLoad, "ERR_PLUGIN_LOAD"),
        (ExErrorKind::MissingProperty, "ERR_MISSING_PROPERTY"),
        (ExErrorKind::DiffComparison, "ERR_DIFF_COMPARISON"),
        (ExErrorKind::InvalidReport, "ERR_INVALID_REPORT"),
        (ExErrorKind::UnexpectedItem, "ERR_UNEXPECTED_ITEM"),
        (ExErrorKind::Io, "ERR_IO"),
        (ExErrorKind::Serialization, "ERR_SERIALIZATION"),
        (ExErrorKind::Internal, "ERR_INTERNAL"),
    ];

    let mut seen = std::collections::HashSet::new();
    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
        assert!(seen.insert(expected_code), "duplicate code {}", expected_code);
    }
}

#[test]
fn test_context_survives_builder_chain() {
    let err = ExError::new(ExErrorKind::UnexpectedItem)
        .with_op("transform")
        .with_transformer_id("json")
        .with_message("expected object item, got string");

    assert_eq!(err.op(), Some("transform"));
    assert_eq!(err.transformer_id(), Some("json"));
    assert!(err.rule_id().is_none());
    assert!(err.to_string().contains("ERR_UNEXPECTED_ITEM"));
}

#[test]
fn test_serde_json_error_converts() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let ex: ExError = parse.unwrap_err().into();
    assert_eq!(ex.kind(), ExErrorKind::Serialization);
}
