use mapfold::schema::mapper::{BatchSummary, DispatchOutcome};
use mapfold::{build_runtime, MapFoldConfig, MapFoldError, MapperError, SourceEvent};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[logging]
level = "debug"

[[record_types]]
name = "service"
key_field = "ServiceInfo.service_name"
on_transform_failure = "skip"
rules_dsl = """
# state of the service as reported by the server
MAP ServiceInfo.state TO state WITH to_uppercase
MAP ServiceInfo.maintenance_state TO passiveState
"""

[record_types.attributes]
state = "string"
passiveState = "string"
"#;

#[test]
fn test_load_config_and_map_mixed_batch() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = MapFoldConfig::load_from_file(file.path()).expect("config should load");
    let runtime = build_runtime(&config).unwrap();
    assert_eq!(
        runtime.mappers.record_types(),
        vec!["host".to_string(), "service".to_string()]
    );

    let events = vec![
        ("service", SourceEvent::from_value(json!({"ServiceInfo": {"service_name": "HDFS", "state": "started"}})).unwrap()),
        ("host", SourceEvent::from_value(json!({"host_name": "h1", "host_state": "HEALTHY"})).unwrap()),
        ("service", SourceEvent::from_value(json!({"ServiceInfo": {"state": "STARTED"}})).unwrap()),
    ];
    let (outcomes, summary) = runtime
        .mappers
        .dispatch_batch(events.iter().map(|(t, e)| (*t, e)))
        .unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            mapped: 2,
            changed: 2,
            dropped: 1
        }
    );
    match &outcomes[0] {
        DispatchOutcome::Mapped(report) => {
            assert_eq!(report.record.key, "HDFS");
            assert_eq!(report.record.get("state"), Some(&json!("STARTED")));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(outcomes[2], DispatchOutcome::Dropped(MapperError::MissingKey { .. })));
}

#[test]
fn test_missing_file_is_a_config_error() {
    let err = MapFoldConfig::load_from_file("/nonexistent/mapfold.toml").unwrap_err();
    assert!(matches!(err, MapFoldError::Config(_)));
}

#[test]
fn test_rules_for_undeclared_attribute_are_rejected() {
    let config = MapFoldConfig::from_toml_str(
        r#"
[[record_types]]
name = "service"
key_field = "service_name"
rules_dsl = "MAP service_state TO status"

[record_types.attributes]
state = "string"
"#,
    )
    .unwrap();
    let err = build_runtime(&config).err().expect("undeclared attribute must fail");
    assert!(matches!(err, MapFoldError::Mapper(MapperError::Configuration(_))));
}
