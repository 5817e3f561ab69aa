//! End-to-end mapping behaviour through the public API: idempotence,
//! sparse updates, get-or-create identity, key failures and transform
//! failure policies.

use mapfold::schema::mapper::{MappingRule, RecordMapper, RuleSetRegistry, TransformFailurePolicy};
use mapfold::store::{InMemoryRecordStore, RecordResolver, RecordStore};
use mapfold::{FieldPath, MapperError, RecordType, SourceEvent};
use serde_json::{json, Value};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn event(value: Value) -> SourceEvent {
    SourceEvent::from_value(value).expect("event fixture must be an object")
}

struct Fixture {
    store: Arc<dyn RecordStore>,
    resolver: Arc<RecordResolver>,
    mapper: RecordMapper,
}

fn host_fixture(rules: Vec<MappingRule>, policy: TransformFailurePolicy) -> Fixture {
    init_logging();
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
    let resolver = Arc::new(RecordResolver::new(Arc::clone(&store)));
    let mut registry = RuleSetRegistry::default();
    registry
        .define_record_type(RecordType::new("host", FieldPath::parse("host_name").unwrap()))
        .unwrap();
    let rule_set = registry.define_rules("host", rules, policy).unwrap();
    Fixture {
        store,
        resolver: Arc::clone(&resolver),
        mapper: RecordMapper::new(rule_set, resolver),
    }
}

fn state_and_health() -> Vec<MappingRule> {
    vec![
        MappingRule::new("state", "host_state"),
        MappingRule::new("health", "host_status"),
    ]
}

#[test]
fn test_host_scenario() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);

    let record = fixture
        .mapper
        .apply(&event(json!({
            "host_name": "h1",
            "host_state": "HEALTHY",
            "host_status": "UNHEALTHY",
            "rack": "/default-rack"
        })))
        .unwrap();

    assert_eq!(record.key, "h1");
    assert_eq!(record.get("host_name"), Some(&json!("h1")));
    assert_eq!(record.get("state"), Some(&json!("HEALTHY")));
    assert_eq!(record.get("health"), Some(&json!("UNHEALTHY")));
    assert_eq!(record.get("rack"), None);
    assert_eq!(record.version, 1);
}

#[test]
fn test_applying_the_same_event_twice_is_idempotent() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);
    let e = event(json!({"host_name": "h1", "host_state": "HEALTHY", "host_status": "HEALTHY"}));

    let first = fixture.mapper.apply_detailed(&e).unwrap();
    let after_first = fixture.store.snapshot().unwrap();
    let second = fixture.mapper.apply_detailed(&e).unwrap();

    assert!(first.created && first.changed());
    assert!(!second.created);
    assert!(!second.changed());
    assert_eq!(second.unchanged.len(), 2);
    assert_eq!(fixture.store.snapshot().unwrap(), after_first);
}

#[test]
fn test_absent_fields_keep_previous_values() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);
    fixture
        .mapper
        .apply(&event(json!({"host_name": "h1", "host_state": "HEALTHY", "host_status": "HEALTHY"})))
        .unwrap();

    let report = fixture
        .mapper
        .apply_detailed(&event(json!({"host_name": "h1", "host_state": "HEARTBEAT_LOST"})))
        .unwrap();

    assert_eq!(report.written, vec!["state".to_string()]);
    assert_eq!(report.skipped, vec!["health".to_string()]);
    assert_eq!(report.record.get("health"), Some(&json!("HEALTHY")));
    assert_eq!(report.record.version, 2);
}

#[test]
fn test_clear_if_absent_overrides_sparse_update() {
    let fixture = host_fixture(
        vec![
            MappingRule::new("state", "host_state"),
            MappingRule::new("health", "host_status").clear_if_absent(),
        ],
        TransformFailurePolicy::Skip,
    );
    fixture
        .mapper
        .apply(&event(json!({"host_name": "h1", "host_status": "HEALTHY"})))
        .unwrap();
    let record = fixture
        .mapper
        .apply(&event(json!({"host_name": "h1", "host_state": "INIT"})))
        .unwrap();
    assert_eq!(record.get("health"), Some(&Value::Null));
}

#[test]
fn test_resolution_returns_the_same_record() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);
    let record_type = RecordType::new("host", FieldPath::parse("host_name").unwrap());

    let first = fixture.resolver.resolve(&record_type, "h1").unwrap();
    let second = fixture.resolver.resolve(&record_type, "h1").unwrap();
    let other = fixture.resolver.resolve(&record_type, "h2").unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert!(Arc::ptr_eq(&first.handle, &second.handle));
    assert!(!Arc::ptr_eq(&first.handle, &other.handle));
    assert_eq!(fixture.store.len().unwrap(), 2);
}

#[test]
fn test_missing_key_leaves_store_untouched() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);
    fixture
        .mapper
        .apply(&event(json!({"host_name": "h1", "host_state": "HEALTHY"})))
        .unwrap();
    let before = fixture.store.snapshot().unwrap();

    for bad in [
        json!({"host_state": "DOWN", "host_status": "UNKNOWN"}),
        json!({"host_name": null, "host_state": "DOWN"}),
        json!({"host_name": "", "host_state": "DOWN"}),
    ] {
        let err = fixture.mapper.apply(&event(bad)).unwrap_err();
        assert!(matches!(err, MapperError::MissingKey { .. }));
    }

    assert_eq!(fixture.store.snapshot().unwrap(), before);
}

#[test]
fn test_abort_policy_writes_nothing() {
    let fixture = host_fixture(
        vec![
            MappingRule::new("state", "host_state"),
            MappingRule::new("lastHeartBeatTime", "last_heartbeat_time").with_function("to_integer"),
        ],
        TransformFailurePolicy::Abort,
    );

    let err = fixture
        .mapper
        .apply(&event(json!({
            "host_name": "h1",
            "host_state": "HEALTHY",
            "last_heartbeat_time": "yesterday"
        })))
        .unwrap_err();

    assert!(matches!(err, MapperError::Transform { ref field, .. } if field == "lastHeartBeatTime"));
    assert!(fixture.store.is_empty().unwrap());
}

#[test]
fn test_skip_policy_writes_the_other_fields() {
    let fixture = host_fixture(
        vec![
            MappingRule::new("state", "host_state"),
            MappingRule::new("lastHeartBeatTime", "last_heartbeat_time").with_function("to_integer"),
        ],
        TransformFailurePolicy::Skip,
    );

    let report = fixture
        .mapper
        .apply_detailed(&event(json!({
            "host_name": "h1",
            "host_state": "HEALTHY",
            "last_heartbeat_time": "yesterday"
        })))
        .unwrap();

    assert_eq!(report.record.get("state"), Some(&json!("HEALTHY")));
    assert_eq!(report.record.get("lastHeartBeatTime"), None);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "lastHeartBeatTime");
}

#[test]
fn test_changes_are_broadcast() {
    let fixture = host_fixture(state_and_health(), TransformFailurePolicy::Skip);
    let mut changes = fixture.store.subscribe();

    let e = event(json!({"host_name": "h1", "host_state": "HEALTHY"}));
    fixture.mapper.apply(&e).unwrap();
    fixture.mapper.apply(&e).unwrap();

    let created = changes.try_recv().unwrap();
    assert_eq!(created.id.key, "h1");
    let updated = changes.try_recv().unwrap();
    assert_eq!(updated.version, 1);
    assert!(changes.try_recv().is_err());
}
