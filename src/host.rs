//! Host-state mapping: the rule set that keeps per-host records in step
//! with host state events pushed by the server.

use crate::schema::mapper::{MappingRule, RuleSet, RuleSetRegistry, TransformFailurePolicy};
use crate::schema::{AttributeKind, FieldPath, MapperResult, RecordType};
use crate::store::TargetRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const HOST_RECORD_TYPE: &str = "host";
pub const HOST_KEY_FIELD: &str = "host_name";

/// Host record type with its declared attributes.
pub fn host_record_type() -> RecordType {
    RecordType::new(HOST_RECORD_TYPE, FieldPath::single(HOST_KEY_FIELD))
        .with_attribute("alertsSummary", AttributeKind::Object)
        .with_attribute("healthStatus", AttributeKind::String)
        .with_attribute("state", AttributeKind::String)
        .with_attribute("lastHeartBeatTime", AttributeKind::Timestamp)
        .with_attribute("passiveState", AttributeKind::String)
}

/// Event field to record attribute mapping for host state events.
pub fn host_mapping_rules() -> Vec<MappingRule> {
    vec![
        MappingRule::new("alertsSummary", "alerts_summary"),
        MappingRule::new("healthStatus", "host_status"),
        MappingRule::new("state", "host_state"),
        MappingRule::new("lastHeartBeatTime", "last_heartbeat_time"),
        MappingRule::new("passiveState", "maintenance_state"),
    ]
}

/// Declare the host record type and its rules.
pub fn define_host_rules(registry: &mut RuleSetRegistry) -> MapperResult<Arc<RuleSet>> {
    registry.define_record_type(host_record_type())?;
    registry.define_rules(
        HOST_RECORD_TYPE,
        host_mapping_rules(),
        TransformFailurePolicy::Skip,
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertsSummary {
    #[serde(rename = "CRITICAL", default)]
    pub critical: u64,
    #[serde(rename = "WARNING", default)]
    pub warning: u64,
    #[serde(rename = "OK", default)]
    pub ok: u64,
    #[serde(rename = "UNKNOWN", default)]
    pub unknown: u64,
    #[serde(rename = "MAINTENANCE", default)]
    pub maintenance: u64,
}

/// Typed view of a host record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    #[serde(rename = "host_name")]
    pub host_name: String,
    #[serde(default)]
    pub alerts_summary: Option<AlertsSummary>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub last_heart_beat_time: Option<i64>,
    #[serde(default)]
    pub passive_state: Option<String>,
}

impl HostState {
    pub fn from_record(record: &TargetRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record.to_json())
    }

    pub fn in_maintenance(&self) -> bool {
        self.passive_state.as_deref().map(|s| s != "OFF").unwrap_or(false)
    }

    pub fn heartbeat_lost(&self) -> bool {
        self.state.as_deref() == Some("HEARTBEAT_LOST")
    }

    pub fn has_critical_alerts(&self) -> bool {
        self.alerts_summary
            .as_ref()
            .map(|summary| summary.critical > 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mapper::RecordMapper;
    use crate::schema::SourceEvent;
    use crate::store::{InMemoryRecordStore, RecordResolver, RecordStore};
    use serde_json::json;

    fn host_mapper() -> RecordMapper {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let mut registry = RuleSetRegistry::default();
        let rules = define_host_rules(&mut registry).unwrap();
        RecordMapper::new(rules, Arc::new(RecordResolver::new(store)))
    }

    #[test]
    fn test_host_event_maps_to_typed_state() {
        let mapper = host_mapper();
        let event = SourceEvent::from_value(json!({
            "host_name": "c7401.ambari.apache.org",
            "host_status": "HEALTHY",
            "host_state": "HEALTHY",
            "last_heartbeat_time": 1700000000000_i64,
            "maintenance_state": "OFF",
            "alerts_summary": {"CRITICAL": 1, "OK": 12, "WARNING": 0, "UNKNOWN": 0, "MAINTENANCE": 0},
            "cluster_name": "c1"
        }))
        .unwrap();

        let record = mapper.apply(&event).unwrap();
        let host = HostState::from_record(&record).unwrap();
        assert_eq!(host.host_name, "c7401.ambari.apache.org");
        assert_eq!(host.health_status.as_deref(), Some("HEALTHY"));
        assert_eq!(host.last_heart_beat_time, Some(1700000000000));
        assert!(host.has_critical_alerts());
        assert!(!host.in_maintenance());
        assert_eq!(record.get("cluster_name"), None);
    }

    #[test]
    fn test_heartbeat_lost_keeps_other_fields() {
        let mapper = host_mapper();
        mapper
            .apply(&SourceEvent::from_value(json!({"host_name": "h1", "maintenance_state": "ON"})).unwrap())
            .unwrap();
        let record = mapper
            .apply(&SourceEvent::from_value(json!({"host_name": "h1", "host_state": "HEARTBEAT_LOST"})).unwrap())
            .unwrap();
        let host = HostState::from_record(&record).unwrap();
        assert!(host.heartbeat_lost());
        assert!(host.in_maintenance());
        assert_eq!(host.alerts_summary, None);
    }
}
