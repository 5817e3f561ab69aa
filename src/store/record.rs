use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Identity of a record in the store: record type plus natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    pub record_type: String,
    pub key: String,
}

impl RecordId {
    pub fn new(record_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_type, self.key)
    }
}

/// A normalized domain record, e.g. the state of one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub record_type: String,
    pub key: String,
    pub attributes: BTreeMap<String, Value>,
    /// Bumped whenever an attribute value changes
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Shared, lockable handle to a record owned by the store.
pub type RecordHandle = Arc<RwLock<TargetRecord>>;

impl TargetRecord {
    /// A fresh record with only its natural key populated.
    pub fn new(record_type: impl Into<String>, key_attribute: &str, key: impl Into<String>) -> Self {
        let key = key.into();
        let key_value = Value::String(key.clone());
        Self::with_key_value(record_type, key_attribute, key, key_value)
    }

    /// Like [`TargetRecord::new`], but the key attribute holds `key_value`
    /// as it appeared in the event (e.g. a number) instead of its text form.
    pub fn with_key_value(
        record_type: impl Into<String>,
        key_attribute: &str,
        key: impl Into<String>,
        key_value: Value,
    ) -> Self {
        let key = key.into();
        let mut attributes = BTreeMap::new();
        attributes.insert(key_attribute.to_string(), key_value);
        Self {
            record_type: record_type.into(),
            key,
            attributes,
            version: 0,
            updated_at: None,
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId::new(self.record_type.clone(), self.key.clone())
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Set an attribute, returning whether its value changed.
    pub fn set(&mut self, attribute: &str, value: Value) -> bool {
        match self.attributes.get(attribute) {
            Some(existing) if *existing == value => false,
            _ => {
                self.attributes.insert(attribute.to_string(), value);
                true
            }
        }
    }

    /// Record that a change was applied.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Some(Utc::now());
    }

    /// The attributes as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}
