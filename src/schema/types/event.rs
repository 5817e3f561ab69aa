use super::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound wire-format record. No schema beyond "object of named fields".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceEvent {
    fields: Map<String, Value>,
}

impl SourceEvent {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build an event from an arbitrary JSON value; only objects are events.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup_in(&self.fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for SourceEvent {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
