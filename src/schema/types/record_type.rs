use super::errors::TransformError;
use super::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Declared kind of a target attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Any,
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// Milliseconds since the Unix epoch
    Timestamp,
}

impl AttributeKind {
    /// Null is accepted by every kind; it is how a cleared attribute is stored.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            AttributeKind::Any => true,
            AttributeKind::String => value.is_string(),
            AttributeKind::Integer => value.is_i64() || value.is_u64(),
            AttributeKind::Number => value.is_number(),
            AttributeKind::Boolean => value.is_boolean(),
            AttributeKind::Object => value.is_object(),
            AttributeKind::Array => value.is_array(),
            AttributeKind::Timestamp => value.as_i64().map(|ms| ms >= 0).unwrap_or(false),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Any => "any",
            AttributeKind::String => "string",
            AttributeKind::Integer => "integer",
            AttributeKind::Number => "number",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Object => "object",
            AttributeKind::Array => "array",
            AttributeKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

pub(crate) fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed setter for one target attribute, bound when a rule set is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSetter {
    attribute: String,
    kind: AttributeKind,
}

impl FieldSetter {
    pub fn new(attribute: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Check a value before it is staged for writing.
    pub fn check(&self, value: &Value) -> Result<(), TransformError> {
        if self.kind.accepts(value) {
            Ok(())
        } else {
            Err(TransformError::TypeMismatch {
                attribute: self.attribute.clone(),
                expected: self.kind.to_string(),
                actual: json_kind_name(value).to_string(),
            })
        }
    }
}

/// Declares a record type: where its natural key lives and, optionally,
/// which attributes it carries.
///
/// With no declared attributes the type is open: any target attribute is
/// accepted with [`AttributeKind::Any`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    pub key_field: FieldPath,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeKind>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, key_field: FieldPath) -> Self {
        Self {
            name: name.into(),
            key_field,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes.insert(name.into(), kind);
        self
    }

    pub fn is_open(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Name of the attribute holding the natural key on stored records.
    pub fn key_attribute(&self) -> &str {
        self.key_field
            .segments()
            .last()
            .map(String::as_str)
            .unwrap_or_else(|| self.key_field.as_str())
    }

    /// Resolve the setter for a target attribute, or `None` if a closed
    /// type does not declare it.
    pub fn setter_for(&self, attribute: &str) -> Option<FieldSetter> {
        if self.is_open() {
            return Some(FieldSetter::new(attribute, AttributeKind::Any));
        }
        self.attributes
            .get(attribute)
            .map(|kind| FieldSetter::new(attribute, *kind))
    }

    /// Extract the natural key from an event value. Strings and numbers are
    /// keys; absent, null, empty and other shapes are not.
    ///
    /// Numbers key by their decimal text, so `42` and `"42"` address the
    /// same record. The record keeps the first-seen value in its key
    /// attribute.
    pub fn extract_key(&self, value: Option<&Value>) -> Option<String> {
        match value? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_acceptance() {
        assert!(AttributeKind::Integer.accepts(&json!(3)));
        assert!(!AttributeKind::Integer.accepts(&json!("3")));
        assert!(AttributeKind::Timestamp.accepts(&json!(1_700_000_000_000_i64)));
        assert!(!AttributeKind::Timestamp.accepts(&json!(-1)));
        assert!(AttributeKind::String.accepts(&Value::Null));
    }

    #[test]
    fn test_closed_type_setters() {
        let host = RecordType::new("host", FieldPath::parse("host_name").unwrap())
            .with_attribute("state", AttributeKind::String);
        assert!(host.setter_for("state").is_some());
        assert!(host.setter_for("unknown").is_none());

        let err = host.setter_for("state").unwrap().check(&json!(1)).unwrap_err();
        assert!(matches!(err, TransformError::TypeMismatch { .. }));
    }

    #[test]
    fn test_key_extraction() {
        let host = RecordType::new("host", FieldPath::parse("host_name").unwrap());
        assert_eq!(host.extract_key(Some(&json!("h1"))), Some("h1".to_string()));
        assert_eq!(host.extract_key(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(host.extract_key(Some(&json!(""))), None);
        assert_eq!(host.extract_key(Some(&Value::Null)), None);
        assert_eq!(host.extract_key(None), None);
        assert_eq!(host.key_attribute(), "host_name");
    }
}
