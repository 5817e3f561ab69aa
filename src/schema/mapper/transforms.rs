//! Named value transforms used by mapping rules.
//!
//! Rules refer to transforms by name; names are resolved once when a rule
//! set is defined, so mapping an event never looks a transform up.

use crate::schema::TransformError;
use chrono::DateTime;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A pure `value -> value` function.
pub type TransformFn = Arc<dyn Fn(&Value) -> Result<Value, TransformError> + Send + Sync>;

/// A transform bound to its registered name.
#[derive(Clone)]
pub struct NamedTransform {
    name: String,
    func: TransformFn,
}

impl NamedTransform {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        (self.func)(value)
    }
}

impl fmt::Debug for NamedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedTransform").field(&self.name).finish()
    }
}

/// Built-ins pass `null` through unchanged so that cleared attributes stay cleared.
fn null_transparent<F>(f: F) -> TransformFn
where
    F: Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
{
    Arc::new(move |value: &Value| {
        if value.is_null() {
            Ok(Value::Null)
        } else {
            f(value)
        }
    })
}

/// `f as i64` saturates, so anything outside the i64 range is rejected here.
fn whole_to_i64(f: f64) -> Option<i64> {
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_integer(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.is_finite() => whole_to_i64(f)
                .map(|i| json!(i))
                .ok_or_else(|| TransformError::invalid_input("to_integer", value, "out of range")),
            _ => Err(TransformError::invalid_input("to_integer", value, "not a whole number")),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|n| json!(n))
            .map_err(|e| TransformError::invalid_input("to_integer", value, e.to_string())),
        Value::Bool(b) => Ok(json!(i64::from(*b))),
        _ => Err(TransformError::invalid_input("to_integer", value, "unsupported type")),
    }
}

fn to_float(value: &Value) -> Result<Value, TransformError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(|f| json!(f))
        .ok_or_else(|| TransformError::invalid_input("to_float", value, "not a number"))
}

fn to_boolean(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => Ok(json!(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(json!(true)),
            "false" | "no" | "off" | "0" => Ok(json!(false)),
            _ => Err(TransformError::invalid_input("to_boolean", value, "not a boolean literal")),
        },
        _ => Err(TransformError::invalid_input("to_boolean", value, "unsupported type")),
    }
}

fn to_string(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(json!(n.to_string())),
        Value::Bool(b) => Ok(json!(b.to_string())),
        other => Ok(json!(other.to_string())),
    }
}

fn map_str(name: &'static str, f: fn(&str) -> String) -> TransformFn {
    null_transparent(move |value: &Value| match value.as_str() {
        Some(s) => Ok(json!(f(s))),
        None => Err(TransformError::invalid_input(name, value, "expected a string")),
    })
}

fn rfc3339_to_millis(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| json!(dt.timestamp_millis()))
            .map_err(|e| TransformError::invalid_input("rfc3339_to_millis", value, e.to_string())),
        _ => Err(TransformError::invalid_input("rfc3339_to_millis", value, "expected an RFC 3339 string")),
    }
}

fn seconds_to_millis(value: &Value) -> Result<Value, TransformError> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => whole_to_i64((s * 1000.0).round())
            .map(|ms| json!(ms))
            .ok_or_else(|| TransformError::invalid_input("seconds_to_millis", value, "out of range")),
        _ => Err(TransformError::invalid_input("seconds_to_millis", value, "expected non-negative seconds")),
    }
}

static BUILTINS: Lazy<HashMap<&'static str, TransformFn>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, TransformFn> = HashMap::new();
    table.insert("identity", Arc::new(|v: &Value| -> Result<Value, TransformError> { Ok(v.clone()) }));
    table.insert("to_uppercase", map_str("to_uppercase", str::to_uppercase));
    table.insert("to_lowercase", map_str("to_lowercase", str::to_lowercase));
    table.insert("trim", map_str("trim", |s| s.trim().to_string()));
    table.insert("to_string", null_transparent(to_string));
    table.insert("to_integer", null_transparent(to_integer));
    table.insert("to_float", null_transparent(to_float));
    table.insert("to_boolean", null_transparent(to_boolean));
    table.insert("rfc3339_to_millis", null_transparent(rfc3339_to_millis));
    table.insert("seconds_to_millis", null_transparent(seconds_to_millis));
    table
});

/// Table of named transforms available to rule definitions.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    /// A registry holding only the built-in transforms.
    pub fn with_builtins() -> Self {
        Self {
            transforms: BUILTINS
                .iter()
                .map(|(name, func)| (name.to_string(), Arc::clone(func)))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register or replace a transform.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(func));
    }

    pub fn resolve(&self, name: &str) -> Option<NamedTransform> {
        self.transforms.get(name).map(|func| NamedTransform {
            name: name.to_string(),
            func: Arc::clone(func),
        })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, value: Value) -> Result<Value, TransformError> {
        TransformRegistry::with_builtins().resolve(name).unwrap().apply(&value)
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(run("to_integer", json!("3")).unwrap(), json!(3));
        assert_eq!(run("to_integer", json!(4.0)).unwrap(), json!(4));
        assert!(run("to_integer", json!("three")).is_err());
        assert!(run("to_integer", json!(4.5)).is_err());
        assert_eq!(run("to_float", json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(run("to_boolean", json!("off")).unwrap(), json!(false));
    }

    #[test]
    fn test_string_transforms() {
        assert_eq!(run("to_uppercase", json!("healthy")).unwrap(), json!("HEALTHY"));
        assert_eq!(run("trim", json!("  h1 ")).unwrap(), json!("h1"));
        assert_eq!(run("to_string", json!(7)).unwrap(), json!("7"));
        assert!(run("to_lowercase", json!(7)).is_err());
    }

    #[test]
    fn test_time_transforms() {
        assert_eq!(
            run("rfc3339_to_millis", json!("1970-01-01T00:00:01Z")).unwrap(),
            json!(1000)
        );
        assert_eq!(run("seconds_to_millis", json!(1.5)).unwrap(), json!(1500));
        assert!(run("seconds_to_millis", json!(-1)).is_err());
    }

    #[test]
    fn test_out_of_range_numbers_are_rejected() {
        assert!(run("to_integer", json!(1e20)).is_err());
        assert!(run("to_integer", json!(-1e20)).is_err());
        assert!(run("seconds_to_millis", json!(1e300)).is_err());
        assert!(run("seconds_to_millis", json!("1e17")).is_err());
        assert_eq!(run("to_integer", json!(9.0e15)).unwrap(), json!(9_000_000_000_000_000i64));
        assert_eq!(run("seconds_to_millis", json!(1.7e9)).unwrap(), json!(1_700_000_000_000i64));
    }

    #[test]
    fn test_null_passes_through() {
        for name in ["to_integer", "to_uppercase", "rfc3339_to_millis", "identity"] {
            assert_eq!(run(name, Value::Null).unwrap(), Value::Null, "{}", name);
        }
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = TransformRegistry::empty();
        assert!(registry.resolve("to_integer").is_none());
        registry.register("count_keys", |v: &Value| {
            Ok(json!(v.as_object().map(|m| m.len()).unwrap_or(0)))
        });
        let t = registry.resolve("count_keys").unwrap();
        assert_eq!(t.name(), "count_keys");
        assert_eq!(t.apply(&json!({"a": 1, "b": 2})).unwrap(), json!(2));
    }
}
