//! Nested field paths into source events.
//!
//! A path is written either dot-separated (`alerts_summary.CRITICAL`) or
//! slash-separated (`metrics/hbase/regionserver/storefiles`). Each segment
//! selects an object member; a numeric segment also indexes into arrays.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a path. Empty paths and empty segments (`a..b`, `/a`) are rejected.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("field path is empty".to_string());
        }
        let separator = if trimmed.contains('/') { '/' } else { '.' };
        let segments: Vec<String> = trimmed.split(separator).map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(format!("field path '{}' has an empty segment", trimmed));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// A one-segment path naming a top-level key verbatim.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            raw: name.clone(),
            segments: vec![name],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the path is a single top-level key.
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }

    /// Resolve the path against a JSON value.
    ///
    /// Returns `None` only when a segment is wholly absent. A present `null`
    /// or an empty object resolves to `Some`.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        walk(root, &self.segments)
    }

    /// Same as [`lookup`](Self::lookup) starting from an object.
    pub fn lookup_in<'a>(&self, root: &'a serde_json::Map<String, Value>) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        walk(root.get(first)?, rest)
    }
}

/// Follow `segments` down from `current`; array segments are indices.
fn walk<'a>(mut current: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldPath::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}
