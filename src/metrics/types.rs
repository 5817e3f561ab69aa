use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Errors from fetching metric series. Cloneable so that one failed fetch
/// can be reported to every caller that shared it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Metrics transport error: {0}")]
    Transport(String),

    #[error("Metrics endpoint {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed metrics response: {0}")]
    Parse(String),

    #[error("Invalid chart declaration: {0}")]
    InvalidChart(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// A named remote aggregation plus the field paths requested from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadGroup {
    pub name: String,
    pub fields: BTreeSet<String>,
}

impl LoadGroup {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Cache identity: group name and the sorted field set.
    pub fn key(&self) -> LoadGroupKey {
        LoadGroupKey(format!(
            "{}?fields={}",
            self.name,
            self.fields.iter().cloned().collect::<Vec<_>>().join(",")
        ))
    }

    pub fn merge(&mut self, other: &LoadGroup) {
        self.fields.extend(other.fields.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadGroupKey(String);

impl fmt::Display for LoadGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub value: f64,
}

/// Field path to its points, ordered by timestamp.
pub type TimeSeries = BTreeMap<String, Vec<DataPoint>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Line,
    Bar,
    Area,
}
