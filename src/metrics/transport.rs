use super::types::{DataPoint, LoadGroup, MetricsError, MetricsResult, TimeSeries};
use crate::schema::FieldPath;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Network side of a metrics fetch.
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    async fn fetch(&self, group: &LoadGroup) -> MetricsResult<TimeSeries>;
}

/// Fetches load groups from an HTTP metrics endpoint.
pub struct HttpMetricsTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetricsTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> MetricsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetricsError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn request_url(&self, group: &LoadGroup) -> String {
        format!(
            "{}/{}?fields={}",
            self.base_url.trim_end_matches('/'),
            group.name,
            group.fields.iter().cloned().collect::<Vec<_>>().join(",")
        )
    }
}

#[async_trait]
impl MetricsTransport for HttpMetricsTransport {
    async fn fetch(&self, group: &LoadGroup) -> MetricsResult<TimeSeries> {
        let url = self.request_url(group);
        debug!("Fetching load group {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetricsError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MetricsError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| MetricsError::Parse(e.to_string()))?;
        parse_series_response(&body, &group.fields)
    }
}

/// Extract the requested series from a nested metrics response.
///
/// Each field path (`metrics/hbase/regionserver/storefiles`) selects an
/// array of `[value, timestamp]` pairs. Paths missing from the response
/// yield an empty series; null values are skipped.
pub fn parse_series_response(body: &Value, fields: &BTreeSet<String>) -> MetricsResult<TimeSeries> {
    let mut series = TimeSeries::new();

    for field in fields {
        let path = FieldPath::parse(field).map_err(MetricsError::Parse)?;
        let mut points = Vec::new();

        if let Some(raw) = path.lookup(body) {
            let pairs = raw
                .as_array()
                .ok_or_else(|| MetricsError::Parse(format!("{} is not a list of points", field)))?;
            for pair in pairs {
                let (value, timestamp) = match pair.as_array().map(Vec::as_slice) {
                    Some([value, timestamp]) => (value, timestamp),
                    _ => {
                        return Err(MetricsError::Parse(format!(
                            "{} has a point that is not a [value, timestamp] pair",
                            field
                        )))
                    }
                };
                if value.is_null() {
                    continue;
                }
                let value = value
                    .as_f64()
                    .ok_or_else(|| MetricsError::Parse(format!("{} has a non-numeric value", field)))?;
                let timestamp = timestamp
                    .as_i64()
                    .ok_or_else(|| MetricsError::Parse(format!("{} has a non-integer timestamp", field)))?;
                points.push(DataPoint { timestamp, value });
            }
        }

        points.sort_by_key(|p| p.timestamp);
        series.insert(field.clone(), points);
    }

    Ok(series)
}
