//! Metric chart views over remotely aggregated time series.
//!
//! Charts are plain [`MetricChartConfig`] values. Charts naming the same
//! load group are served by one fetch through a shared [`LoadGroupCache`];
//! each [`MetricChartView`] renders its own fields unless it has been torn
//! down in the meantime.

pub mod cache;
pub mod catalog;
pub mod transport;
pub mod types;
pub mod view;

pub use cache::LoadGroupCache;
pub use catalog::{region_server_charts, AGGREGATED_LOAD_GROUP};
pub use transport::{parse_series_response, HttpMetricsTransport, MetricsTransport};
pub use types::{DataPoint, LoadGroup, LoadGroupKey, MetricsError, MetricsResult, RenderMode, TimeSeries};
pub use view::{share_load_groups, ChartRenderer, MetricChartConfig, MetricChartView, ViewLoad};
