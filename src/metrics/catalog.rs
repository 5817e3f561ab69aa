//! Built-in chart declarations for the metrics service dashboard.

use super::types::{LoadGroup, RenderMode};
use super::view::{share_load_groups, MetricChartConfig};

/// Load group aggregating metrics across the metrics collector's hosts.
pub const AGGREGATED_LOAD_GROUP: &str = "service.metrics.ambari_metrics.aggregated";

fn region_server_chart(name: &str, title: &str, display_name: &str) -> MetricChartConfig {
    let field = format!("metrics/hbase/regionserver/{}", name);
    MetricChartConfig::new(
        format!("service-metrics-ambari-metrics-region-server-{}", name.replace('_', "-")),
        title,
        format!("service.metrics.ambari_metrics.region_server.{}", name),
        LoadGroup::new(AGGREGATED_LOAD_GROUP, [field]),
    )
    .with_display_name(display_name)
    .with_renderer(RenderMode::Line)
}

/// HBase RegionServer charts of the embedded metrics store. All of them
/// are served by a single fetch of the aggregated load group.
pub fn region_server_charts() -> Vec<MetricChartConfig> {
    let mut charts = vec![
        region_server_chart("storefiles", "Store Files", "Store Files Count"),
        region_server_chart("regions", "Regions", "Regions Count"),
        region_server_chart("requests", "Requests", "Request Count"),
        region_server_chart("blockedUpdates", "Blocked Updates", "Blocked Updates Count"),
    ];
    share_load_groups(&mut charts);
    charts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_server_charts_share_one_group() {
        let charts = region_server_charts();
        assert_eq!(charts.len(), 4);
        let group = &charts[0].load_group;
        assert_eq!(group.name, AGGREGATED_LOAD_GROUP);
        assert_eq!(group.fields.len(), 4);
        assert!(charts.iter().all(|c| c.load_group.key() == group.key()));
        assert!(charts.iter().all(|c| c.validate().is_ok()));

        let store_files = &charts[0];
        assert_eq!(store_files.id, "service-metrics-ambari-metrics-region-server-storefiles");
        assert_eq!(store_files.ajax_index, "service.metrics.ambari_metrics.region_server.storefiles");
        assert_eq!(store_files.label(), "Store Files Count");
        assert!(store_files.fields.contains("metrics/hbase/regionserver/storefiles"));
    }
}
