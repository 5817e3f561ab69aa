use super::cache::LoadGroupCache;
use super::types::{LoadGroup, MetricsError, MetricsResult, RenderMode, TimeSeries};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Declarative description of one metric chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChartConfig {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub renderer: RenderMode,
    pub ajax_index: String,
    /// Field paths this chart draws. Must be a subset of the load group's fields.
    pub fields: BTreeSet<String>,
    pub load_group: LoadGroup,
}

impl MetricChartConfig {
    /// A chart drawing every field of its own load group.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        ajax_index: impl Into<String>,
        load_group: LoadGroup,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            display_name: None,
            renderer: RenderMode::default(),
            ajax_index: ajax_index.into(),
            fields: load_group.fields.clone(),
            load_group,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_renderer(mut self, renderer: RenderMode) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.title)
    }

    pub fn validate(&self) -> MetricsResult<()> {
        if self.id.trim().is_empty() {
            return Err(MetricsError::InvalidChart("chart id is empty".into()));
        }
        if self.load_group.name.trim().is_empty() {
            return Err(MetricsError::InvalidChart(format!(
                "chart '{}' has an unnamed load group",
                self.id
            )));
        }
        if self.fields.is_empty() {
            return Err(MetricsError::InvalidChart(format!("chart '{}' draws no fields", self.id)));
        }
        if let Some(field) = self.fields.iter().find(|f| !self.load_group.fields.contains(*f)) {
            return Err(MetricsError::InvalidChart(format!(
                "chart '{}' draws '{}' which its load group does not fetch",
                self.id, field
            )));
        }
        Ok(())
    }
}

/// Widen the load groups of charts that share a group name to the union of
/// their fields, so one fetch serves all of them.
pub fn share_load_groups(charts: &mut [MetricChartConfig]) {
    let mut merged: Vec<LoadGroup> = Vec::new();
    for chart in charts.iter() {
        match merged.iter_mut().find(|g| g.name == chart.load_group.name) {
            Some(group) => group.merge(&chart.load_group),
            None => merged.push(chart.load_group.clone()),
        }
    }
    for chart in charts.iter_mut() {
        if let Some(group) = merged.iter().find(|g| g.name == chart.load_group.name) {
            chart.load_group = group.clone();
        }
    }
}

/// Draws fetched series. Implemented by whatever hosts the charts.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &MetricChartConfig, series: &TimeSeries);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewLoad {
    Rendered,
    /// The view was torn down before data arrived
    Discarded,
}

/// One live chart. Loads through the shared cache and stops rendering once
/// torn down.
pub struct MetricChartView {
    instance_id: Uuid,
    config: MetricChartConfig,
    cache: Arc<LoadGroupCache>,
    renderer: Arc<dyn ChartRenderer>,
    destroyed: AtomicBool,
}

impl MetricChartView {
    pub fn new(
        config: MetricChartConfig,
        cache: Arc<LoadGroupCache>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> MetricsResult<Self> {
        config.validate()?;
        Ok(Self {
            instance_id: Uuid::new_v4(),
            config,
            cache,
            renderer,
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &MetricChartConfig {
        &self.config
    }

    pub async fn load(&self) -> MetricsResult<ViewLoad> {
        if self.is_destroyed() {
            return Ok(ViewLoad::Discarded);
        }
        let series = self.cache.fetch(&self.config.load_group).await?;
        if self.is_destroyed() {
            debug!("Chart {} ({}) torn down before data arrived", self.config.id, self.instance_id);
            return Ok(ViewLoad::Discarded);
        }

        let own: TimeSeries = series
            .iter()
            .filter(|(field, _)| self.config.fields.contains(*field))
            .map(|(field, points)| (field.clone(), points.clone()))
            .collect();
        self.renderer.render(&self.config, &own);
        Ok(ViewLoad::Rendered)
    }

    pub fn teardown(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            info!("Chart {} ({}) torn down", self.config.id, self.instance_id);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::transport::MetricsTransport;
    use crate::metrics::types::DataPoint;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;
    use std::time::Duration;

    struct SlowTransport {
        calls: AtomicU64,
    }

    #[async_trait]
    impl MetricsTransport for SlowTransport {
        async fn fetch(&self, group: &LoadGroup) -> MetricsResult<TimeSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(group
                .fields
                .iter()
                .map(|f| (f.clone(), vec![DataPoint { timestamp: 1, value: 1.0 }]))
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, chart: &MetricChartConfig, series: &TimeSeries) {
            self.rendered
                .lock()
                .unwrap()
                .push((chart.id.clone(), series.keys().cloned().collect()));
        }
    }

    fn charts() -> Vec<MetricChartConfig> {
        let mut charts = vec![
            MetricChartConfig::new("files", "Store Files", "idx.files", LoadGroup::new("agg", ["metrics/files"])),
            MetricChartConfig::new("regions", "Regions", "idx.regions", LoadGroup::new("agg", ["metrics/regions"])),
        ];
        share_load_groups(&mut charts);
        charts
    }

    #[test]
    fn test_share_load_groups_unions_fields() {
        let charts = charts();
        assert_eq!(charts[0].load_group, charts[1].load_group);
        assert_eq!(charts[0].load_group.fields.len(), 2);
        assert_eq!(charts[0].fields.len(), 1);
        assert!(charts.iter().all(|c| c.validate().is_ok()));
    }

    #[tokio::test]
    async fn test_views_share_fetch_and_render_own_fields() {
        let transport = Arc::new(SlowTransport { calls: AtomicU64::new(0) });
        let cache = Arc::new(LoadGroupCache::new(transport.clone()));
        let renderer = Arc::new(RecordingRenderer::default());
        let views: Vec<_> = charts()
            .into_iter()
            .map(|c| MetricChartView::new(c, cache.clone(), renderer.clone()).unwrap())
            .collect();

        let (a, b) = tokio::join!(views[0].load(), views[1].load());
        assert_eq!(a.unwrap(), ViewLoad::Rendered);
        assert_eq!(b.unwrap(), ViewLoad::Rendered);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let mut rendered = renderer.rendered.lock().unwrap().clone();
        rendered.sort();
        assert_eq!(
            rendered,
            vec![
                ("files".to_string(), vec!["metrics/files".to_string()]),
                ("regions".to_string(), vec!["metrics/regions".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_torn_down_view_never_renders() {
        let transport = Arc::new(SlowTransport { calls: AtomicU64::new(0) });
        let cache = Arc::new(LoadGroupCache::new(transport.clone()));
        let renderer = Arc::new(RecordingRenderer::default());
        let mut configs = charts();
        let view = Arc::new(MetricChartView::new(configs.remove(0), cache.clone(), renderer.clone()).unwrap());

        let loading = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { view.load().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        view.teardown();

        assert_eq!(loading.await.unwrap().unwrap(), ViewLoad::Discarded);
        assert!(renderer.rendered.lock().unwrap().is_empty());

        // the fetch still completed and populated the cache
        cache.fetch(&view.config().load_group).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate_rejects_foreign_fields() {
        let mut chart = MetricChartConfig::new("c", "C", "idx", LoadGroup::new("agg", ["metrics/a"]));
        chart.fields.insert("metrics/b".into());
        assert!(matches!(chart.validate(), Err(MetricsError::InvalidChart(_))));
    }
}
