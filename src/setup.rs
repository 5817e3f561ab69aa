use crate::config::{MapFoldConfig, MetricsConfig, StoreBackend, StoreConfig};
use crate::error::MapFoldResult;
use crate::host::define_host_rules;
use crate::metrics::{HttpMetricsTransport, LoadGroupCache};
use crate::schema::mapper::{MapperRegistry, RecordMapper, RuleSetRegistry};
use crate::store::{InMemoryRecordStore, RecordResolver, RecordStore, SledRecordStore};
use log::info;
use std::sync::Arc;

/// Everything needed to map events, built from one configuration.
pub struct MapFoldRuntime {
    pub store: Arc<dyn RecordStore>,
    pub resolver: Arc<RecordResolver>,
    pub rules: RuleSetRegistry,
    pub mappers: Arc<MapperRegistry>,
}

pub fn open_store(config: &StoreConfig) -> MapFoldResult<Arc<dyn RecordStore>> {
    Ok(match config.backend {
        StoreBackend::Memory => Arc::new(InMemoryRecordStore::new()),
        StoreBackend::Sled => {
            info!("Opening record store at {}", config.path.display());
            Arc::new(SledRecordStore::open(&config.path)?)
        }
    })
}

/// Declare the configured record types and compile their rules.
pub fn build_rules(config: &MapFoldConfig) -> MapFoldResult<RuleSetRegistry> {
    let mut registry = RuleSetRegistry::default();
    if config.host_rules {
        define_host_rules(&mut registry)?;
    }
    for record_type in &config.record_types {
        registry.define_record_type(record_type.record_type()?)?;
        registry.define_rules(
            &record_type.name,
            record_type.mapping_rules()?,
            record_type.on_transform_failure,
        )?;
    }
    Ok(registry)
}

pub fn build_runtime(config: &MapFoldConfig) -> MapFoldResult<MapFoldRuntime> {
    let store = open_store(&config.store)?;
    build_runtime_with_store(config, store)
}

/// Same as [`build_runtime`] over a store the caller already opened.
pub fn build_runtime_with_store(
    config: &MapFoldConfig,
    store: Arc<dyn RecordStore>,
) -> MapFoldResult<MapFoldRuntime> {
    let rules = build_rules(config)?;
    let resolver = Arc::new(RecordResolver::new(Arc::clone(&store)));

    let mut mappers = MapperRegistry::new();
    for name in rules.record_type_names() {
        let rule_set = rules.rules_for(&name)?;
        mappers.register(&name, RecordMapper::new(rule_set, Arc::clone(&resolver)))?;
    }

    Ok(MapFoldRuntime {
        store,
        resolver,
        rules,
        mappers: Arc::new(mappers),
    })
}

pub fn build_metrics_cache(config: &MetricsConfig) -> MapFoldResult<Arc<LoadGroupCache>> {
    let transport = HttpMetricsTransport::new(config.base_url.clone(), config.timeout())?;
    let cache = match config.cache_ttl() {
        Some(ttl) => LoadGroupCache::with_ttl(Arc::new(transport), ttl),
        None => LoadGroupCache::new(Arc::new(transport)),
    };
    Ok(Arc::new(cache))
}
