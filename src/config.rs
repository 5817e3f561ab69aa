use crate::constants::{
    DEFAULT_LOG_LEVEL, DEFAULT_METRICS_TIMEOUT_SECS, DEFAULT_METRICS_URL, DEFAULT_STORE_PATH,
    ENV_LOG_LEVEL, ENV_METRICS_URL, ENV_STORE_PATH,
};
use crate::error::{MapFoldError, MapFoldResult};
use crate::host::HOST_RECORD_TYPE;
use crate::logging::parse_level;
use crate::metrics::{region_server_charts, share_load_groups, MetricChartConfig};
use crate::schema::mapper::{parse_mapping_dsl, MappingRule, TransformFailurePolicy};
use crate::schema::{AttributeKind, FieldPath, RecordType};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFoldConfig {
    /// Register the built-in host record type and its rules
    #[serde(default = "default_true")]
    pub host_rules: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub record_types: Vec<RecordTypeConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database directory, used by the sled backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// A record type and its rules. Rules may be written in the mapping DSL,
/// as a structured list, or both; DSL rules come first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTypeConfig {
    pub name: String,
    pub key_field: String,
    #[serde(default = "default_failure_policy")]
    pub on_transform_failure: TransformFailurePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_dsl: Option<String>,
    /// Declared attributes. Empty means any attribute may be written.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeKind>,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_url")]
    pub base_url: String,
    #[serde(default = "default_metrics_timeout")]
    pub timeout_secs: u64,
    /// Refetch cached load groups older than this. Unset caches until invalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
    /// Include the built-in RegionServer charts
    #[serde(default = "default_true")]
    pub region_server_charts: bool,
    #[serde(default)]
    pub charts: Vec<MetricChartConfig>,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_failure_policy() -> TransformFailurePolicy {
    TransformFailurePolicy::Skip
}

fn default_metrics_url() -> String {
    DEFAULT_METRICS_URL.to_string()
}

fn default_metrics_timeout() -> u64 {
    DEFAULT_METRICS_TIMEOUT_SECS
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: default_store_path(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: default_metrics_url(),
            timeout_secs: default_metrics_timeout(),
            cache_ttl_secs: None,
            region_server_charts: true,
            charts: Vec::new(),
        }
    }
}

impl Default for MapFoldConfig {
    fn default() -> Self {
        Self {
            host_rules: true,
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            record_types: Vec::new(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl RecordTypeConfig {
    pub fn record_type(&self) -> MapFoldResult<RecordType> {
        let key_field = FieldPath::parse(&self.key_field).map_err(|e| {
            MapFoldError::Config(format!("record type '{}': {}", self.name, e))
        })?;
        let mut record_type = RecordType::new(self.name.clone(), key_field);
        record_type.attributes = self.attributes.clone();
        Ok(record_type)
    }

    pub fn mapping_rules(&self) -> MapFoldResult<Vec<MappingRule>> {
        let mut rules = match &self.rules_dsl {
            Some(dsl) => parse_mapping_dsl(dsl)?,
            None => Vec::new(),
        };
        rules.extend(self.rules.iter().cloned());
        Ok(rules)
    }
}

impl MetricsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Built-in and configured charts, with same-named load groups merged.
    pub fn all_charts(&self) -> Vec<MetricChartConfig> {
        let mut charts = if self.region_server_charts {
            region_server_charts()
        } else {
            Vec::new()
        };
        charts.extend(self.charts.iter().cloned());
        share_load_groups(&mut charts);
        charts
    }
}

impl MapFoldConfig {
    pub fn from_toml_str(content: &str) -> MapFoldResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file, apply environment overrides and validate.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MapFoldResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MapFoldError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> MapFoldResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(path) = lookup(ENV_STORE_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(url) = lookup(ENV_METRICS_URL) {
            self.metrics.base_url = url;
        }
    }

    pub fn log_level(&self) -> MapFoldResult<LevelFilter> {
        parse_level(&self.logging.level).ok_or_else(|| {
            MapFoldError::Config(format!("unknown log level '{}'", self.logging.level))
        })
    }

    pub fn validate(&self) -> MapFoldResult<()> {
        self.log_level()?;

        if self.store.backend == StoreBackend::Sled && self.store.path.as_os_str().is_empty() {
            return Err(MapFoldError::Config("sled store needs a path".into()));
        }

        let mut names = HashSet::new();
        if self.host_rules {
            names.insert(HOST_RECORD_TYPE.to_string());
        }
        for record_type in &self.record_types {
            if record_type.name.trim().is_empty() {
                return Err(MapFoldError::Config("record type with an empty name".into()));
            }
            if !names.insert(record_type.name.clone()) {
                return Err(MapFoldError::Config(format!(
                    "record type '{}' is declared more than once",
                    record_type.name
                )));
            }
            record_type.record_type()?;
            record_type.mapping_rules()?;
        }

        if self.metrics.timeout_secs == 0 {
            return Err(MapFoldError::Config("metrics timeout must be positive".into()));
        }
        if self.metrics.cache_ttl_secs == Some(0) {
            return Err(MapFoldError::Config("metrics cache ttl must be positive".into()));
        }
        let mut chart_ids = HashSet::new();
        for chart in self.metrics.all_charts() {
            chart.validate()?;
            if !chart_ids.insert(chart.id.clone()) {
                return Err(MapFoldError::Config(format!("duplicate chart id '{}'", chart.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mapper::Presence;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[store]
backend = "sled"
path = "/var/lib/mapfold"

[[record_types]]
name = "service"
key_field = "service_name"
on_transform_failure = "abort"
rules_dsl = """
MAP service_state TO state
MAP maintenance_state TO passiveState WITH to_uppercase
"""

[record_types.attributes]
state = "string"
passiveState = "string"

[[record_types.rules]]
target_field = "alerts"
source_path = "alerts_summary.CRITICAL"
presence = "clear_if_absent"
"#;

    #[test]
    fn test_parse_sample() {
        let config = MapFoldConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
        assert_eq!(config.store.backend, StoreBackend::Sled);
        assert!(config.host_rules);

        let service = &config.record_types[0];
        assert_eq!(service.on_transform_failure, TransformFailurePolicy::Abort);
        let rules = service.mapping_rules().unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[1].function.as_deref(), Some("to_uppercase"));
        assert_eq!(rules[2].presence, Presence::ClearIfAbsent);
        assert!(!service.record_type().unwrap().is_open());
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = MapFoldConfig::from_toml_str("").unwrap();
        assert_eq!(config, MapFoldConfig::default());
        assert_eq!(config.metrics.timeout(), Duration::from_secs(30));
        assert_eq!(config.metrics.all_charts().len(), 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let mut config = MapFoldConfig::default();
        config.apply_overrides(|name| match name {
            ENV_LOG_LEVEL => Some("warn".to_string()),
            ENV_METRICS_URL => Some("http://collector:6188".to_string()),
            _ => None,
        });
        assert_eq!(config.log_level().unwrap(), LevelFilter::Warn);
        assert_eq!(config.metrics.base_url, "http://collector:6188");
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_STORE_PATH));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = MapFoldConfig::default();
        config.logging.level = "chatty".into();
        assert!(matches!(config.validate(), Err(MapFoldError::Config(_))));

        let config = MapFoldConfig::from_toml_str(
            r#"
[[record_types]]
name = "host"
key_field = "host_name"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(MapFoldError::Config(_))));

        let config = MapFoldConfig::from_toml_str(
            r#"
[[record_types]]
name = "service"
key_field = "service_name"
rules_dsl = "COPY a TO b"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(MapFoldError::Mapper(_))));

        let config = MapFoldConfig::from_toml_str("[metrics]\ncache_ttl_secs = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(MapFoldError::Config(_))));
    }

    #[test]
    fn test_metrics_cache_ttl() {
        assert_eq!(MapFoldConfig::default().metrics.cache_ttl(), None);
        let config = MapFoldConfig::from_toml_str("[metrics]\ncache_ttl_secs = 15\n").unwrap();
        assert_eq!(config.metrics.cache_ttl(), Some(Duration::from_secs(15)));
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MapFoldConfig::from_toml_str(SAMPLE).unwrap();
        let written = config.to_toml_string().unwrap();
        assert_eq!(MapFoldConfig::from_toml_str(&written).unwrap(), config);
    }
}
