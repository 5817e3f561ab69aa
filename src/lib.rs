//! # MapFold
//!
//! MapFold keeps typed records in step with loosely structured state
//! events. Each record type declares where its natural key lives and a set
//! of field mapping rules; every incoming event resolves (or creates) the
//! record for its key and copies the mapped fields across.
//!
//! ## Core Components
//!
//! * `schema` - Record types, field paths, mapping rules and the mapping engine
//! * `store` - Record stores (in-memory and sled backed) and get-or-create resolution
//! * `host` - Built-in rules for host state events
//! * `metrics` - Metric chart views sharing coalesced load-group fetches
//! * `components` - Search and archive list components with explicit action channels
//! * `config` / `setup` - TOML configuration and runtime wiring
//!
//! ## Example
//!
//! ```no_run
//! use mapfold::{build_runtime, MapFoldConfig, SourceEvent};
//! use serde_json::json;
//!
//! let runtime = build_runtime(&MapFoldConfig::default()).unwrap();
//! let event = SourceEvent::from_value(json!({
//!     "host_name": "c7401.ambari.apache.org",
//!     "host_state": "HEALTHY"
//! }))
//! .unwrap();
//! let record = runtime.mappers.dispatch("host", &event).unwrap();
//! assert_eq!(record.get("state"), Some(&json!("HEALTHY")));
//! ```

pub mod components;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod schema;
pub mod setup;
pub mod store;

pub use config::{MapFoldConfig, RecordTypeConfig, StoreBackend};
pub use error::{MapFoldError, MapFoldResult};
pub use schema::mapper::{
    MapperRegistry, MappingReport, MappingRule, RecordMapper, RuleSetRegistry, TransformFailurePolicy,
    TransformRegistry,
};
pub use schema::{AttributeKind, FieldPath, MapperError, RecordType, SourceEvent};
pub use setup::{build_runtime, MapFoldRuntime};
pub use store::{InMemoryRecordStore, RecordResolver, RecordStore, SledRecordStore, TargetRecord};
