//! # Field Mapping
//!
//! Declarative remapping of server-sent events onto keyed target records.
//!
//! * `types` - mapping rules and failure policies
//! * `dsl` - the `MAP source TO target` rule language
//! * `transforms` - named value transforms
//! * `rule_set` - validation and compilation of rule sets per record type
//! * `engine` - applies a rule set to an event
//! * `dispatcher` - routes events to the mapper of their record type

pub mod dispatcher;
mod dsl;
pub mod engine;
pub mod rule_set;
pub mod transforms;
pub mod types;

pub use dispatcher::{BatchSummary, DispatchOutcome, MapperRegistry};
pub use dsl::{format_mapping_dsl, parse_mapping_dsl};
pub use engine::{MappingReport, RecordMapper};
pub use rule_set::{CompiledRule, RuleSet, RuleSetRegistry};
pub use transforms::{NamedTransform, TransformFn, TransformRegistry};
pub use types::{MappingRule, Presence, TransformFailurePolicy};
