//! The mapper engine: applies a rule set to one source event.
//!
//! Mapping is all-or-nothing with respect to key extraction and
//! transform aborts (nothing is created or written) and per-field partial
//! with respect to absent source fields, which are skipped so that sparse
//! payloads never clobber previously known values.

use super::rule_set::{CompiledRule, RuleSet};
use super::types::{Presence, TransformFailurePolicy};
use crate::schema::{MapperError, MapperResult, SourceEvent, TransformError};
use crate::store::{read_record, RecordResolver, StoreError, TargetRecord};
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one mapping call.
#[derive(Debug, Clone)]
pub struct MappingReport {
    pub record: TargetRecord,
    /// The record did not exist before this call
    pub created: bool,
    /// Attributes whose value changed
    pub written: Vec<String>,
    /// Attributes whose source was present but already held the same value
    pub unchanged: Vec<String>,
    /// Attributes whose source field was absent
    pub skipped: Vec<String>,
    /// Attributes dropped by a transform failure under the skip policy
    pub failed: Vec<(String, TransformError)>,
}

impl MappingReport {
    pub fn changed(&self) -> bool {
        !self.written.is_empty()
    }
}

/// Binds one rule set to one record type.
pub struct RecordMapper {
    rules: Arc<RuleSet>,
    resolver: Arc<RecordResolver>,
}

struct StagedWrite<'a> {
    rule: &'a CompiledRule,
    value: Value,
}

impl RecordMapper {
    pub fn new(rules: Arc<RuleSet>, resolver: Arc<RecordResolver>) -> Self {
        Self { rules, resolver }
    }

    pub fn record_type(&self) -> &str {
        &self.rules.record_type().name
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Map an event onto its target record and return the updated record.
    pub fn apply(&self, event: &SourceEvent) -> MapperResult<TargetRecord> {
        self.apply_detailed(event).map(|report| report.record)
    }

    pub fn apply_detailed(&self, event: &SourceEvent) -> MapperResult<MappingReport> {
        let record_type = self.rules.record_type();
        let key_value = event.get(&record_type.key_field);
        let key = record_type
            .extract_key(key_value)
            .ok_or_else(|| MapperError::MissingKey {
                record_type: record_type.name.clone(),
                key_field: record_type.key_field.to_string(),
            })?;

        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let staged = self.stage(event, &key, &mut skipped, &mut failed)?;

        let key_value = key_value
            .cloned()
            .unwrap_or_else(|| Value::String(key.clone()));
        let resolved = self
            .resolver
            .resolve_with_value(record_type, &key, key_value)?;
        let mut written = Vec::new();
        let mut unchanged = Vec::new();
        {
            let mut record = resolved
                .handle
                .write()
                .map_err(|_| StoreError::LockPoisoned(format!("record {}:{}", record_type.name, key)))?;
            for write in staged {
                let attribute = write.rule.target_field();
                if record.set(attribute, write.value) {
                    debug!("{}:{} set {}", record_type.name, key, attribute);
                    written.push(attribute.to_string());
                } else {
                    unchanged.push(attribute.to_string());
                }
            }
            if !written.is_empty() {
                record.touch();
            }
        }

        if !written.is_empty() {
            self.resolver.store().commit(&resolved.handle)?;
        }

        Ok(MappingReport {
            record: read_record(&resolved.handle)?,
            created: resolved.created,
            written,
            unchanged,
            skipped,
            failed,
        })
    }

    /// Walk the rules and compute every write without touching the store.
    fn stage<'a>(
        &'a self,
        event: &SourceEvent,
        key: &str,
        skipped: &mut Vec<String>,
        failed: &mut Vec<(String, TransformError)>,
    ) -> MapperResult<Vec<StagedWrite<'a>>> {
        let mut staged = Vec::with_capacity(self.rules.len());

        for rule in self.rules.rules() {
            let source = match (event.get(&rule.source_path), rule.presence) {
                (Some(value), _) => value.clone(),
                (None, Presence::ClearIfAbsent) => Value::Null,
                (None, Presence::Required) => {
                    skipped.push(rule.target_field().to_string());
                    continue;
                }
            };

            let result = match &rule.transform {
                Some(transform) => transform.apply(&source),
                None => Ok(source),
            }
            .and_then(|value| rule.setter.check(&value).map(|_| value));

            match result {
                Ok(value) => staged.push(StagedWrite { rule, value }),
                Err(error) => match self.rules.policy() {
                    TransformFailurePolicy::Skip => {
                        warn!(
                            "Skipping {} for {}:{}: {}",
                            rule.target_field(),
                            self.record_type(),
                            key,
                            error
                        );
                        failed.push((rule.target_field().to_string(), error));
                    }
                    TransformFailurePolicy::Abort => {
                        return Err(MapperError::Transform {
                            field: rule.target_field().to_string(),
                            source: error,
                        })
                    }
                },
            }
        }

        Ok(staged)
    }
}
