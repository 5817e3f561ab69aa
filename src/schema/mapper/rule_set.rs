//! Rule set definition and validation.
//!
//! A rule set is compiled once per record type: source paths are parsed,
//! transforms resolved by name and typed setters bound. Compiled rule sets
//! are immutable and shared across every mapping call.

use super::transforms::{NamedTransform, TransformRegistry};
use super::types::{MappingRule, Presence, TransformFailurePolicy};
use crate::schema::{FieldPath, FieldSetter, MapperError, MapperResult, RecordType};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

static ATTRIBUTE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("attribute name pattern"));

/// A validated rule, ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub source_path: FieldPath,
    pub setter: FieldSetter,
    pub transform: Option<NamedTransform>,
    pub presence: Presence,
}

impl CompiledRule {
    pub fn target_field(&self) -> &str {
        self.setter.attribute()
    }

    /// The rule in its declarative form.
    pub fn to_rule(&self) -> MappingRule {
        MappingRule {
            target_field: self.target_field().to_string(),
            source_path: self.source_path.to_string(),
            function: self.transform.as_ref().map(|t| t.name().to_string()),
            presence: self.presence,
        }
    }
}

/// Ordered rules for one record type.
#[derive(Debug, Clone)]
pub struct RuleSet {
    record_type: Arc<RecordType>,
    policy: TransformFailurePolicy,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Validate and compile `rules` for `record_type`.
    ///
    /// # Errors
    ///
    /// Returns `MapperError::Configuration` if:
    /// - Two rules share a target attribute
    /// - A target name is not an identifier, or equals the key attribute
    /// - A source path is malformed
    /// - A transform name is not registered
    /// - The record type declares attributes and the target is not one of them
    pub fn compile(
        record_type: Arc<RecordType>,
        rules: Vec<MappingRule>,
        policy: TransformFailurePolicy,
        transforms: &TransformRegistry,
    ) -> MapperResult<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.into_iter().enumerate() {
            let target = rule.target_field.trim();
            if !ATTRIBUTE_NAME.is_match(target) {
                return Err(MapperError::Configuration(format!(
                    "rule {} for '{}' has malformed target attribute '{}'",
                    index + 1,
                    record_type.name,
                    rule.target_field
                )));
            }
            if !seen.insert(target.to_string()) {
                return Err(MapperError::Configuration(format!(
                    "duplicate target attribute '{}' in rules for '{}'",
                    target, record_type.name
                )));
            }
            if target == record_type.key_attribute() {
                return Err(MapperError::Configuration(format!(
                    "rule {} for '{}' overwrites the key attribute '{}'",
                    index + 1,
                    record_type.name,
                    target
                )));
            }

            let source_path = FieldPath::parse(&rule.source_path).map_err(|e| {
                MapperError::Configuration(format!(
                    "rule {} for '{}': {}",
                    index + 1,
                    record_type.name,
                    e
                ))
            })?;

            let setter = record_type.setter_for(target).ok_or_else(|| {
                MapperError::Configuration(format!(
                    "record type '{}' does not declare attribute '{}'",
                    record_type.name, target
                ))
            })?;

            let transform = match rule.function.as_deref() {
                Some(name) => Some(transforms.resolve(name).ok_or_else(|| {
                    MapperError::Configuration(format!(
                        "unknown transform '{}' for attribute '{}' of '{}'",
                        name, target, record_type.name
                    ))
                })?),
                None => None,
            };

            compiled.push(CompiledRule {
                source_path,
                setter,
                transform,
                presence: rule.presence,
            });
        }

        Ok(Self {
            record_type,
            policy,
            rules: compiled,
        })
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn policy(&self) -> TransformFailurePolicy {
        self.policy
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Process-wide table of record types and their rule sets.
#[derive(Debug, Default)]
pub struct RuleSetRegistry {
    transforms: TransformRegistry,
    record_types: HashMap<String, Arc<RecordType>>,
    rule_sets: HashMap<String, Arc<RuleSet>>,
}

impl RuleSetRegistry {
    pub fn new(transforms: TransformRegistry) -> Self {
        Self {
            transforms,
            record_types: HashMap::new(),
            rule_sets: HashMap::new(),
        }
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformRegistry {
        &mut self.transforms
    }

    /// Declare a record type. Redeclaring a type is a configuration error.
    pub fn define_record_type(&mut self, record_type: RecordType) -> MapperResult<Arc<RecordType>> {
        if record_type.name.trim().is_empty() {
            return Err(MapperError::Configuration(
                "record type name is empty".to_string(),
            ));
        }
        if self.record_types.contains_key(&record_type.name) {
            return Err(MapperError::Configuration(format!(
                "record type '{}' is already declared",
                record_type.name
            )));
        }
        let record_type = Arc::new(record_type);
        self.record_types
            .insert(record_type.name.clone(), Arc::clone(&record_type));
        Ok(record_type)
    }

    pub fn record_type(&self, name: &str) -> Option<Arc<RecordType>> {
        self.record_types.get(name).cloned()
    }

    /// Define the rule set of a declared record type.
    pub fn define_rules(
        &mut self,
        record_type: &str,
        rules: Vec<MappingRule>,
        policy: TransformFailurePolicy,
    ) -> MapperResult<Arc<RuleSet>> {
        let declared = self.record_types.get(record_type).cloned().ok_or_else(|| {
            MapperError::Configuration(format!(
                "rules defined for undeclared record type '{}'",
                record_type
            ))
        })?;
        if self.rule_sets.contains_key(record_type) {
            return Err(MapperError::Configuration(format!(
                "rules for '{}' are already defined",
                record_type
            )));
        }

        let rule_set = Arc::new(RuleSet::compile(declared, rules, policy, &self.transforms)?);
        info!(
            "Defined {} mapping rules for record type '{}' ({:?} on transform failure)",
            rule_set.len(),
            record_type,
            policy
        );
        self.rule_sets
            .insert(record_type.to_string(), Arc::clone(&rule_set));
        Ok(rule_set)
    }

    pub fn rules_for(&self, record_type: &str) -> MapperResult<Arc<RuleSet>> {
        self.rule_sets
            .get(record_type)
            .cloned()
            .ok_or_else(|| MapperError::UnknownRecordType {
                record_type: record_type.to_string(),
            })
    }

    pub fn record_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rule_sets.keys().cloned().collect();
        names.sort();
        names
    }
}
