use serde::{Deserialize, Serialize};

/// What a rule does when its source field is absent from an event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Skip the rule and keep the previously known value.
    #[default]
    Required,
    /// Run the rule with `null`, clearing the attribute.
    ClearIfAbsent,
}

/// One field mapping: `source_path` on the event to `target_field` on the record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub target_field: String,
    pub source_path: String,
    /// Name of a transform in the transform registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default)]
    pub presence: Presence,
}

impl MappingRule {
    pub fn new(target_field: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            target_field: target_field.into(),
            source_path: source_path.into(),
            function: None,
            presence: Presence::Required,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn clear_if_absent(mut self) -> Self {
        self.presence = Presence::ClearIfAbsent;
        self
    }
}

/// How a rule set reacts to a failing transform or type check.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransformFailurePolicy {
    /// Drop the failing field and keep mapping the others.
    Skip,
    /// Abort the whole mapping call; nothing is written.
    Abort,
}
