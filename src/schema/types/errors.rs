use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while defining rule sets, registering mappers or mapping
/// a source event onto a target record.
#[derive(Error, Debug)]
pub enum MapperError {
    /// Duplicate or malformed rule definitions. Fatal at start-up.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No rule set was ever defined for the record type
    #[error("Unknown record type: {record_type}")]
    UnknownRecordType { record_type: String },

    /// No mapper is registered for the record type
    #[error("No mapper registered for record type: {record_type}")]
    UnregisteredType { record_type: String },

    /// The source event lacks the natural key of its record type
    #[error("Event for record type {record_type} is missing its key field {key_field}")]
    MissingKey {
        record_type: String,
        key_field: String,
    },

    /// A transform or typed setter rejected a value and the rule set aborts on failure
    #[error("Transform failed for field {field}: {source}")]
    Transform {
        field: String,
        #[source]
        source: TransformError,
    },

    /// Mapping DSL could not be parsed
    #[error("Invalid DSL: {0}")]
    InvalidDsl(String),

    /// The record store rejected a read or write
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MapperError {
    /// Whether the error only concerns the one event being mapped.
    ///
    /// Event-level errors are dropped by the dispatcher; every other kind
    /// points at configuration or the store.
    pub fn is_event_error(&self) -> bool {
        matches!(
            self,
            MapperError::MissingKey { .. } | MapperError::Transform { .. }
        )
    }
}

/// Failure of a single value transform or attribute type check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("{function} cannot convert {value}: {reason}")]
    InvalidInput {
        function: String,
        value: String,
        reason: String,
    },

    #[error("attribute {attribute} expects {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },
}

impl TransformError {
    pub fn invalid_input(function: &str, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        TransformError::InvalidInput {
            function: function.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type MapperResult<T> = Result<T, MapperError>;
