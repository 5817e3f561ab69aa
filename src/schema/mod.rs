pub mod mapper;
pub mod types;

// Re-export all types at the schema module level
pub use types::{
    AttributeKind,
    FieldPath,
    FieldSetter,
    MapperError,
    MapperResult,
    RecordType,
    SourceEvent,
    TransformError,
};
