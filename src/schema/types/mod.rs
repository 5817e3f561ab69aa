pub mod errors;
pub mod event;
pub mod path;
pub mod record_type;
pub use errors::{MapperError, MapperResult, TransformError};
pub use event::SourceEvent;
pub use path::FieldPath;
pub use record_type::{AttributeKind, FieldSetter, RecordType};
