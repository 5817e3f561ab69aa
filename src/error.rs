use crate::components::ComponentError;
use crate::metrics::MetricsError;
use crate::schema::MapperError;
use crate::store::StoreError;
use std::fmt;
use std::io;

/// Crate-level error returned by configuration loading, runtime setup and
/// the command line front end.
///
/// Library layers keep their own error types; this one wraps them so a
/// caller can propagate any of them with `?`.
#[derive(Debug)]
pub enum MapFoldError {
    /// Mapping failures: unknown types, missing keys, aborted transforms
    Mapper(MapperError),

    Store(StoreError),

    Metrics(MetricsError),

    Component(ComponentError),

    /// Invalid or unreadable configuration
    Config(String),

    Io(io::Error),

    Serialization(String),
}

impl fmt::Display for MapFoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapper(err) => write!(f, "Mapper error: {}", err),
            Self::Store(err) => write!(f, "Store error: {}", err),
            Self::Metrics(err) => write!(f, "Metrics error: {}", err),
            Self::Component(err) => write!(f, "Component error: {}", err),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for MapFoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Mapper(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Metrics(err) => Some(err),
            Self::Component(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) | Self::Serialization(_) => None,
        }
    }
}

impl From<MapperError> for MapFoldError {
    fn from(error: MapperError) -> Self {
        MapFoldError::Mapper(error)
    }
}

impl From<StoreError> for MapFoldError {
    fn from(error: StoreError) -> Self {
        MapFoldError::Store(error)
    }
}

impl From<MetricsError> for MapFoldError {
    fn from(error: MetricsError) -> Self {
        MapFoldError::Metrics(error)
    }
}

impl From<ComponentError> for MapFoldError {
    fn from(error: ComponentError) -> Self {
        MapFoldError::Component(error)
    }
}

impl From<io::Error> for MapFoldError {
    fn from(error: io::Error) -> Self {
        MapFoldError::Io(error)
    }
}

impl From<serde_json::Error> for MapFoldError {
    fn from(error: serde_json::Error) -> Self {
        MapFoldError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for MapFoldError {
    fn from(error: toml::de::Error) -> Self {
        MapFoldError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for MapFoldError {
    fn from(error: toml::ser::Error) -> Self {
        MapFoldError::Serialization(error.to_string())
    }
}

pub type MapFoldResult<T> = Result<T, MapFoldError>;
