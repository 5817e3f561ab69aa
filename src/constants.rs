/// Defaults used when configuration or command line arguments leave a
/// value unset.
pub const DEFAULT_CONFIG_PATH: &str = "mapfold.toml";
pub const DEFAULT_STORE_PATH: &str = "data/records";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Per-request timeout of the metrics transport.
pub const DEFAULT_METRICS_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_METRICS_URL: &str = "http://localhost:6188/ws/v1/timeline";

/// Trailing-edge debounce window of the file search box.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 1000;

/// Lines kept in the in-process log buffer.
pub const LOG_BUFFER_CAPACITY: usize = 1000;

pub const ENV_LOG_LEVEL: &str = "MAPFOLD_LOG_LEVEL";
pub const ENV_STORE_PATH: &str = "MAPFOLD_STORE_PATH";
pub const ENV_METRICS_URL: &str = "MAPFOLD_METRICS_URL";
