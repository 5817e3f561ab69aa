//! Front-end components driven through an explicit action channel.

pub mod actions;
pub mod archive_config;
pub mod debounce;
pub mod file_search;

pub use actions::{action_channel, ActionReceiver, ActionSender, UiAction};
pub use archive_config::{ArchiveConfig, ARCHIVE_MODEL};
pub use debounce::{Debounce, DebouncedAction, TokioDebouncer};
pub use file_search::FileSearch;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Action channel closed")]
    ChannelClosed,

    #[error("Index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No file browser has been opened")]
    NoFileBrowserOpen,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}
