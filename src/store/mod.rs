//! # Record Store
//!
//! Process-wide storage for target records, keyed by record type and
//! natural key. The mapper never owns records: it resolves a shared handle
//! through [`RecordResolver`], mutates it, and commits it back so that
//! subscribers observe the change.
//!
//! * `memory` - in-memory store, the default
//! * `sled_store` - persistent store on sled, records reloaded on open
//! * `resolver` - get-or-create on top of any store

pub mod memory;
pub mod record;
pub mod resolver;
pub mod sled_store;

pub use memory::InMemoryRecordStore;
pub use record::{RecordHandle, RecordId, TargetRecord};
pub use resolver::{RecordResolver, Resolved};
pub use sled_store::SledRecordStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::broadcast;

pub const CHANGE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Failed to serialize record {id}: {reason}")]
    Serialization { id: String, reason: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<sled::Error> for StoreError {
    fn from(error: sled::Error) -> Self {
        StoreError::Backend(error.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Full copy of the store contents, ordered by record id.
pub type StoreSnapshot = BTreeMap<RecordId, TargetRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

/// Notification sent to store subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub id: RecordId,
    pub version: u64,
    pub kind: ChangeKind,
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone)]
pub struct Inserted {
    pub handle: RecordHandle,
    /// false when a record already existed and was returned instead
    pub created: bool,
}

/// Record store collaborator.
pub trait RecordStore: Send + Sync {
    fn find_or_null(&self, record_type: &str, key: &str) -> StoreResult<Option<RecordHandle>>;

    /// Insert the record unless one already exists under its id, in which
    /// case the existing handle is returned and `record` is discarded.
    fn insert(&self, record: TargetRecord) -> StoreResult<Inserted>;

    /// Write back a record after it was mutated through its handle.
    fn commit(&self, handle: &RecordHandle) -> StoreResult<()>;

    /// Delete a record. The mapper itself never calls this.
    fn remove(&self, record_type: &str, key: &str) -> StoreResult<Option<TargetRecord>>;

    fn snapshot(&self) -> StoreResult<StoreSnapshot>;

    fn subscribe(&self) -> broadcast::Receiver<RecordChange>;

    fn len(&self) -> StoreResult<usize> {
        Ok(self.snapshot()?.len())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Read a record out of its handle.
pub fn read_record(handle: &RecordHandle) -> StoreResult<TargetRecord> {
    handle
        .read()
        .map(|record| record.clone())
        .map_err(|_| StoreError::LockPoisoned("record handle".to_string()))
}
