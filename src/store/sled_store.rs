use super::memory::InMemoryRecordStore;
use super::{
    read_record, Inserted, RecordChange, RecordHandle, RecordStore, StoreError,
    StoreResult, StoreSnapshot, TargetRecord,
};
use log::{debug, info};
use std::path::Path;
use tokio::sync::broadcast;

const RECORDS_TREE: &str = "records";

/// Record store persisted in sled.
///
/// Handles live in an in-memory index so that resolution returns the same
/// handle for the same key; every insert and commit is written through as
/// JSON under `record_type:key` and flushed.
pub struct SledRecordStore {
    db: sled::Db,
    records_tree: sled::Tree,
    index: InMemoryRecordStore,
}

impl SledRecordStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is deleted when dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let records_tree = db.open_tree(RECORDS_TREE)?;
        let index = InMemoryRecordStore::new();

        let mut loaded = Vec::new();
        for entry in records_tree.iter() {
            let (key, bytes) = entry?;
            let record: TargetRecord =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                    id: String::from_utf8_lossy(&key).to_string(),
                    reason: e.to_string(),
                })?;
            loaded.push(record);
        }
        info!("Loaded {} records from sled", loaded.len());
        index.preload(loaded)?;

        Ok(Self {
            db,
            records_tree,
            index,
        })
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn storage_key(record: &TargetRecord) -> String {
        format!("{}:{}", record.record_type, record.key)
    }

    fn persist(&self, record: &TargetRecord) -> StoreResult<()> {
        let key = Self::storage_key(record);
        let bytes = serde_json::to_vec(record).map_err(|e| StoreError::Serialization {
            id: key.clone(),
            reason: e.to_string(),
        })?;
        self.records_tree.insert(key.as_bytes(), bytes)?;
        self.records_tree.flush()?;
        debug!("Persisted record {} (version {})", key, record.version);
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    fn find_or_null(&self, record_type: &str, key: &str) -> StoreResult<Option<RecordHandle>> {
        self.index.find_or_null(record_type, key)
    }

    fn insert(&self, record: TargetRecord) -> StoreResult<Inserted> {
        let inserted = self.index.insert(record)?;
        if inserted.created {
            self.persist(&read_record(&inserted.handle)?)?;
        }
        Ok(inserted)
    }

    fn commit(&self, handle: &RecordHandle) -> StoreResult<()> {
        self.persist(&read_record(handle)?)?;
        self.index.commit(handle)
    }

    fn remove(&self, record_type: &str, key: &str) -> StoreResult<Option<TargetRecord>> {
        self.records_tree
            .remove(format!("{}:{}", record_type, key).as_bytes())?;
        self.records_tree.flush()?;
        self.index.remove(record_type, key)
    }

    fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        self.index.snapshot()
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.index.subscribe()
    }

    fn len(&self) -> StoreResult<usize> {
        self.index.len()
    }
}

impl SledRecordStore {
    /// Number of records on disk, which may differ from the index only
    /// while a write is in progress.
    pub fn persisted_len(&self) -> usize {
        self.records_tree.len()
    }
}
