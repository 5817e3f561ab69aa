use super::{
    read_record, ChangeKind, Inserted, RecordChange, RecordHandle, RecordId, RecordStore,
    StoreError, StoreResult, StoreSnapshot, TargetRecord, CHANGE_CHANNEL_CAPACITY,
};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Record store held entirely in memory.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, RecordHandle>>,
    sender: broadcast::Sender<RecordChange>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            sender,
        }
    }

    /// Load records without notifying subscribers. Existing ids are replaced.
    pub(crate) fn preload(&self, records: Vec<TargetRecord>) -> StoreResult<()> {
        let mut index = self.write_index()?;
        for record in records {
            index.insert(record.id(), Arc::new(RwLock::new(record)));
        }
        Ok(())
    }

    pub(crate) fn notify(&self, id: RecordId, version: u64, kind: ChangeKind) {
        // No subscribers is not an error
        let _ = self.sender.send(RecordChange { id, version, kind });
    }

    fn write_index(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<RecordId, RecordHandle>>> {
        self.records
            .write()
            .map_err(|_| StoreError::LockPoisoned("record index".to_string()))
    }

    fn read_index(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<RecordId, RecordHandle>>> {
        self.records
            .read()
            .map_err(|_| StoreError::LockPoisoned("record index".to_string()))
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_or_null(&self, record_type: &str, key: &str) -> StoreResult<Option<RecordHandle>> {
        let index = self.read_index()?;
        Ok(index.get(&RecordId::new(record_type, key)).cloned())
    }

    fn insert(&self, record: TargetRecord) -> StoreResult<Inserted> {
        let id = record.id();
        let version = record.version;
        let inserted = {
            let mut index = self.write_index()?;
            match index.get(&id) {
                Some(existing) => Inserted {
                    handle: Arc::clone(existing),
                    created: false,
                },
                None => {
                    let handle = Arc::new(RwLock::new(record));
                    index.insert(id.clone(), Arc::clone(&handle));
                    Inserted {
                        handle,
                        created: true,
                    }
                }
            }
        };
        if inserted.created {
            debug!("Created record {}", id);
            self.notify(id, version, ChangeKind::Created);
        }
        Ok(inserted)
    }

    fn commit(&self, handle: &RecordHandle) -> StoreResult<()> {
        let record = read_record(handle)?;
        let id = record.id();
        let registered = {
            let index = self.read_index()?;
            index.get(&id).map(|h| Arc::ptr_eq(h, handle)).unwrap_or(false)
        };
        if !registered {
            // Handle came from elsewhere (or was removed); re-register it.
            self.write_index()?.insert(id.clone(), Arc::clone(handle));
        }
        self.notify(id, record.version, ChangeKind::Updated);
        Ok(())
    }

    fn remove(&self, record_type: &str, key: &str) -> StoreResult<Option<TargetRecord>> {
        let id = RecordId::new(record_type, key);
        let removed = self.write_index()?.remove(&id);
        match removed {
            Some(handle) => {
                let record = read_record(&handle)?;
                self.notify(id, record.version, ChangeKind::Removed);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let index = self.read_index()?;
        index
            .iter()
            .map(|(id, handle)| Ok((id.clone(), read_record(handle)?)))
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.sender.subscribe()
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read_index()?.len())
    }
}
