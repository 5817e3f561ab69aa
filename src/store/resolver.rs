use super::{RecordHandle, RecordStore, StoreError, StoreResult, TargetRecord};
use crate::schema::RecordType;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Handle returned by [`RecordResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handle: RecordHandle,
    pub created: bool,
}

/// Get-or-create access to target records.
///
/// The fast path is a plain lookup. Creation is serialized so that two
/// concurrent resolutions of the same key cannot both allocate a record,
/// even on a store whose insert is not itself insert-if-absent.
pub struct RecordResolver {
    store: Arc<dyn RecordStore>,
    creation: Mutex<()>,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            creation: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn resolve(&self, record_type: &RecordType, key: &str) -> StoreResult<Resolved> {
        self.resolve_with_value(record_type, key, Value::String(key.to_string()))
    }

    /// Get-or-create by `key`; a newly created record stores `key_value`
    /// in its key attribute. Existing records are returned untouched.
    pub fn resolve_with_value(
        &self,
        record_type: &RecordType,
        key: &str,
        key_value: Value,
    ) -> StoreResult<Resolved> {
        if let Some(handle) = self.store.find_or_null(&record_type.name, key)? {
            return Ok(Resolved {
                handle,
                created: false,
            });
        }

        let _guard = self
            .creation
            .lock()
            .map_err(|_| StoreError::LockPoisoned("resolver".to_string()))?;

        if let Some(handle) = self.store.find_or_null(&record_type.name, key)? {
            return Ok(Resolved {
                handle,
                created: false,
            });
        }

        let record = TargetRecord::with_key_value(
            record_type.name.clone(),
            record_type.key_attribute(),
            key,
            key_value,
        );
        let inserted = self.store.insert(record)?;
        Ok(Resolved {
            handle: inserted.handle,
            created: inserted.created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldPath;
    use crate::store::InMemoryRecordStore;
    use serde_json::json;
    use std::thread;

    fn host_type() -> RecordType {
        RecordType::new("host", FieldPath::parse("host_name").unwrap())
    }

    #[test]
    fn test_resolve_is_get_or_create() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let resolver = RecordResolver::new(Arc::clone(&store));
        let host = host_type();

        let first = resolver.resolve(&host, "h1").unwrap();
        let second = resolver.resolve(&host, "h1").unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.handle, &second.handle));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_numeric_key_keeps_its_type() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let resolver = RecordResolver::new(Arc::clone(&store));
        let host = host_type();

        let created = resolver.resolve_with_value(&host, "42", json!(42)).unwrap();
        let again = resolver.resolve(&host, "42").unwrap();
        assert!(created.created);
        assert!(Arc::ptr_eq(&created.handle, &again.handle));
        assert_eq!(created.handle.read().unwrap().get("host_name"), Some(&json!(42)));
    }

    #[test]
    fn test_concurrent_resolution_creates_one_record() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let resolver = Arc::new(RecordResolver::new(Arc::clone(&store)));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                thread::spawn(move || resolver.resolve(&host_type(), "h1").unwrap())
            })
            .collect();
        let results: Vec<Resolved> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.created).count(), 1);
        assert!(results
            .windows(2)
            .all(|pair| Arc::ptr_eq(&pair[0].handle, &pair[1].handle)));
        assert_eq!(store.len().unwrap(), 1);
    }
}
