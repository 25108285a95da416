//! Process-local store.
//!
//! Scripts run against a copy-on-write overlay and are committed to the
//! keyspace only when they return `Ok`. The mutex is held for one script
//! or one read at a time and never across an await point.

use super::{Entry, Hash, ScanCursor, ScanPage, ScriptContext, Store, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

type Keyspace = BTreeMap<String, Entry>;

/// In-memory keyspace. Dropped on `close`.
#[derive(Debug)]
pub struct MemoryStore {
    keyspace: Mutex<Option<Keyspace>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending writes of a running script layered over the committed keyspace.
struct Overlay<'a> {
    base: &'a Keyspace,
    writes: BTreeMap<String, Option<Entry>>,
}

impl ScriptContext for Overlay<'_> {
    fn load(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        Ok(match self.writes.get(key) {
            Some(pending) => pending.clone(),
            None => self.base.get(key).cloned(),
        })
    }

    fn save(&mut self, key: &str, entry: Option<Entry>) -> Result<(), StoreError> {
        self.writes.insert(key.to_string(), entry);
        Ok(())
    }
}

impl MemoryStore {
    /// Create an empty, open store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keyspace: Mutex::new(Some(Keyspace::new())),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.read(|keyspace| Ok(keyspace.len()))
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.read(|keyspace| Ok(keyspace.is_empty()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Keyspace>>, StoreError> {
        self.keyspace
            .lock()
            .map_err(|_| StoreError::Io("memory store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Keyspace) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let guard = self.lock()?;
        let keyspace = guard.as_ref().ok_or(StoreError::Closed)?;
        f(keyspace)
    }

    fn run_script<T, E, F>(&self, script: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E>,
    {
        let mut guard = self.lock()?;
        let keyspace = guard.as_mut().ok_or(StoreError::Closed)?;

        let mut overlay = Overlay {
            base: keyspace,
            writes: BTreeMap::new(),
        };
        let value = script(&mut overlay)?;
        let Overlay { writes, .. } = overlay;

        for (key, entry) in writes {
            match entry {
                Some(entry) => {
                    keyspace.insert(key, entry);
                }
                None => {
                    keyspace.remove(&key);
                }
            }
        }
        Ok(value)
    }

    fn scan_keys(
        &self,
        cursor: &ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        self.read(|keyspace| {
            let lower = match cursor.last_key() {
                Some(last) => Bound::Excluded(last),
                None => Bound::Included(prefix),
            };
            let keys = keyspace
                .range::<str, _>((lower, Bound::Unbounded))
                .map(|(key, _)| Ok(key.clone()));
            ScanPage::collect(keys, prefix, count)
        })
    }

    fn shutdown(&self) -> Result<(), StoreError> {
        self.lock()?.take();
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn eval<T, E, F>(&self, script: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E> + Send + 'static,
    {
        self.run_script(script)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.read(|keyspace| Ok(keyspace.contains_key(key)))
    }

    async fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError> {
        self.read(|keyspace| {
            keyspace
                .get(key)
                .map(|entry| entry.as_hash(key).cloned())
                .transpose()
        })
    }

    async fn lrange(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.read(|keyspace| match keyspace.get(key) {
            Some(entry) => Ok(entry.as_list(key)?.to_vec()),
            None => Ok(Vec::new()),
        })
    }

    async fn scan(
        &self,
        cursor: ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        self.scan_keys(&cursor, prefix, count)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.shutdown()
    }
}

// =============================================================================
// TESTS
// =============================================================================
