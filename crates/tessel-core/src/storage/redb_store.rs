//! # redb-backed Store
//!
//! A disk-backed keyspace using the redb embedded database.
//!
//! - One table maps each key to a postcard-encoded `Entry`
//! - Every script runs inside a single redb write transaction, so it is
//!   serializable with respect to every other writer and is aborted on error
//! - Reads use MVCC read transactions and never block writers
//!
//! redb calls are blocking; each one runs on `tokio::task::spawn_blocking`.

use super::{Entry, Hash, ScanCursor, ScanPage, ScriptContext, Store, StoreError};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Table for the keyspace: key -> serialized Entry
const KEYSPACE: TableDefinition<&str, &[u8]> = TableDefinition::new("keyspace");

fn io(e: impl std::fmt::Display) -> StoreError {
    StoreError::Io(e.to_string())
}

/// Script view over an open write-transaction table.
struct TableContext<'txn> {
    table: redb::Table<'txn, &'static str, &'static [u8]>,
}

impl ScriptContext for TableContext<'_> {
    fn load(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        let found = self.table.get(key).map_err(io)?;
        found
            .map(|bytes| Entry::from_bytes(key, bytes.value()))
            .transpose()
    }

    fn save(&mut self, key: &str, entry: Option<Entry>) -> Result<(), StoreError> {
        match entry {
            Some(entry) => {
                let bytes = entry.to_bytes(key)?;
                self.table.insert(key, bytes.as_slice()).map_err(io)?;
            }
            None => {
                self.table.remove(key).map_err(io)?;
            }
        }
        Ok(())
    }
}

/// A keyspace persisted in a redb database file.
pub struct RedbStore {
    db: Mutex<Option<Arc<Database>>>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a keyspace database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(io)?;

        // Initialize the table so read transactions can always open it
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(KEYSPACE).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        tracing::debug!(path = %path.display(), "opened redb store");
        Ok(Self {
            db: Mutex::new(Some(Arc::new(db))),
            path,
        })
    }

    fn handle(&self) -> Result<Arc<Database>, StoreError> {
        self.db
            .lock()
            .map_err(|_| StoreError::Io("redb store lock poisoned".to_string()))?
            .as_ref()
            .cloned()
            .ok_or(StoreError::Closed)
    }

    /// Run `f` against the database on the blocking pool.
    async fn blocking<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    {
        let db = self.handle()?;
        match tokio::task::spawn_blocking(move || f(&db)).await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Io(format!("blocking task failed: {e}")).into()),
        }
    }

    /// Run `f` against the keyspace table inside a read transaction.
    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&redb::ReadOnlyTable<&'static str, &'static [u8]>) -> Result<T, StoreError>
            + Send
            + 'static,
    {
        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(io)?;
            let table = read_txn.open_table(KEYSPACE).map_err(io)?;
            f(&table)
        })
        .await
    }

    async fn load(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        let key = key.to_owned();
        self.read(move |table| {
            let found = table.get(key.as_str()).map_err(io)?;
            found
                .map(|bytes| Entry::from_bytes(&key, bytes.value()))
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl Store for RedbStore {
    async fn eval<T, E, F>(&self, script: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E> + Send + 'static,
    {
        self.blocking(move |db| {
            let write_txn = db.begin_write().map_err(io)?;
            let outcome = {
                let table = write_txn.open_table(KEYSPACE).map_err(io)?;
                let mut ctx = TableContext { table };
                script(&mut ctx)
            };
            match outcome {
                Ok(value) => {
                    write_txn.commit().map_err(io)?;
                    Ok(value)
                }
                Err(e) => {
                    write_txn.abort().map_err(io)?;
                    Err(e)
                }
            }
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_owned();
        self.read(move |table| Ok(table.get(key.as_str()).map_err(io)?.is_some()))
            .await
    }

    async fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError> {
        match self.load(key).await? {
            Some(Entry::Hash(hash)) => Ok(Some(hash)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn lrange(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        match self.load(key).await? {
            Some(Entry::List(list)) => Ok(list),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn scan(
        &self,
        cursor: ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let prefix = prefix.to_owned();
        self.read(move |table| {
            let lower = match cursor.last_key() {
                Some(last) => Bound::Excluded(last),
                None => Bound::Included(prefix.as_str()),
            };
            let range = table
                .range::<&str>((lower, Bound::Unbounded))
                .map_err(io)?;
            let keys = range.map(|item| {
                item.map(|(key, _)| key.value().to_string())
                    .map_err(io)
            });
            ScanPage::collect(keys, &prefix, count)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let released = self
            .db
            .lock()
            .map_err(|_| StoreError::Io("redb store lock poisoned".to_string()))?
            .take();
        if released.is_some() {
            tracing::debug!(path = %self.path.display(), "closed redb store");
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
