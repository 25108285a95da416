//! # Store Capability
//!
//! The graph engine needs a key-value store that offers:
//! - counters, hashes and lists under string keys
//! - atomic execution of a multi-key script
//! - cursor-based scans over a key prefix
//!
//! `Store` is that capability. Two implementations ship in-tree:
//! - `MemoryStore`: process-local keyspace (volatile)
//! - `RedbStore`: redb-backed keyspace on disk (ACID, persistent)
//!
//! `Backend` selects between them at runtime.
//!
//! ## Scripts
//!
//! A script is a closure run by the store against a `ScriptContext`. Every
//! read and write it performs is one indivisible step for other clients. If
//! the closure returns `Err`, none of its writes become visible.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> raw bytes.
pub type Hash = BTreeMap<String, Vec<u8>>;

// =============================================================================
// ERRORS
// =============================================================================

/// Failures raised by the store itself (never by an engine script).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The handle was closed with `Store::close`.
    #[error("store connection is closed")]
    Closed,

    /// A command hit a key holding a different kind of entry.
    #[error("WRONGTYPE operation against key \"{0}\" holding the wrong kind of value")]
    WrongType(String),

    /// A counter would exceed `u64::MAX`.
    #[error("counter at key \"{0}\" overflowed")]
    Overflow(String),

    /// A stored entry could not be decoded.
    #[error("corrupt entry at key \"{key}\": {reason}")]
    Corrupt { key: String, reason: String },

    /// Underlying I/O or database failure.
    #[error("{0}")]
    Io(String),
}

// =============================================================================
// KEYSPACE ENTRIES
// =============================================================================

/// One value in the keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    Counter(u64),
    Hash(Hash),
    List(Vec<Vec<u8>>),
}

impl Entry {
    /// Borrow as a hash, or fail with `WrongType`.
    pub fn as_hash(&self, key: &str) -> Result<&Hash, StoreError> {
        match self {
            Self::Hash(hash) => Ok(hash),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Borrow as a list, or fail with `WrongType`.
    pub fn as_list(&self, key: &str) -> Result<&[Vec<u8>], StoreError> {
        match self {
            Self::List(list) => Ok(list),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Serialize for on-disk storage.
    pub(crate) fn to_bytes(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        postcard::to_allocvec(self).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Deserialize from on-disk storage.
    pub(crate) fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        postcard::from_bytes(bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// SCAN CURSOR
// =============================================================================

/// Opaque scan position. `ScanCursor::start()` begins a new scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanCursor(Option<String>);

impl ScanCursor {
    /// Position before the first key.
    #[must_use]
    pub fn start() -> Self {
        Self(None)
    }

    /// Position just after `key`.
    #[must_use]
    pub fn after(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    /// The last key already returned, if any.
    #[must_use]
    pub fn last_key(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// One bounded scan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Keys in this batch, in store order.
    pub keys: Vec<String>,
    /// Where to resume; `None` once the scan is complete.
    pub next: Option<ScanCursor>,
}

impl ScanPage {
    /// Build a page from keys in ascending order starting at the scan's lower
    /// bound. Stops at the first key outside `prefix`.
    pub(crate) fn collect<I>(keys: I, prefix: &str, count: usize) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = Result<String, StoreError>>,
    {
        let count = count.max(1);
        let mut batch = Vec::with_capacity(count);
        let mut more = false;
        for key in keys {
            let key = key?;
            if !key.starts_with(prefix) {
                break;
            }
            if batch.len() == count {
                more = true;
                break;
            }
            batch.push(key);
        }
        let next = match (more, batch.last()) {
            (true, Some(last)) => Some(ScanCursor::after(last.clone())),
            _ => None,
        };
        Ok(Self { keys: batch, next })
    }
}

// =============================================================================
// SCRIPT CONTEXT
// =============================================================================

/// The view a script has of the keyspace while it runs atomically.
///
/// Backends implement `load` and `save`; the commands are built on top.
pub trait ScriptContext {
    /// Read the entry at `key`.
    fn load(&self, key: &str) -> Result<Option<Entry>, StoreError>;

    /// Write (`Some`) or remove (`None`) the entry at `key`.
    fn save(&mut self, key: &str, entry: Option<Entry>) -> Result<(), StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load(key)?.is_some())
    }

    fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError> {
        match self.load(key)? {
            Some(Entry::Hash(hash)) => Ok(Some(hash)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    /// Set fields, keeping any fields not mentioned.
    fn hset(&mut self, key: &str, fields: Hash) -> Result<(), StoreError> {
        let mut hash = self.hget_all(key)?.unwrap_or_default();
        hash.extend(fields);
        self.save(key, Some(Entry::Hash(hash)))
    }

    /// Remove a key. Returns whether it existed.
    fn del(&mut self, key: &str) -> Result<bool, StoreError> {
        let existed = self.exists(key)?;
        if existed {
            self.save(key, None)?;
        }
        Ok(existed)
    }

    /// Append to a list. Returns the new length.
    fn rpush(&mut self, key: &str, value: Vec<u8>) -> Result<usize, StoreError> {
        let mut list = match self.load(key)? {
            Some(Entry::List(list)) => list,
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
            None => Vec::new(),
        };
        list.push(value);
        let len = list.len();
        self.save(key, Some(Entry::List(list)))?;
        Ok(len)
    }

    /// Increment a counter (starting at 0). Returns the new value.
    fn incr(&mut self, key: &str) -> Result<u64, StoreError> {
        let current = match self.load(key)? {
            Some(Entry::Counter(value)) => value,
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Overflow(key.to_string()))?;
        self.save(key, Some(Entry::Counter(next)))?;
        Ok(next)
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Asynchronous key-value store capability.
///
/// A handle may be shared by many concurrent callers; implementations do
/// not serialize calls beyond what script atomicity requires.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run `script` atomically.
    ///
    /// An `Err` from the script aborts it; no write it made is kept. Store
    /// failures are converted into the script's error type.
    async fn eval<T, E, F>(&self, script: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E> + Send + 'static;

    /// Whether `key` holds any entry.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// All fields of the hash at `key`.
    async fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError>;

    /// The full list at `key` (empty if absent).
    async fn lrange(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Up to `count` keys starting with `prefix`, resuming at `cursor`.
    async fn scan(
        &self,
        cursor: ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError>;

    /// Release the handle. Idempotent.
    async fn close(&self) -> Result<(), StoreError>;

    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let key = key.to_owned();
        self.eval(move |ctx| ctx.incr(&key)).await
    }

    async fn hset(&self, key: &str, fields: Hash) -> Result<(), StoreError> {
        let key = key.to_owned();
        self.eval(move |ctx| ctx.hset(&key, fields)).await
    }
}

/// A shared handle is a store too, so several graphs can sit on one keyspace.
#[async_trait]
impl<S: Store> Store for std::sync::Arc<S> {
    async fn eval<T, E, F>(&self, script: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E> + Send + 'static,
    {
        S::eval(&**self, script).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        S::exists(&**self, key).await
    }

    async fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError> {
        S::hget_all(&**self, key).await
    }

    async fn lrange(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        S::lrange(&**self, key).await
    }

    async fn scan(
        &self,
        cursor: ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        S::scan(&**self, cursor, prefix, count).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        S::close(&**self).await
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Store chosen at runtime from configuration.
#[derive(Debug)]
pub enum Backend {
    /// Process-local keyspace (fast, volatile).
    Memory(MemoryStore),
    /// Disk-backed keyspace using redb (ACID, persistent).
    Redb(RedbStore),
}

impl Default for Backend {
    fn default() -> Self {
        Self::Memory(MemoryStore::new())
    }
}

#[async_trait]
impl Store for Backend {
    async fn eval<T, E, F>(&self, script: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut dyn ScriptContext) -> Result<T, E> + Send + 'static,
    {
        match self {
            Self::Memory(store) => store.eval(script).await,
            Self::Redb(store) => store.eval(script).await,
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => store.exists(key).await,
            Self::Redb(store) => store.exists(key).await,
        }
    }

    async fn hget_all(&self, key: &str) -> Result<Option<Hash>, StoreError> {
        match self {
            Self::Memory(store) => store.hget_all(key).await,
            Self::Redb(store) => store.hget_all(key).await,
        }
    }

    async fn lrange(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        match self {
            Self::Memory(store) => store.lrange(key).await,
            Self::Redb(store) => store.lrange(key).await,
        }
    }

    async fn scan(
        &self,
        cursor: ScanCursor,
        prefix: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        match self {
            Self::Memory(store) => store.scan(cursor, prefix, count).await,
            Self::Redb(store) => store.scan(cursor, prefix, count).await,
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.close().await,
            Self::Redb(store) => store.close().await,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
