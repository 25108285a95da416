//! # Graph Configuration
//!
//! Connection parameters and engine options, deserializable from any serde
//! format. The binary reads them from TOML:
//!
//! ```toml
//! codecs = ["snappy"]
//! scan_batch = 100
//!
//! [store]
//! backend = "redb"
//! path = "tessel.redb"
//! ```

use crate::primitives::DEFAULT_SCAN_BATCH;
use crate::storage::{Backend, MemoryStore, RedbStore, StoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which store backs the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Volatile process-local keyspace.
    Memory,
    /// redb database file, created if missing.
    Redb { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl StoreConfig {
    /// Open the configured store.
    pub fn open(&self) -> Result<Backend, StoreError> {
        match self {
            Self::Memory => Ok(Backend::Memory(MemoryStore::new())),
            Self::Redb { path } => Ok(Backend::Redb(RedbStore::open(path)?)),
        }
    }
}

/// Everything `Graph::open` needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub store: StoreConfig,
    /// Codec names in preference order; the first one encodes writes.
    pub codecs: Vec<String>,
    /// Batch size used by `Graph::all_nodes`.
    pub scan_batch: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            codecs: Vec::new(),
            scan_batch: DEFAULT_SCAN_BATCH,
        }
    }
}
