//! # tessel-core
//!
//! A property-graph engine over a key-value store - THE ENGINE.
//!
//! Nodes are attribute bags with a generated integer id; edges are
//! predicate-labelled, weighted relations between two node ids. The store
//! only needs counters, hashes, lists, prefix scans and atomic scripts.
//!
//! ## Integrity
//!
//! No edge can reference a missing node, even with concurrent writers:
//! endpoint checks run inside the same atomic store script that writes the
//! edge and its indexes. The engine itself holds no locks.
//!
//! ## Layout
//!
//! - `storage` → the `Store` capability, `MemoryStore`, `RedbStore`
//! - `codec` → payload compression (`CodecRegistry`, `SnappyCodec`)
//! - `node` / `edge` → repositories building the store scripts
//! - `cursor` → lazy iteration over all nodes
//! - `graph` → the `Graph` facade
//!
//! ```no_run
//! # async fn demo() -> Result<(), tessel_core::GraphError> {
//! use tessel_core::{Graph, GraphConfig, NewEdge};
//! use serde_json::json;
//!
//! let graph = Graph::open(&GraphConfig::default())?;
//! let Some(alice) = json!({"name": "alice"}).as_object().cloned() else { return Ok(()) };
//! let Some(bob) = json!({"name": "bob"}).as_object().cloned() else { return Ok(()) };
//! let alice = graph.create_node(alice).await?;
//! let bob = graph.create_node(bob).await?;
//! graph.create_edge(NewEdge::new(alice.id, "knows", bob.id)).await?;
//! graph.disconnect().await?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod config;
pub mod cursor;
pub mod edge;
pub mod graph;
pub mod node;
pub mod primitives;
pub mod script;
pub mod storage;
pub mod translate;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Attributes, Edge, GraphError, NewEdge, Node, NodeId};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use codec::{Codec, CodecError, CodecRegistry, SnappyCodec};
pub use config::{GraphConfig, StoreConfig};
pub use cursor::NodeCursor;
pub use edge::EdgeRepository;
pub use graph::Graph;
pub use node::NodeRepository;
pub use script::ScriptError;

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{Backend, MemoryStore, RedbStore, ScanCursor, ScanPage, Store, StoreError};
