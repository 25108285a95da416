//! # Storage Primitives
//!
//! Key layout and hash field names shared by every repository.
//!
//! The layout is part of the on-store compatibility surface: any
//! reimplementation reading the same keyspace must use these exact names.
//!
//! | Key | Entry |
//! |---|---|
//! | `node:<id>` | hash `{data, c}` |
//! | `counter:node` | id counter |
//! | `edge:<subject>:<predicate>:<object>` | hash `{subject, predicate, object, weight}` |
//! | `index:out:<subject>:<predicate>` | list of object ids |
//! | `index:in:<object>:<predicate>` | list of subject ids |

use crate::NodeId;

/// Namespace prefix of node hashes. Scans over this prefix visit every node.
pub const NODE_PREFIX: &str = "node:";

/// Counter key incremented to allocate node ids.
pub const NODE_COUNTER_KEY: &str = "counter:node";

/// Hash field holding the encoded attribute payload.
pub const DATA_FIELD: &str = "data";

/// Hash field holding the codec name (empty = uncompressed).
pub const CODEC_FIELD: &str = "c";

/// Attribute name reserved for the node's own identity.
pub const ID_ATTRIBUTE: &str = "id";

/// Hash fields of an edge record.
pub const SUBJECT_FIELD: &str = "subject";
pub const PREDICATE_FIELD: &str = "predicate";
pub const OBJECT_FIELD: &str = "object";
pub const WEIGHT_FIELD: &str = "weight";

/// Batch size used by `Graph::all_nodes` unless configured otherwise.
pub const DEFAULT_SCAN_BATCH: usize = 100;

/// Storage key of a node hash.
#[must_use]
pub fn node_key(id: NodeId) -> String {
    format!("{NODE_PREFIX}{id}")
}

/// Storage key of the record for one (subject, predicate, object) triple.
#[must_use]
pub fn edge_key(subject: NodeId, predicate: &str, object: NodeId) -> String {
    format!("edge:{subject}:{predicate}:{object}")
}

/// Forward index: edges leaving `subject` labelled `predicate`.
#[must_use]
pub fn outgoing_index_key(subject: NodeId, predicate: &str) -> String {
    format!("index:out:{subject}:{predicate}")
}

/// Reverse index: edges arriving at `object` labelled `predicate`.
#[must_use]
pub fn incoming_index_key(object: NodeId, predicate: &str) -> String {
    format!("index:in:{object}:{predicate}")
}
