//! # Core Type Definitions
//!
//! This module contains the value types of the graph:
//! - Node identity and documents (`NodeId`, `Node`, `Attributes`)
//! - Edges (`Edge`, `NewEdge`)
//! - Error types (`GraphError`)
//!
//! Conversions from store, script and codec failures into `GraphError`
//! live in the `translate` module.

use crate::primitives::ID_ATTRIBUTE;
use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of a node, allocated from a monotonically increasing counter.
/// The first node of a graph receives id 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Read a node id out of an attribute value.
    ///
    /// Only positive JSON integers are accepted.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().filter(|id| *id > 0).map(Self)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Ordered attribute bag of a node.
///
/// Field order is preserved across encode/decode.
pub type Attributes = serde_json::Map<String, Value>;

/// A node document: its identity plus its attributes.
///
/// Serializes as a flat JSON object with `id` alongside the attributes,
/// which is the shape callers pass to `put_node`/`update_node`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The node identity.
    pub id: NodeId,
    /// Every attribute except `id`.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Node {
    /// Create a node, dropping any stray `id` attribute.
    #[must_use]
    pub fn new(id: NodeId, mut attributes: Attributes) -> Self {
        attributes.shift_remove(ID_ATTRIBUTE);
        Self { id, attributes }
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, predicate-labelled, weighted relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub subject: NodeId,
    pub predicate: String,
    pub object: NodeId,
    pub weight: f64,
}

/// Input to `create_edge`. A missing weight resolves to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub subject: NodeId,
    pub predicate: String,
    pub object: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl NewEdge {
    /// Create an unweighted edge request.
    #[must_use]
    pub fn new(subject: NodeId, predicate: impl Into<String>, object: NodeId) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            weight: None,
        }
    }

    /// Attach an explicit weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Resolve into the edge that will be stored.
    #[must_use]
    pub fn resolve(self) -> Edge {
        Edge {
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
            weight: self.weight.unwrap_or(0.0),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors returned by every graph operation.
///
/// - `NotFound` messages are displayed verbatim; callers match on them
/// - `BackendFailure` keeps the store's own message unchanged
/// - No operation retries; there is no partial success
#[derive(Debug, Error)]
pub enum GraphError {
    /// Caller misuse detected before any store I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target node (or edge endpoint) was absent at mutation time.
    #[error("{0}")]
    NotFound(String),

    /// A stored payload names a codec this graph does not have.
    #[error("unknown codec \"{0}\"")]
    UnknownCodec(String),

    /// A payload could not be serialized, decompressed or parsed.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// Any other failure surfaced by the store.
    #[error(transparent)]
    BackendFailure(StoreError),
}

// =============================================================================
// TESTS
// =============================================================================
