//! # Graph Facade
//!
//! The public surface of the engine. A `Graph` owns the store handle and
//! delegates to the node and edge repositories, which share it.
//!
//! A `Graph` is `Send + Sync` when its store is; wrap it in an `Arc` to
//! share it across tasks. Calls are not serialized by the graph: ordering
//! comes only from the store's script atomicity.

use crate::codec::CodecRegistry;
use crate::config::GraphConfig;
use crate::cursor::NodeCursor;
use crate::edge::EdgeRepository;
use crate::node::NodeRepository;
use crate::primitives::DEFAULT_SCAN_BATCH;
use crate::storage::{Backend, Store};
use crate::{Attributes, Edge, GraphError, NewEdge, Node, NodeId};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A property graph over a key-value store.
#[derive(Debug)]
pub struct Graph<S> {
    store: Arc<S>,
    nodes: NodeRepository<S>,
    edges: EdgeRepository<S>,
    scan_batch: NonZeroUsize,
}

impl Graph<Backend> {
    /// Open the store described by `config` and build a graph over it.
    ///
    /// Codec names and the scan batch are validated before the store is
    /// opened.
    pub fn open(config: &GraphConfig) -> Result<Self, GraphError> {
        let codecs = CodecRegistry::from_names(&config.codecs)
            .map_err(|name| GraphError::InvalidArgument(format!("unknown codec \"{name}\"")))?;
        let scan_batch = NonZeroUsize::new(config.scan_batch).ok_or_else(|| {
            GraphError::InvalidArgument("scan_batch must be at least 1".to_string())
        })?;
        let store = config.store.open()?;

        tracing::info!(
            store = ?config.store,
            codec = codecs.write_codec(),
            "opened graph"
        );
        Ok(Self::with_store(store, codecs).with_scan_batch(scan_batch))
    }
}

impl<S: Store> Graph<S> {
    /// Build a graph over an existing store handle.
    pub fn with_store(store: S, codecs: CodecRegistry) -> Self {
        let store = Arc::new(store);
        Self {
            nodes: NodeRepository::new(Arc::clone(&store), codecs),
            edges: EdgeRepository::new(Arc::clone(&store)),
            store,
            scan_batch: NonZeroUsize::new(DEFAULT_SCAN_BATCH).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Override the batch size used by `all_nodes`.
    #[must_use]
    pub fn with_scan_batch(mut self, batch: NonZeroUsize) -> Self {
        self.scan_batch = batch;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // NODES
    // =========================================================================

    /// Create a node with a fresh id. Fails if `attributes` contains `id`.
    pub async fn create_node(&self, attributes: Attributes) -> Result<Node, GraphError> {
        self.nodes.create(attributes).await
    }

    pub async fn node_exists(&self, id: NodeId) -> Result<bool, GraphError> {
        self.nodes.exists(id).await
    }

    pub async fn find_node(&self, id: NodeId) -> Result<Option<Node>, GraphError> {
        self.nodes.find(id).await
    }

    /// Merge fields into the node named by the `id` attribute.
    pub async fn update_node(&self, attributes: Attributes) -> Result<Node, GraphError> {
        self.nodes.update(attributes).await
    }

    /// Replace all attributes of the node named by the `id` attribute.
    pub async fn put_node(&self, attributes: Attributes) -> Result<Node, GraphError> {
        self.nodes.put(attributes).await
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    /// Create an edge; both endpoints must exist.
    pub async fn create_edge(&self, edge: NewEdge) -> Result<Edge, GraphError> {
        self.edges.create(edge).await
    }

    pub async fn find_edges_by_subject(
        &self,
        subject: NodeId,
        predicate: &str,
    ) -> Result<Vec<Edge>, GraphError> {
        self.edges.find_by_subject_predicate(subject, predicate).await
    }

    pub async fn find_edges_by_object(
        &self,
        object: NodeId,
        predicate: &str,
    ) -> Result<Vec<Edge>, GraphError> {
        self.edges.find_by_object_predicate(object, predicate).await
    }

    // =========================================================================
    // ITERATION
    // =========================================================================

    /// Iterate every node with the configured batch size.
    pub fn all_nodes(&self) -> NodeCursor<'_, S> {
        NodeCursor::new(&self.store, self.nodes.codecs(), self.scan_batch)
    }

    /// Iterate every node, scanning `batch_size` keys at a time.
    ///
    /// A batch size of zero is rejected.
    pub fn iterate_nodes(&self, batch_size: usize) -> Result<NodeCursor<'_, S>, GraphError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or_else(|| {
            GraphError::InvalidArgument("batch size must be at least 1".to_string())
        })?;
        Ok(NodeCursor::new(&self.store, self.nodes.codecs(), batch_size))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Close the store. Safe to call more than once.
    pub async fn disconnect(&self) -> Result<(), GraphError> {
        self.store.close().await?;
        tracing::debug!("graph disconnected");
        Ok(())
    }
}
