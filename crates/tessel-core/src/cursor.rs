//! # Node Cursor
//!
//! Lazy iteration over every node via repeated bounded scans of the `node:`
//! namespace. Each cursor walks the keyspace once; ask the graph for a new
//! one to iterate again.

use crate::codec::CodecRegistry;
use crate::node::decode_fields;
use crate::primitives::NODE_PREFIX;
use crate::storage::{ScanCursor, Store};
use crate::{GraphError, Node, NodeId};
use futures_util::Stream;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Pull-based iterator over all nodes of a graph.
#[derive(Debug)]
pub struct NodeCursor<'g, S> {
    store: &'g S,
    codecs: &'g CodecRegistry,
    batch_size: usize,
    /// Where the next scan resumes; `None` once the store reported completion.
    position: Option<ScanCursor>,
    pending: VecDeque<String>,
}

impl<'g, S: Store> NodeCursor<'g, S> {
    pub(crate) fn new(store: &'g S, codecs: &'g CodecRegistry, batch_size: NonZeroUsize) -> Self {
        Self {
            store,
            codecs,
            batch_size: batch_size.get(),
            position: Some(ScanCursor::start()),
            pending: VecDeque::new(),
        }
    }

    /// The next node, or `None` when the scan is complete.
    pub async fn next(&mut self) -> Result<Option<Node>, GraphError> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                let Some(id) = key
                    .strip_prefix(NODE_PREFIX)
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .map(NodeId)
                else {
                    tracing::warn!(key = %key, "skipping key without a node id");
                    continue;
                };
                match self.store.hget_all(&key).await? {
                    Some(hash) => {
                        let attributes = decode_fields(self.codecs, &hash)?;
                        return Ok(Some(Node::new(id, attributes)));
                    }
                    None => {
                        tracing::warn!(node_id = %id, "node vanished during scan");
                        continue;
                    }
                }
            }

            let Some(position) = self.position.take() else {
                return Ok(None);
            };
            let page = self
                .store
                .scan(position, NODE_PREFIX, self.batch_size)
                .await?;
            tracing::debug!(keys = page.keys.len(), done = page.next.is_none(), "scanned nodes");
            self.pending.extend(page.keys);
            self.position = page.next;
        }
    }

    /// Drain the cursor into a vector.
    pub async fn try_collect(mut self) -> Result<Vec<Node>, GraphError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Adapt the cursor into a `Stream` of nodes.
    pub fn into_stream(self) -> impl Stream<Item = Result<Node, GraphError>> + 'g {
        futures_util::stream::try_unfold(self, |mut cursor| async move {
            let node = cursor.next().await?;
            Ok::<_, GraphError>(node.map(|node| (node, cursor)))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
