//! # Edge Repository
//!
//! Edges are indexed twice so both directions are one list read:
//! - `index:out:<subject>:<predicate>` lists object ids
//! - `index:in:<object>:<predicate>` lists subject ids
//!
//! The weight lives in the triple's record (`edge:<s>:<p>:<o>`). Creating
//! the same triple again appends fresh index entries and overwrites the
//! record's weight.

use crate::primitives::{
    OBJECT_FIELD, PREDICATE_FIELD, SUBJECT_FIELD, WEIGHT_FIELD, edge_key, incoming_index_key,
    node_key, outgoing_index_key,
};
use crate::script::{ScriptError, require};
use crate::storage::{Hash, Store, StoreError};
use crate::{Edge, GraphError, NewEdge, NodeId};
use std::sync::Arc;

fn edge_record(edge: &Edge) -> Hash {
    let mut record = Hash::new();
    record.insert(SUBJECT_FIELD.to_string(), edge.subject.to_string().into_bytes());
    record.insert(PREDICATE_FIELD.to_string(), edge.predicate.clone().into_bytes());
    record.insert(OBJECT_FIELD.to_string(), edge.object.to_string().into_bytes());
    record.insert(WEIGHT_FIELD.to_string(), edge.weight.to_string().into_bytes());
    record
}

/// Parse a node id stored as decimal text.
fn parse_id(key: &str, raw: &[u8]) -> Result<NodeId, StoreError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .map(NodeId)
        .ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: format!("invalid node id {raw:?}"),
        })
}

/// Read the weight out of an edge record; absent records weigh 0.
fn parse_weight(key: &str, record: Option<&Hash>) -> Result<f64, StoreError> {
    let Some(raw) = record.and_then(|r| r.get(WEIGHT_FIELD)) else {
        return Ok(0.0);
    };
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: format!("invalid weight {raw:?}"),
        })
}

/// Edge create and predicate lookups over a shared store.
#[derive(Debug)]
pub struct EdgeRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for EdgeRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> EdgeRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an edge between two existing nodes.
    ///
    /// Both endpoints are checked inside the same script that writes the
    /// record and both index entries, subject first.
    pub async fn create(&self, request: NewEdge) -> Result<Edge, GraphError> {
        let edge = request.resolve();
        let record = edge_record(&edge);
        let subject = edge.subject;
        let object = edge.object;
        let record_key = edge_key(subject, &edge.predicate, object);
        let out_key = outgoing_index_key(subject, &edge.predicate);
        let in_key = incoming_index_key(object, &edge.predicate);

        self.store
            .eval(move |ctx| -> Result<(), ScriptError> {
                let subject_key = node_key(subject);
                require(ctx, &subject_key, || {
                    format!("subject:{subject} does not exist at key \"{subject_key}\"")
                })?;
                let object_key = node_key(object);
                require(ctx, &object_key, || {
                    format!("object:{object} does not exist at key \"{object_key}\"")
                })?;

                ctx.hset(&record_key, record)?;
                ctx.rpush(&out_key, object.to_string().into_bytes())?;
                ctx.rpush(&in_key, subject.to_string().into_bytes())?;
                Ok(())
            })
            .await?;

        tracing::debug!(
            subject = %edge.subject,
            predicate = %edge.predicate,
            object = %edge.object,
            "created edge"
        );
        Ok(edge)
    }

    /// Edges leaving `subject` labelled `predicate`, in creation order.
    pub async fn find_by_subject_predicate(
        &self,
        subject: NodeId,
        predicate: &str,
    ) -> Result<Vec<Edge>, GraphError> {
        let index_key = outgoing_index_key(subject, predicate);
        let mut edges = Vec::new();
        for raw in self.store.lrange(&index_key).await? {
            let object = parse_id(&index_key, &raw)?;
            edges.push(self.load(subject, predicate, object).await?);
        }
        Ok(edges)
    }

    /// Edges arriving at `object` labelled `predicate`, in creation order.
    pub async fn find_by_object_predicate(
        &self,
        object: NodeId,
        predicate: &str,
    ) -> Result<Vec<Edge>, GraphError> {
        let index_key = incoming_index_key(object, predicate);
        let mut edges = Vec::new();
        for raw in self.store.lrange(&index_key).await? {
            let subject = parse_id(&index_key, &raw)?;
            edges.push(self.load(subject, predicate, object).await?);
        }
        Ok(edges)
    }

    async fn load(
        &self,
        subject: NodeId,
        predicate: &str,
        object: NodeId,
    ) -> Result<Edge, StoreError> {
        let key = edge_key(subject, predicate, object);
        let record = self.store.hget_all(&key).await?;
        Ok(Edge {
            subject,
            predicate: predicate.to_string(),
            object,
            weight: parse_weight(&key, record.as_ref())?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
