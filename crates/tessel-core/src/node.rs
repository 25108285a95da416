//! # Node Repository
//!
//! CRUD over node documents stored as `node:<id>` hashes.
//!
//! | Operation | Semantics |
//! |---|---|
//! | `create` | atomic id allocation + write; refuses an `id` attribute |
//! | `update` | atomic existence check + merge of the given fields |
//! | `put` | atomic existence check + full replacement |
//!
//! Every write stores the payload encoded by the `CodecRegistry` plus the
//! codec tag; every read decodes with the stored tag.

use crate::codec::{CodecError, CodecRegistry};
use crate::primitives::{CODEC_FIELD, DATA_FIELD, ID_ATTRIBUTE, NODE_COUNTER_KEY, node_key};
use crate::script::{ScriptError, require};
use crate::storage::{Hash, Store};
use crate::{Attributes, GraphError, Node, NodeId};
use std::sync::Arc;

/// Hash fields for an encoded payload.
pub(crate) fn payload_fields(data: Vec<u8>, codec: String) -> Hash {
    let mut fields = Hash::new();
    fields.insert(DATA_FIELD.to_string(), data);
    fields.insert(CODEC_FIELD.to_string(), codec.into_bytes());
    fields
}

/// Decode the attributes held by a node hash.
pub(crate) fn decode_fields(codecs: &CodecRegistry, hash: &Hash) -> Result<Attributes, CodecError> {
    let data = hash
        .get(DATA_FIELD)
        .ok_or_else(|| CodecError::Serialization(format!("missing `{DATA_FIELD}` field")))?;
    let tag = match hash.get(CODEC_FIELD) {
        Some(raw) => std::str::from_utf8(raw)
            .map_err(|e| CodecError::Serialization(format!("codec tag: {e}")))?,
        None => "",
    };
    codecs.decode(data, tag)
}

/// Separate the `id` attribute from the rest.
fn split_id(mut attributes: Attributes) -> Result<(NodeId, Attributes), GraphError> {
    let raw = attributes.shift_remove(ID_ATTRIBUTE).ok_or_else(|| {
        GraphError::InvalidArgument(format!("attributes must include an `{ID_ATTRIBUTE}`"))
    })?;
    let id = NodeId::from_value(&raw).ok_or_else(|| {
        GraphError::InvalidArgument(format!(
            "`{ID_ATTRIBUTE}` must be a positive integer, got {raw}"
        ))
    })?;
    Ok((id, attributes))
}

/// Node CRUD over a shared store.
#[derive(Debug)]
pub struct NodeRepository<S> {
    store: Arc<S>,
    codecs: CodecRegistry,
}

impl<S> Clone for NodeRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codecs: self.codecs.clone(),
        }
    }
}

impl<S: Store> NodeRepository<S> {
    pub fn new(store: Arc<S>, codecs: CodecRegistry) -> Self {
        Self { store, codecs }
    }

    /// The codecs used by this repository.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Create a node with a freshly allocated id.
    ///
    /// Fails with `InvalidArgument`, before touching the store, if the
    /// attributes already carry an `id`.
    pub async fn create(&self, attributes: Attributes) -> Result<Node, GraphError> {
        if attributes.contains_key(ID_ATTRIBUTE) {
            return Err(GraphError::InvalidArgument(format!(
                "cannot create a node with an explicit `{ID_ATTRIBUTE}`; use put or update"
            )));
        }

        let (data, codec) = self.codecs.encode(&attributes)?;
        let id = self
            .store
            .eval(move |ctx| -> Result<NodeId, ScriptError> {
                let id = NodeId(ctx.incr(NODE_COUNTER_KEY)?);
                ctx.hset(&node_key(id), payload_fields(data, codec))?;
                Ok(id)
            })
            .await?;

        tracing::debug!(node_id = %id, codec = self.codecs.write_codec(), "created node");
        Ok(Node::new(id, attributes))
    }

    /// Whether the node's hash is present.
    pub async fn exists(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.store.exists(&node_key(id)).await?)
    }

    /// Fetch and decode a node. Absence is `Ok(None)`.
    pub async fn find(&self, id: NodeId) -> Result<Option<Node>, GraphError> {
        match self.store.hget_all(&node_key(id)).await? {
            Some(hash) => Ok(Some(Node::new(id, decode_fields(&self.codecs, &hash)?))),
            None => Ok(None),
        }
    }

    /// Merge the given fields into an existing node.
    ///
    /// Fields not mentioned are kept. The existence check, the decode of the
    /// stored payload and the write happen in one script.
    pub async fn update(&self, attributes: Attributes) -> Result<Node, GraphError> {
        let (id, patch) = split_id(attributes)?;
        let key = node_key(id);
        let codecs = self.codecs.clone();

        let merged = self
            .store
            .eval(move |ctx| -> Result<Attributes, ScriptError> {
                require(ctx, &key, || format!("Node:{id} doesn't exist cannot update"))?;
                let stored = ctx.hget_all(&key)?.unwrap_or_default();
                let mut merged = decode_fields(&codecs, &stored)?;
                merged.extend(patch);
                let (data, codec) = codecs.encode(&merged)?;
                ctx.hset(&key, payload_fields(data, codec))?;
                Ok(merged)
            })
            .await?;

        tracing::debug!(node_id = %id, "updated node");
        Ok(Node::new(id, merged))
    }

    /// Replace an existing node's attributes with exactly the given set.
    pub async fn put(&self, attributes: Attributes) -> Result<Node, GraphError> {
        let (id, attributes) = split_id(attributes)?;
        let key = node_key(id);
        let (data, codec) = self.codecs.encode(&attributes)?;

        self.store
            .eval(move |ctx| -> Result<(), ScriptError> {
                require(ctx, &key, || {
                    format!("node:{id} does not exist at key \"{key}\"")
                })?;
                ctx.del(&key)?;
                ctx.hset(&key, payload_fields(data, codec))?;
                Ok(())
            })
            .await?;

        tracing::debug!(node_id = %id, "replaced node");
        Ok(Node::new(id, attributes))
    }
}

// =============================================================================
// TESTS
// =============================================================================
