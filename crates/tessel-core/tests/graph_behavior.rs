//! Behavior of the public `Graph` surface, run against both store backends.

use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use tessel_core::primitives::{CODEC_FIELD, DATA_FIELD, NODE_COUNTER_KEY, node_key};
use tessel_core::{
    Attributes, CodecRegistry, Graph, GraphConfig, GraphError, MemoryStore, NewEdge, NodeId,
    RedbStore, Store, StoreConfig, StoreError,
};

fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => Attributes::new(),
    }
}

fn memory_graph(codecs: CodecRegistry) -> Graph<MemoryStore> {
    Graph::with_store(MemoryStore::new(), codecs)
}

fn redb_graph(codecs: CodecRegistry) -> (TempDir, Graph<RedbStore>) {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = RedbStore::open(temp.path().join("graph.redb")).expect("open db");
    (temp, Graph::with_store(store, codecs))
}

fn snappy() -> CodecRegistry {
    CodecRegistry::from_names(&["snappy"]).expect("snappy registry")
}

/// Run an async check against a memory graph and a redb graph.
macro_rules! on_both_backends {
    ($check:ident) => {
        on_both_backends!($check, CodecRegistry::uncompressed());
    };
    ($check:ident, $codecs:expr) => {
        $check(&memory_graph($codecs)).await;
        let (_temp, graph) = redb_graph($codecs);
        $check(&graph).await;
    };
}

// =============================================================================
// NODES
// =============================================================================

async fn create_assigns_fresh_ids<S: Store>(graph: &Graph<S>) {
    let input = attrs(json!({"title": "first", "likes": 50}));
    let first = graph.create_node(input.clone()).await.expect("create");
    let second = graph.create_node(input.clone()).await.expect("create");

    assert_eq!(first.attributes, input);
    assert!(first.id.value() > 0);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn create_node_returns_attributes_with_fresh_id() {
    on_both_backends!(create_assigns_fresh_ids);
}

async fn create_with_id_is_refused<S: Store>(graph: &Graph<S>) {
    let err = graph
        .create_node(attrs(json!({"id": 1, "title": "x"})))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    assert!(!graph.store().exists(NODE_COUNTER_KEY).await.expect("exists"));
    assert!(!graph.node_exists(NodeId(1)).await.expect("exists"));
}

#[tokio::test]
async fn create_node_with_id_fails_before_any_write() {
    on_both_backends!(create_with_id_is_refused);
}

async fn existence_and_lookup<S: Store>(graph: &Graph<S>) {
    assert!(!graph.node_exists(NodeId(1)).await.expect("exists"));
    assert!(graph.find_node(NodeId(1)).await.expect("find").is_none());

    let input = attrs(json!({
        "title": "nested",
        "published": "2021-03-04T05:06:07.000Z",
        "tags": ["a", "b"],
        "meta": {"draft": false, "score": 1.5}
    }));
    let node = graph.create_node(input.clone()).await.expect("create");

    assert!(graph.node_exists(node.id).await.expect("exists"));
    let found = graph.find_node(node.id).await.expect("find").expect("present");
    assert_eq!(found.id, node.id);
    assert_eq!(found.attributes, input);
}

#[tokio::test]
async fn find_node_round_trips_attributes() {
    on_both_backends!(existence_and_lookup);
    on_both_backends!(existence_and_lookup, snappy());
}

async fn update_merges<S: Store>(graph: &Graph<S>) {
    let node = graph
        .create_node(attrs(json!({"title": "post", "likes": 50})))
        .await
        .expect("create");

    let updated = graph
        .update_node(attrs(json!({"id": node.id.value(), "likes": 49})))
        .await
        .expect("update");
    let expected = json!({"id": node.id.value(), "title": "post", "likes": 49});
    assert_eq!(serde_json::to_value(&updated).expect("json"), expected);

    let found = graph.find_node(node.id).await.expect("find").expect("present");
    assert_eq!(serde_json::to_value(&found).expect("json"), expected);

    let err = graph
        .update_node(attrs(json!({"id": 999, "likes": 1})))
        .await
        .expect_err("must fail");
    assert!(matches!(&err, GraphError::NotFound(_)));
    assert_eq!(err.to_string(), "Node:999 doesn't exist cannot update");
    assert!(!graph.node_exists(NodeId(999)).await.expect("exists"));
}

#[tokio::test]
async fn update_node_merges_fields() {
    on_both_backends!(update_merges);
    on_both_backends!(update_merges, snappy());
}

async fn put_replaces<S: Store>(graph: &Graph<S>) {
    let node = graph
        .create_node(attrs(json!({"title": "post", "likes": 50})))
        .await
        .expect("create");

    graph
        .put_node(attrs(json!({"id": node.id.value(), "title": "X", "dislikes": 1})))
        .await
        .expect("put");
    let found = graph.find_node(node.id).await.expect("find").expect("present");
    assert_eq!(
        serde_json::to_value(&found).expect("json"),
        json!({"id": node.id.value(), "title": "X", "dislikes": 1})
    );

    let err = graph
        .put_node(attrs(json!({"id": 404, "title": "X"})))
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "node:404 does not exist at key \"node:404\"");
    assert!(!graph.node_exists(NodeId(404)).await.expect("exists"));
}

#[tokio::test]
async fn put_node_replaces_all_fields() {
    on_both_backends!(put_replaces);
}

// =============================================================================
// EDGES
// =============================================================================

async fn edge_endpoints_are_checked<S: Store>(graph: &Graph<S>) {
    let a = graph.create_node(attrs(json!({"n": "a"}))).await.expect("create");

    let err = graph
        .create_edge(NewEdge::new(NodeId(77), "knows", a.id))
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "subject:77 does not exist at key \"node:77\"");

    let err = graph
        .create_edge(NewEdge::new(a.id, "knows", NodeId(78)))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GraphError::NotFound(_)));
    assert_eq!(err.to_string(), "object:78 does not exist at key \"node:78\"");

    assert!(
        graph
            .find_edges_by_subject(a.id, "knows")
            .await
            .expect("find")
            .is_empty()
    );
}

#[tokio::test]
async fn create_edge_requires_both_endpoints() {
    on_both_backends!(edge_endpoints_are_checked);
}

async fn weight_defaults_to_zero<S: Store>(graph: &Graph<S>) {
    let a = graph.create_node(attrs(json!({"n": "a"}))).await.expect("create");
    let b = graph.create_node(attrs(json!({"n": "b"}))).await.expect("create");

    let edge = graph
        .create_edge(NewEdge::new(a.id, "knows", b.id))
        .await
        .expect("create edge");
    assert_eq!(edge.weight, 0.0);

    let found = graph
        .find_edges_by_subject(a.id, "knows")
        .await
        .expect("find");
    assert_eq!(found, vec![edge]);
}

#[tokio::test]
async fn create_edge_defaults_weight() {
    on_both_backends!(weight_defaults_to_zero);
}

async fn predicates_are_indexed_separately<S: Store>(graph: &Graph<S>) {
    let a = graph.create_node(attrs(json!({"n": "a"}))).await.expect("create");
    let b = graph.create_node(attrs(json!({"n": "b"}))).await.expect("create");

    graph
        .create_edge(NewEdge::new(a.id, "likes", b.id).with_weight(2.0))
        .await
        .expect("likes");
    graph
        .create_edge(NewEdge::new(a.id, "follows", b.id).with_weight(0.5))
        .await
        .expect("follows");

    let likes = graph.find_edges_by_subject(a.id, "likes").await.expect("find");
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0].object, b.id);
    assert_eq!(likes[0].predicate, "likes");
    assert_eq!(likes[0].weight, 2.0);

    let follows = graph
        .find_edges_by_object(b.id, "follows")
        .await
        .expect("find");
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].subject, a.id);
    assert_eq!(follows[0].weight, 0.5);

    assert!(
        graph
            .find_edges_by_object(a.id, "likes")
            .await
            .expect("find")
            .is_empty()
    );
}

#[tokio::test]
async fn edge_lookups_filter_by_predicate_in_both_directions() {
    on_both_backends!(predicates_are_indexed_separately);
}

async fn lookups_keep_creation_order<S: Store>(graph: &Graph<S>) {
    let hub = graph.create_node(attrs(json!({"n": "hub"}))).await.expect("create");
    let mut expected = Vec::new();
    for i in 0..5 {
        let leaf = graph
            .create_node(attrs(json!({"n": i})))
            .await
            .expect("create");
        graph
            .create_edge(NewEdge::new(hub.id, "links", leaf.id))
            .await
            .expect("edge");
        expected.push(leaf.id);
    }

    let objects: Vec<NodeId> = graph
        .find_edges_by_subject(hub.id, "links")
        .await
        .expect("find")
        .into_iter()
        .map(|e| e.object)
        .collect();
    assert_eq!(objects, expected);
}

#[tokio::test]
async fn edge_lookups_keep_creation_order() {
    on_both_backends!(lookups_keep_creation_order);
}

// =============================================================================
// ITERATION
// =============================================================================

async fn iteration_covers_every_node<S: Store>(graph: &Graph<S>) {
    let mut created = BTreeSet::new();
    for i in 0..200 {
        let node = graph
            .create_node(attrs(json!({"i": i})))
            .await
            .expect("create");
        created.insert(node.id);
    }

    for _ in 0..2 {
        let nodes = graph
            .iterate_nodes(1)
            .expect("cursor")
            .try_collect()
            .await
            .expect("iterate");
        assert_eq!(nodes.len(), 200);
        let seen: BTreeSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(seen, created);
    }

    let defaults = graph.all_nodes().try_collect().await.expect("iterate");
    assert_eq!(defaults.len(), 200);
}

#[tokio::test]
async fn all_nodes_yields_each_node_exactly_once() {
    on_both_backends!(iteration_covers_every_node);
    on_both_backends!(iteration_covers_every_node, snappy());
}

#[tokio::test]
async fn zero_batch_is_invalid() {
    let graph = memory_graph(CodecRegistry::uncompressed());
    let err = graph.iterate_nodes(0).expect_err("must fail");
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

// =============================================================================
// COMPRESSION
// =============================================================================

async fn compressed_payloads_are_smaller<S: Store>(graph: &Graph<S>) {
    let body = "the quick brown fox jumps over the lazy dog ".repeat(100);
    let input = attrs(json!({"body": body}));
    let node = graph.create_node(input.clone()).await.expect("create");

    let hash = graph
        .store()
        .hget_all(&node_key(node.id))
        .await
        .expect("hget")
        .expect("present");
    let plain = serde_json::to_vec(&input).expect("json");
    assert!(hash.get(DATA_FIELD).expect("data").len() < plain.len());
    assert_eq!(
        hash.get(CODEC_FIELD).map(Vec::as_slice),
        Some(b"snappy".as_slice())
    );

    let found = graph.find_node(node.id).await.expect("find").expect("present");
    assert_eq!(found.attributes, input);
}

#[tokio::test]
async fn configured_codec_compresses_payloads() {
    on_both_backends!(compressed_payloads_are_smaller, snappy());
}

async fn uncompressed_payloads_are_tagged_empty<S: Store>(graph: &Graph<S>) {
    let node = graph
        .create_node(attrs(json!({"title": "plain"})))
        .await
        .expect("create");
    let hash = graph
        .store()
        .hget_all(&node_key(node.id))
        .await
        .expect("hget")
        .expect("present");
    assert_eq!(hash.get(CODEC_FIELD).map(Vec::as_slice), Some(b"".as_slice()));
}

#[tokio::test]
async fn no_codec_stores_empty_tag() {
    on_both_backends!(uncompressed_payloads_are_tagged_empty);
}

#[tokio::test]
async fn graphs_sharing_a_store_decode_by_stored_tag() {
    let store = Arc::new(MemoryStore::new());
    let writer = Graph::with_store(Arc::clone(&store), snappy());
    let node = writer
        .create_node(attrs(json!({"t": "old"})))
        .await
        .expect("create");

    let plain_writer = Graph::with_store(Arc::clone(&store), CodecRegistry::uncompressed());
    let plain = plain_writer
        .create_node(attrs(json!({"t": "new"})))
        .await
        .expect("create");

    // Both payloads decode under a registry that knows snappy
    let found = writer.find_node(plain.id).await.expect("find").expect("present");
    assert_eq!(found, plain);

    // A graph without snappy cannot read the compressed one
    let err = plain_writer.find_node(node.id).await.expect_err("unknown codec");
    assert!(matches!(err, GraphError::UnknownCodec(name) if name == "snappy"));
}

// =============================================================================
// ERRORS & LIFECYCLE
// =============================================================================

async fn closed_store_surfaces_original_message<S: Store>(graph: &Graph<S>) {
    graph.disconnect().await.expect("disconnect");
    graph.disconnect().await.expect("disconnect twice");

    let err = graph
        .create_node(attrs(json!({"t": 1})))
        .await
        .expect_err("closed");
    assert!(matches!(err, GraphError::BackendFailure(StoreError::Closed)));
    assert_eq!(err.to_string(), "store connection is closed");

    let err = graph
        .create_edge(NewEdge::new(NodeId(1), "x", NodeId(2)))
        .await
        .expect_err("closed");
    assert!(matches!(err, GraphError::BackendFailure(_)));
}

#[tokio::test]
async fn disconnect_is_idempotent_and_final() {
    on_both_backends!(closed_store_surfaces_original_message);
}

#[tokio::test]
async fn disconnect_on_unused_graph() {
    let graph = Graph::open(&GraphConfig::default()).expect("open");
    graph.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn open_rejects_unknown_codec() {
    let config = GraphConfig {
        codecs: vec!["lz4".to_string()],
        ..GraphConfig::default()
    };
    let err = Graph::open(&config).expect_err("must fail");
    assert!(matches!(err, GraphError::InvalidArgument(msg) if msg.contains("lz4")));
}

#[tokio::test]
async fn redb_graph_survives_reopen() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config = GraphConfig {
        store: StoreConfig::Redb {
            path: temp.path().join("persist.redb"),
        },
        codecs: vec!["snappy".to_string()],
        ..GraphConfig::default()
    };

    let (a, b) = {
        let graph = Graph::open(&config).expect("open");
        let a = graph.create_node(attrs(json!({"n": "a"}))).await.expect("a");
        let b = graph.create_node(attrs(json!({"n": "b"}))).await.expect("b");
        graph
            .create_edge(NewEdge::new(a.id, "knows", b.id).with_weight(3.0))
            .await
            .expect("edge");
        graph.disconnect().await.expect("disconnect");
        (a, b)
    };

    let graph = Graph::open(&config).expect("reopen");
    let found = graph.find_node(a.id).await.expect("find").expect("present");
    assert_eq!(found, a);
    let edges = graph.find_edges_by_object(b.id, "knows").await.expect("edges");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].weight, 3.0);

    let c = graph.create_node(attrs(json!({"n": "c"}))).await.expect("c");
    assert!(c.id > b.id);
}

#[tokio::test]
async fn concurrent_creates_receive_distinct_ids() {
    let graph = Arc::new(memory_graph(CodecRegistry::uncompressed()));
    let mut handles = Vec::new();
    for task in 0..16 {
        let graph = Arc::clone(&graph);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..10 {
                let node = graph
                    .create_node(attrs(json!({"task": task, "i": i})))
                    .await
                    .expect("create");
                ids.push(node.id);
            }
            ids
        }));
    }

    let mut all = BTreeSet::new();
    for handle in handles {
        all.extend(handle.await.expect("join"));
    }
    assert_eq!(all.len(), 160);
}

#[tokio::test]
async fn concurrent_edge_creation_against_redb() {
    let (_temp, graph) = redb_graph(CodecRegistry::uncompressed());
    let graph = Arc::new(graph);
    let hub = graph
        .create_node(attrs(json!({"n": "hub"})))
        .await
        .expect("hub")
        .id;

    let mut handles = Vec::new();
    for i in 0..8 {
        let graph = Arc::clone(&graph);
        handles.push(tokio::spawn(async move {
            let leaf = graph
                .create_node(attrs(json!({"leaf": i})))
                .await
                .expect("leaf");
            graph
                .create_edge(NewEdge::new(hub, "owns", leaf.id))
                .await
                .expect("edge");
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    let edges = graph.find_edges_by_subject(hub, "owns").await.expect("find");
    assert_eq!(edges.len(), 8);
}
