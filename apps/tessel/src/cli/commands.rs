//! # CLI Command Implementations
//!
//! Each command maps onto one `Graph` call and renders its result as JSON.

use super::Commands;
use serde_json::{Value, json};
use tessel_core::{Attributes, Graph, GraphError, NewEdge, NodeId, Store};

/// Parse a command-line JSON argument into an attribute map.
pub fn parse_attributes(raw: &str) -> Result<Attributes, GraphError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GraphError::InvalidArgument(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(GraphError::InvalidArgument(format!("invalid JSON: {e}"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, GraphError> {
    serde_json::to_value(value).map_err(|e| GraphError::Payload(e.to_string()))
}

/// Run one command against `graph` and return its JSON output.
pub async fn run<S: Store>(graph: &Graph<S>, command: Commands) -> Result<Value, GraphError> {
    match command {
        Commands::Create { json } => cmd_create(graph, &json).await,
        Commands::Exists { id } => cmd_exists(graph, NodeId(id)).await,
        Commands::Get { id } => cmd_get(graph, NodeId(id)).await,
        Commands::Update { json } => cmd_update(graph, &json).await,
        Commands::Put { json } => cmd_put(graph, &json).await,
        Commands::Link {
            subject,
            predicate,
            object,
            weight,
        } => cmd_link(graph, NodeId(subject), predicate, NodeId(object), weight).await,
        Commands::Edges {
            subject,
            object,
            predicate,
        } => cmd_edges(graph, subject.map(NodeId), object.map(NodeId), &predicate).await,
        Commands::Nodes { batch } => cmd_nodes(graph, batch).await,
    }
}

// =============================================================================
// NODE COMMANDS
// =============================================================================

/// Create a node.
pub async fn cmd_create<S: Store>(graph: &Graph<S>, raw: &str) -> Result<Value, GraphError> {
    let node = graph.create_node(parse_attributes(raw)?).await?;
    tracing::info!(node_id = %node.id, "node created");
    to_json(&node)
}

/// Report whether a node exists.
pub async fn cmd_exists<S: Store>(graph: &Graph<S>, id: NodeId) -> Result<Value, GraphError> {
    let exists = graph.node_exists(id).await?;
    Ok(json!({"id": id.value(), "exists": exists}))
}

/// Print a node, or `null`.
pub async fn cmd_get<S: Store>(graph: &Graph<S>, id: NodeId) -> Result<Value, GraphError> {
    match graph.find_node(id).await? {
        Some(node) => to_json(&node),
        None => {
            tracing::info!(node_id = %id, "node not found");
            Ok(Value::Null)
        }
    }
}

/// Merge fields into a node.
pub async fn cmd_update<S: Store>(graph: &Graph<S>, raw: &str) -> Result<Value, GraphError> {
    let node = graph.update_node(parse_attributes(raw)?).await?;
    tracing::info!(node_id = %node.id, "node updated");
    to_json(&node)
}

/// Replace a node's fields.
pub async fn cmd_put<S: Store>(graph: &Graph<S>, raw: &str) -> Result<Value, GraphError> {
    let node = graph.put_node(parse_attributes(raw)?).await?;
    tracing::info!(node_id = %node.id, "node replaced");
    to_json(&node)
}

/// List every node.
pub async fn cmd_nodes<S: Store>(
    graph: &Graph<S>,
    batch: Option<usize>,
) -> Result<Value, GraphError> {
    let cursor = match batch {
        Some(batch) => graph.iterate_nodes(batch)?,
        None => graph.all_nodes(),
    };
    let nodes = cursor.try_collect().await?;
    tracing::info!(count = nodes.len(), "nodes listed");
    to_json(&nodes)
}

// =============================================================================
// EDGE COMMANDS
// =============================================================================

/// Create an edge.
pub async fn cmd_link<S: Store>(
    graph: &Graph<S>,
    subject: NodeId,
    predicate: String,
    object: NodeId,
    weight: Option<f64>,
) -> Result<Value, GraphError> {
    let mut request = NewEdge::new(subject, predicate, object);
    if let Some(weight) = weight {
        request = request.with_weight(weight);
    }
    let edge = graph.create_edge(request).await?;
    tracing::info!(
        subject = %edge.subject,
        predicate = %edge.predicate,
        object = %edge.object,
        "edge created"
    );
    to_json(&edge)
}

/// List edges by subject or by object.
pub async fn cmd_edges<S: Store>(
    graph: &Graph<S>,
    subject: Option<NodeId>,
    object: Option<NodeId>,
    predicate: &str,
) -> Result<Value, GraphError> {
    let edges = match (subject, object) {
        (Some(subject), None) => graph.find_edges_by_subject(subject, predicate).await?,
        (None, Some(object)) => graph.find_edges_by_object(object, predicate).await?,
        _ => {
            return Err(GraphError::InvalidArgument(
                "exactly one of --subject or --object is required".to_string(),
            ));
        }
    };
    to_json(&edges)
}
