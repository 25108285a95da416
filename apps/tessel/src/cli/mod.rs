//! # Tessel CLI Module
//!
//! This module implements the CLI interface for Tessel.
//!
//! ## Available Commands
//!
//! - `create` - Create a node from a JSON object
//! - `exists` - Check whether a node exists
//! - `get` - Print a node
//! - `update` - Merge fields into a node
//! - `put` - Replace a node's fields
//! - `link` - Create an edge between two nodes
//! - `edges` - List edges by subject or object and predicate
//! - `nodes` - List every node

mod commands;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tessel_core::{Graph, GraphError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tessel - property graph over a key-value store
///
/// Nodes are JSON objects with a generated integer id; edges are weighted,
/// predicate-labelled links between two nodes.
#[derive(Parser, Debug)]
#[command(name = "tessel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (default: ./tessel.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the graph database (implies the redb backend)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Payload codec, in preference order (repeatable)
    #[arg(long = "codec", global = true)]
    pub codecs: Vec<String>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Store backends selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// redb database file (persistent)
    Redb,
    /// Process-local keyspace (lost on exit)
    Memory,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Create a node; the JSON object must not contain "id"
    Create {
        /// Node attributes as a JSON object
        json: String,
    },

    /// Check whether a node exists
    Exists {
        /// Node id
        id: u64,
    },

    /// Print a node (null if absent)
    Get {
        /// Node id
        id: u64,
    },

    /// Merge fields into an existing node; the JSON object must contain "id"
    Update {
        /// Node attributes as a JSON object
        json: String,
    },

    /// Replace all fields of an existing node; the JSON object must contain "id"
    Put {
        /// Node attributes as a JSON object
        json: String,
    },

    /// Create an edge between two existing nodes
    Link {
        /// Subject (source) node id
        subject: u64,

        /// Edge predicate
        predicate: String,

        /// Object (target) node id
        object: u64,

        /// Edge weight (default 0)
        #[arg(short, long)]
        weight: Option<f64>,
    },

    /// List edges leaving a subject or arriving at an object
    #[command(group(ArgGroup::new("endpoint").required(true).args(["subject", "object"])))]
    Edges {
        /// Subject node id
        #[arg(short, long)]
        subject: Option<u64>,

        /// Object node id
        #[arg(short, long)]
        object: Option<u64>,

        /// Edge predicate
        #[arg(short, long)]
        predicate: String,
    },

    /// List every node
    Nodes {
        /// Keys scanned per batch (default from config)
        #[arg(short, long)]
        batch: Option<usize>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments, printing the result as JSON.
pub async fn execute(cli: Cli) -> Result<(), GraphError> {
    let config = crate::settings::resolve(&cli)?;
    let graph = Graph::open(&config)?;

    let outcome = run(&graph, cli.command).await;
    let closed = graph.disconnect().await;
    let output = outcome?;
    closed?;

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| GraphError::Payload(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
