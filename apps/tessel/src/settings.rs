//! # Configuration Loading
//!
//! Resolves the `GraphConfig` the binary runs with:
//! 1. `--config <file>` if given (must exist)
//! 2. otherwise `tessel.toml` in the working directory, if present
//! 3. otherwise the CLI defaults (redb at `tessel.redb`, no codec)
//!
//! Flags given on the command line override what the file says.

use crate::cli::{BackendKind, Cli};
use std::path::{Path, PathBuf};
use tessel_core::{GraphConfig, GraphError, StoreConfig};

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tessel.toml";

/// Database file used when neither the config nor the flags name one.
pub const DEFAULT_DATABASE: &str = "tessel.redb";

/// Defaults for a CLI run: unlike the library, the binary persists.
pub fn default_config() -> GraphConfig {
    GraphConfig {
        store: StoreConfig::Redb {
            path: PathBuf::from(DEFAULT_DATABASE),
        },
        ..GraphConfig::default()
    }
}

/// Parse a TOML config document.
pub fn parse(source: &str, origin: &Path) -> Result<GraphConfig, GraphError> {
    toml::from_str(source).map_err(|e| {
        GraphError::InvalidArgument(format!("config {}: {}", origin.display(), e))
    })
}

fn read(path: &Path) -> Result<GraphConfig, GraphError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        GraphError::InvalidArgument(format!("cannot read config {}: {}", path.display(), e))
    })?;
    parse(&source, path)
}

/// Load the config file, if any, without applying flag overrides.
pub fn load(explicit: Option<&Path>) -> Result<GraphConfig, GraphError> {
    match explicit {
        Some(path) => read(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                read(fallback)
            } else {
                Ok(default_config())
            }
        }
    }
}

/// Apply `--backend`, `--database` and `--codec` on top of `config`.
///
/// `--database` alone switches a memory config to redb.
pub fn apply_overrides(mut config: GraphConfig, cli: &Cli) -> GraphConfig {
    let current_path = match &config.store {
        StoreConfig::Redb { path } => Some(path.clone()),
        StoreConfig::Memory => None,
    };

    let redb = || StoreConfig::Redb {
        path: cli
            .database
            .clone()
            .or(current_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
    };

    config.store = match cli.backend {
        Some(BackendKind::Memory) => StoreConfig::Memory,
        Some(BackendKind::Redb) => redb(),
        None if cli.database.is_some() => redb(),
        None => config.store,
    };

    if !cli.codecs.is_empty() {
        config.codecs.clone_from(&cli.codecs);
    }
    config
}

/// Resolve the final config for a CLI invocation.
pub fn resolve(cli: &Cli) -> Result<GraphConfig, GraphError> {
    let config = load(cli.config.as_deref())?;
    Ok(apply_overrides(config, cli))
}
