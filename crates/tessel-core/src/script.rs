//! # Atomic Scripts
//!
//! Every integrity-checked mutation runs as a script: a closure the store
//! executes atomically against a `ScriptContext`. Inside a script the only
//! way to refuse a mutation is to return `ScriptError::Raised`, which
//! aborts it with a literal message.
//!
//! The three variants keep the origin of a failure explicit, so the
//! translator never has to inspect message text:
//! - `Raised`: the engine's own script rejected the call
//! - `Codec`: a stored payload could not be decoded or re-encoded
//! - `Store`: the store failed underneath the script

use crate::codec::CodecError;
use crate::storage::{ScriptContext, StoreError};
use thiserror::Error;

/// Failure of an engine script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Raised by the script itself with a literal message.
    #[error("{0}")]
    Raised(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScriptError {
    /// Abort the running script with `message`.
    pub fn raise(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }
}

/// Abort with `message` unless `key` exists.
///
/// Existence is always read inside the running script, never cached.
pub fn require(
    ctx: &dyn ScriptContext,
    key: &str,
    message: impl FnOnce() -> String,
) -> Result<(), ScriptError> {
    if ctx.exists(key)? {
        Ok(())
    } else {
        Err(ScriptError::raise(message()))
    }
}
