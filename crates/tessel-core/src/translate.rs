//! # Error Translator
//!
//! Maps failures from the store and script layers onto `GraphError`.
//!
//! Only a failure raised by an engine script becomes a domain error
//! (`NotFound`, carrying the script's message verbatim). Store failures
//! become `BackendFailure` with their original message; nothing is
//! swallowed or reworded.

use crate::GraphError;
use crate::codec::CodecError;
use crate::script::ScriptError;
use crate::storage::StoreError;

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        Self::BackendFailure(err)
    }
}

impl From<CodecError> for GraphError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownCodec(name) => Self::UnknownCodec(name),
            other => Self::Payload(other.to_string()),
        }
    }
}

impl From<ScriptError> for GraphError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Raised(message) => Self::NotFound(message),
            ScriptError::Codec(err) => err.into(),
            ScriptError::Store(err) => err.into(),
        }
    }
}
