//! # Codec Registry
//!
//! Node attributes are serialized as JSON and then, if a codec is
//! configured, compressed. The codec's name is stored next to the payload
//! so the read path knows how to undo it.
//!
//! Selection is fixed at construction: the first codec in the list encodes
//! every write. All listed codecs stay available for decoding.

use crate::Attributes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while encoding or decoding a node payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stored tag names a codec that is not registered.
    #[error("unknown codec \"{0}\"")]
    UnknownCodec(String),

    /// Compression failed.
    #[error("{codec} compression failed: {reason}")]
    Compress { codec: String, reason: String },

    /// Decompression failed (corrupt or truncated data).
    #[error("{codec} decompression failed: {reason}")]
    Decompress { codec: String, reason: String },

    /// The payload is not a JSON object.
    #[error("attribute serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// CODEC TRAIT
// =============================================================================

/// A named, invertible byte transform.
///
/// Implementations must be pure: `decompress(compress(x)) == x`.
pub trait Codec: Send + Sync {
    /// Tag stored alongside every payload this codec produced.
    fn name(&self) -> &str;

    /// Compress raw payload bytes.
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Restore raw payload bytes.
    fn decompress(&self, packed: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Snappy raw-format codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnappyCodec;

impl SnappyCodec {
    pub const NAME: &'static str = "snappy";
}

impl Codec for SnappyCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        snap::raw::Encoder::new()
            .compress_vec(raw)
            .map_err(|e| CodecError::Compress {
                codec: Self::NAME.to_string(),
                reason: e.to_string(),
            })
    }

    fn decompress(&self, packed: &[u8]) -> Result<Vec<u8>, CodecError> {
        snap::raw::Decoder::new()
            .decompress_vec(packed)
            .map_err(|e| CodecError::Decompress {
                codec: Self::NAME.to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered list of codecs. Cheap to clone.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Arc<[Arc<dyn Codec>]>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name()))
            .finish()
    }
}

impl CodecRegistry {
    /// A registry with no codecs: payloads are stored as plain JSON.
    #[must_use]
    pub fn uncompressed() -> Self {
        Self::default()
    }

    /// Build a registry from codecs in preference order.
    #[must_use]
    pub fn new(codecs: Vec<Arc<dyn Codec>>) -> Self {
        Self {
            codecs: codecs.into(),
        }
    }

    /// Build a registry from built-in codec names, in preference order.
    ///
    /// Returns the first name that matches no built-in codec.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut codecs: Vec<Arc<dyn Codec>> = Vec::with_capacity(names.len());
        for name in names {
            match name.as_ref() {
                SnappyCodec::NAME => codecs.push(Arc::new(SnappyCodec)),
                other => return Err(other.to_string()),
            }
        }
        Ok(Self::new(codecs))
    }

    /// Name of the codec used for writes, or `""` when uncompressed.
    #[must_use]
    pub fn write_codec(&self) -> &str {
        self.codecs.first().map(|c| c.name()).unwrap_or("")
    }

    /// Encode attributes, returning the payload and the codec tag to store.
    pub fn encode(&self, attributes: &Attributes) -> Result<(Vec<u8>, String), CodecError> {
        let raw = serde_json::to_vec(attributes)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        match self.codecs.first() {
            Some(codec) => Ok((codec.compress(&raw)?, codec.name().to_string())),
            None => Ok((raw, String::new())),
        }
    }

    /// Decode a payload written under the codec named `tag`.
    pub fn decode(&self, data: &[u8], tag: &str) -> Result<Attributes, CodecError> {
        let raw = if tag.is_empty() {
            data.to_vec()
        } else {
            self.codecs
                .iter()
                .find(|c| c.name() == tag)
                .ok_or_else(|| CodecError::UnknownCodec(tag.to_string()))?
                .decompress(data)?
        };
        serde_json::from_slice(&raw).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
