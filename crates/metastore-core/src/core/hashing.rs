// crates/metastore-core/src/core/hashing.rs
// ============================================================================
// Module: Metastore Canonical Hashing
// Description: RFC 8785 JSON canonicalization and metadata content hashing.
// Purpose: Provide deterministic change-detection hashes for metadata documents.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Metadata hashes are computed over RFC 8785 (JCS) canonical JSON after
//! reference artifacts are stripped, so key order and whitespace never change
//! the digest. Raw string input is hashed over its exact bytes without parsing;
//! callers that want normalization must parse first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::document::ValidatedDocument;
use crate::core::references::REFERENCE_MARKER;
use crate::core::references::strip_artifacts;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for metadata digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

/// Default hash algorithm for metadata digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Metadata Input
// ============================================================================

/// Accepted input forms for [`metadata_hash`].
#[derive(Debug, Clone)]
pub enum MetadataInput<'a> {
    /// Pre-validated document; reference artifacts are stripped.
    Document(&'a ValidatedDocument),
    /// Generic JSON value; reference artifacts are stripped.
    Value(&'a Value),
    /// Raw JSON text; hashed byte-for-byte without normalization.
    Raw(&'a str),
}

impl<'a> From<&'a ValidatedDocument> for MetadataInput<'a> {
    fn from(value: &'a ValidatedDocument) -> Self {
        Self::Document(value)
    }
}

impl<'a> From<&'a Value> for MetadataInput<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Value(value)
    }
}

impl<'a> From<&'a str> for MetadataInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Raw(value)
    }
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

/// Computes the change-detection hash of a metadata item.
///
/// Documents and values are reference-stripped and canonicalized before
/// hashing; raw strings are hashed as given.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when canonical serialization fails.
pub fn metadata_hash<'a>(input: impl Into<MetadataInput<'a>>) -> Result<HashDigest, HashError> {
    match input.into() {
        MetadataInput::Document(document) => hash_canonical_json(
            DEFAULT_HASH_ALGORITHM,
            &strip_artifacts(document.root(), REFERENCE_MARKER),
        ),
        MetadataInput::Value(value) => hash_canonical_json(
            DEFAULT_HASH_ALGORITHM,
            &strip_artifacts(value, REFERENCE_MARKER),
        ),
        MetadataInput::Raw(raw) => Ok(hash_bytes(DEFAULT_HASH_ALGORITHM, raw.as_bytes())),
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
