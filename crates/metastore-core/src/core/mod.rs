// crates/metastore-core/src/core/mod.rs
// ============================================================================
// Module: Metastore Core Types
// Description: Documents, identifiers, resources, and pure document transforms.
// Purpose: Provide stable, serializable types shared by every metastore layer.
// Dependencies: serde, serde_json, jsonschema, json-patch, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types carry no storage or I/O. Everything here is deterministic: the
//! same input document always yields the same stripped view, swapped view,
//! merged patch result, and metadata hash.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod document;
pub mod hashing;
pub mod identifiers;
pub mod patch;
pub mod references;
pub mod resource;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::DocumentError;
pub use document::ValidatedDocument;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::MetadataInput;
pub use hashing::metadata_hash;
pub use identifiers::Perspective;
pub use identifiers::RecordId;
pub use identifiers::ResourceVersion;
pub use identifiers::RevisionId;
pub use identifiers::SchemaId;
pub use patch::apply_merge_patch;
pub use references::REFERENCE_MARKER;
pub use references::REFERENCE_PREFIX;
pub use references::remove_references;
pub use references::swap_references;
pub use resource::RESOURCE_PROJECTION;
pub use resource::Resource;
