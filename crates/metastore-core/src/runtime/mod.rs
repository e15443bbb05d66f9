// crates/metastore-core/src/runtime/mod.rs
// ============================================================================
// Module: Metastore Runtime
// Description: Record service, resource mapper, validation, and collaborators.
// Purpose: Execute metastore operations against pluggable storage and schema sources.
// Dependencies: crate::{core, interfaces}, jsonschema, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the record service, the resource mapper, the
//! validation factory, resource cleanup, and in-memory collaborators. Every
//! external boundary calls into the same session operations.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cleanup;
pub mod errors;
pub mod resource_mapper;
pub mod schemas;
pub mod service;
pub mod store;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cleanup::CleanupOutcome;
pub use cleanup::DEFAULT_DISTRIBUTION_SCHEMA;
pub use cleanup::ResourceCleanup;
pub use errors::ErrorKind;
pub use errors::MetastoreError;
pub use resource_mapper::PathStatus;
pub use resource_mapper::ResourceMapper;
pub use schemas::DirectorySchemaRetriever;
pub use schemas::InMemorySchemaRetriever;
pub use service::DEFAULT_CATALOG_SCHEMA;
pub use service::DEFAULT_DATASET_SCHEMA;
pub use service::IDENTIFIER_IMMUTABLE;
pub use service::MetastoreService;
pub use service::MetastoreSession;
pub use service::PutOutcome;
pub use store::InMemoryKeyedTable;
pub use store::InMemoryMetastoreStorage;
pub use store::InMemoryStorageFactory;
pub use store::prepare_record_body;
pub use validation::DocumentValidator;
