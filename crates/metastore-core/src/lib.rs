// crates/metastore-core/src/lib.rs
// ============================================================================
// Module: Metastore Core Library
// Description: Public API surface for the metastore core.
// Purpose: Expose core types, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Metastore core stores, versions, validates, and serves schema-bound JSON
//! records. It provides an append-only revision store with a published
//! pointer, a resource mapper for file-backed resources, and the reference
//! resolution that strips or inlines `%Ref:` sidecars on read. Storage and
//! schema sources plug in through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::DataListener;
pub use interfaces::InsertOutcome;
pub use interfaces::KeyedTable;
pub use interfaces::ListenerError;
pub use interfaces::MetastoreStorage;
pub use interfaces::Query;
pub use interfaces::ResourceListener;
pub use interfaces::SchemaError;
pub use interfaces::SchemaRetriever;
pub use interfaces::SortOrder;
pub use interfaces::StorageFactory;
pub use interfaces::StoreError;
pub use interfaces::StoreReceipt;
pub use interfaces::TableError;
pub use interfaces::TableRow;
pub use runtime::CleanupOutcome;
pub use runtime::DirectorySchemaRetriever;
pub use runtime::DocumentValidator;
pub use runtime::ErrorKind;
pub use runtime::InMemoryKeyedTable;
pub use runtime::InMemoryMetastoreStorage;
pub use runtime::InMemorySchemaRetriever;
pub use runtime::InMemoryStorageFactory;
pub use runtime::MetastoreError;
pub use runtime::MetastoreService;
pub use runtime::MetastoreSession;
pub use runtime::PathStatus;
pub use runtime::PutOutcome;
pub use runtime::ResourceCleanup;
pub use runtime::ResourceMapper;
