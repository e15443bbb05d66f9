// crates/metastore-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Metastore Store
// Description: Durable record and keyed-table backends using SQLite WAL.
// Purpose: Provide production persistence for metastore records and resources.
// Dependencies: metastore-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides SQLite-backed implementations of the metastore storage
//! interfaces: [`SqliteMetastoreStorage`] keeps an append-only revision
//! history per record with a published pointer, and [`SqliteKeyedTable`]
//! stores resource-mapper rows with SQL-side filtering. Both share one
//! connection through [`SqliteStore`]. Storage inputs are untrusted; bodies
//! are hash-verified on read.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteMetastoreStorage;
pub use store::SqliteStorageFactory;
pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use table::SqliteKeyedTable;
