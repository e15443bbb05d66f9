// crates/metastore-config/src/lib.rs
// ============================================================================
// Module: Metastore Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for metastore.toml semantics.
// Dependencies: metastore-core, metastore-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `metastore-config` defines the configuration model for the metastore
//! binary: store backend, schema directory, catalog schema ids, and logging.
//! Loading is strict and fails closed on size, path, and consistency errors.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
