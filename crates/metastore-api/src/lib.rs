// crates/metastore-api/src/lib.rs
// ============================================================================
// Module: Metastore API Library
// Description: Web-service boundary over the metastore core.
// Purpose: Expose request handlers that any transport can drive.
// Dependencies: metastore-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! `metastore-api` turns metastore operations into status codes and JSON
//! bodies. It carries no transport of its own: an HTTP server, a CLI, or a
//! test builds an [`ApiRequest`], calls a [`WebServiceApi`] handler, and
//! writes out the [`ApiResponse`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod request;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::LENGTH_PARAM;
pub use api::START_PARAM;
pub use api::WebServiceApi;
pub use request::ApiRequest;
pub use request::ApiResponse;
pub use request::SHOW_REFERENCE_IDS_PARAMS;
