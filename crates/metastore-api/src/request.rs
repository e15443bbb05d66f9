// crates/metastore-api/src/request.rs
// ============================================================================
// Module: Metastore API Messages
// Description: Transport-neutral request and response values.
// Purpose: Carry URI, body, and query parameters in; status and JSON out.
// Dependencies: metastore-core, serde, serde_json
// ============================================================================

//! ## Overview
//! [`ApiRequest`] is what a transport hands to the API: the request URI, the
//! raw body, and the query parameters. [`ApiResponse`] is what it gets back: a
//! status code and a JSON body. Failures render as `{"message": ...}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use metastore_core::MetastoreError;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query parameter names that request reference-expanded output.
pub const SHOW_REFERENCE_IDS_PARAMS: [&str; 2] = ["show-reference-ids", "show_reference_ids"];
/// HTTP 200.
pub const STATUS_OK: u16 = 200;
/// HTTP 201.
pub const STATUS_CREATED: u16 = 201;
/// HTTP 400.
pub const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP 404.
pub const STATUS_NOT_FOUND: u16 = 404;
/// HTTP 500.
pub const STATUS_SERVER_ERROR: u16 = 500;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Incoming API request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    /// Request URI used to build `endpoint` values.
    pub uri: String,
    /// Raw request body.
    pub body: Option<String>,
    /// Query parameters.
    pub query: BTreeMap<String, String>,
}

impl ApiRequest {
    /// Creates a request for `uri` with no body or query parameters.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            body: None,
            query: BTreeMap::new(),
        }
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Returns the body text, empty when absent.
    #[must_use]
    pub fn content(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    /// Returns a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns true when either reference-display parameter is present,
    /// whatever its value.
    #[must_use]
    pub fn wants_references(&self) -> bool {
        SHOW_REFERENCE_IDS_PARAMS.iter().any(|name| self.query.contains_key(*name))
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Outgoing API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl ApiResponse {
    /// Builds a response with an explicit status.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
        }
    }

    /// Builds a 200 response.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::new(STATUS_OK, body)
    }

    /// Builds a 201 response.
    #[must_use]
    pub const fn created(body: Value) -> Self {
        Self::new(STATUS_CREATED, body)
    }

    /// Builds an `{endpoint, identifier}` body with the given status.
    #[must_use]
    pub fn endpoint(status: u16, endpoint: &str, identifier: &str) -> Self {
        Self::new(status, json!({"endpoint": endpoint, "identifier": identifier}))
    }

    /// Builds an error response with a fixed status.
    #[must_use]
    pub fn error(status: u16, error: &MetastoreError) -> Self {
        Self::new(status, json!({"message": error.to_string()}))
    }

    /// Builds an error response: domain errors carry their own status,
    /// anything else uses `fallback`.
    #[must_use]
    pub fn from_error(error: &MetastoreError, fallback: u16) -> Self {
        let status = if error.is_domain() { error.status_code() } else { fallback };
        Self::error(status, error)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_reference_spelling_counts_regardless_of_value() {
        assert!(!ApiRequest::new("/x").wants_references());
        assert!(ApiRequest::new("/x").with_query("show-reference-ids", "").wants_references());
        assert!(ApiRequest::new("/x").with_query("show_reference_ids", "false").wants_references());
    }

    #[test]
    fn domain_errors_keep_their_status() {
        let conflict = MetastoreError::ExistingObject("dataset/1 already exists.".to_string());
        assert_eq!(ApiResponse::from_error(&conflict, STATUS_BAD_REQUEST).status, 409);
        let store = MetastoreError::Store("disk".to_string());
        assert_eq!(ApiResponse::from_error(&store, STATUS_BAD_REQUEST).status, 400);
        assert_eq!(
            ApiResponse::error(STATUS_NOT_FOUND, &conflict).body,
            json!({"message": "dataset/1 already exists."})
        );
    }
}
