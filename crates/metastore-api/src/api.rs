// crates/metastore-api/src/api.rs
// ============================================================================
// Module: Metastore Web Service API
// Description: Request handlers over the metastore service.
// Purpose: Map metastore operations onto status codes and JSON bodies.
// Dependencies: metastore-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`WebServiceApi`] is a thin wrapper over [`MetastoreService`]. Each handler
//! opens one [`MetastoreSession`], runs a single operation, and renders the
//! outcome as an [`ApiResponse`].
//!
//! ## Layer Responsibilities
//! - Body checks that precede validation: empty and malformed PATCH bodies,
//!   identifier mismatches on PUT and PATCH.
//! - Reference shaping: documents are reference-stripped unless the request
//!   carries `show-reference-ids` or `show_reference_ids`.
//! - Status mapping: single-item reads fail with 404; writes report domain
//!   errors with their own status and anything else as 400.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use metastore_core::MetastoreError;
use metastore_core::MetastoreService;
use metastore_core::MetastoreSession;
use metastore_core::REFERENCE_MARKER;
use metastore_core::RecordId;
use metastore_core::ResourceCleanup;
use metastore_core::SchemaId;
use metastore_core::ValidatedDocument;
use metastore_core::remove_references;
use metastore_core::runtime::IDENTIFIER_IMMUTABLE;
use metastore_core::swap_references;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use crate::request::ApiRequest;
use crate::request::ApiResponse;
use crate::request::STATUS_BAD_REQUEST;
use crate::request::STATUS_CREATED;
use crate::request::STATUS_NOT_FOUND;
use crate::request::STATUS_OK;
use crate::request::STATUS_SERVER_ERROR;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Catalog property listing datasets.
const CATALOG_DATASET_PROPERTY: &str = "dataset";
/// Query parameter selecting the first item of a page.
pub const START_PARAM: &str = "start";
/// Query parameter selecting the page size.
pub const LENGTH_PARAM: &str = "length";

// ============================================================================
// SECTION: Web Service API
// ============================================================================

/// Web-service boundary over the metastore.
pub struct WebServiceApi {
    /// Metastore service.
    service: Arc<MetastoreService>,
    /// Resource cleanup run before distribution deletes.
    cleanup: Option<ResourceCleanup>,
}

impl WebServiceApi {
    /// Creates an API without resource cleanup.
    #[must_use]
    pub const fn new(service: Arc<MetastoreService>) -> Self {
        Self {
            service,
            cleanup: None,
        }
    }

    /// Enables resource cleanup on distribution deletes.
    #[must_use]
    pub fn with_resource_cleanup(mut self, cleanup: ResourceCleanup) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Returns the wrapped service.
    #[must_use]
    pub fn service(&self) -> &MetastoreService {
        &self.service
    }

    /// Lists every schema keyed by id.
    #[must_use]
    pub fn get_schemas(&self, _request: &ApiRequest) -> ApiResponse {
        match self.service.get_schemas() {
            Ok(schemas) => {
                let map: Map<String, Value> =
                    schemas.into_iter().map(|(id, schema)| (id.to_string(), schema)).collect();
                ApiResponse::ok(Value::Object(map))
            }
            Err(err) => ApiResponse::from_error(&err, STATUS_SERVER_ERROR),
        }
    }

    /// Returns one schema; any failure is a 404.
    #[must_use]
    pub fn get_schema(&self, _request: &ApiRequest, schema_id: &str) -> ApiResponse {
        match self.service.get_schema(&SchemaId::new(schema_id)) {
            Ok(schema) => ApiResponse::ok(schema),
            Err(err) => ApiResponse::error(STATUS_NOT_FOUND, &err),
        }
    }

    /// Lists published records of a schema, paged when `start` or `length`
    /// is given.
    #[must_use]
    pub fn get_all(&self, request: &ApiRequest, schema_id: &str) -> ApiResponse {
        let schema_id = SchemaId::new(schema_id);
        let mut session = self.service.session();
        let documents = match page(request) {
            Ok(None) => session.get_all(&schema_id),
            Ok(Some((start, length))) => session.get_range(&schema_id, start, length),
            Err(err) => Err(err),
        };
        match documents {
            Ok(documents) => {
                let keep_references = request.wants_references();
                let items: Vec<Value> = documents
                    .into_iter()
                    .map(|document| shape_document(document, keep_references))
                    .collect();
                ApiResponse::ok(Value::Array(items))
            }
            Err(err) => ApiResponse::from_error(&err, STATUS_SERVER_ERROR),
        }
    }

    /// Returns the published revision of one record; any failure is a 404.
    #[must_use]
    pub fn get(&self, request: &ApiRequest, schema_id: &str, identifier: &str) -> ApiResponse {
        let mut session = self.service.session();
        match session.get(&SchemaId::new(schema_id), &RecordId::new(identifier)) {
            Ok(document) => ApiResponse::ok(shape_document(document, request.wants_references())),
            Err(err) => ApiResponse::error(STATUS_NOT_FOUND, &err),
        }
    }

    /// Returns the distribution sidecar entries of a record; any failure is a 404.
    #[must_use]
    pub fn get_resources(
        &self,
        _request: &ApiRequest,
        schema_id: &str,
        identifier: &str,
    ) -> ApiResponse {
        let mut session = self.service.session();
        match session.get_resources(&SchemaId::new(schema_id), &RecordId::new(identifier)) {
            Ok(resources) => ApiResponse::ok(Value::Array(resources)),
            Err(err) => ApiResponse::error(STATUS_NOT_FOUND, &err),
        }
    }

    /// Creates a record; 201 with `{endpoint, identifier}`.
    #[must_use]
    pub fn post(&self, request: &ApiRequest, schema_id: &str) -> ApiResponse {
        let schema_id = SchemaId::new(schema_id);
        let result = self.service.validate(request.content(), &schema_id).and_then(|document| {
            self.service.session().post(&schema_id, &document)
        });
        match result {
            Ok(identifier) => ApiResponse::endpoint(
                STATUS_CREATED,
                &format!("{}/{identifier}", request.uri),
                identifier.as_str(),
            ),
            Err(err) => write_failure(&err),
        }
    }

    /// Creates or replaces a record; 201 when created, 200 when updated.
    #[must_use]
    pub fn put(&self, request: &ApiRequest, schema_id: &str, identifier: &str) -> ApiResponse {
        let schema_id = SchemaId::new(schema_id);
        let record_id = RecordId::new(identifier);
        let result = check_identifier(request.content(), identifier)
            .and_then(|()| self.service.validate(request.content(), &schema_id))
            .and_then(|document| self.service.session().put(&schema_id, &record_id, &document));
        match result {
            Ok(outcome) => {
                let status = if outcome.created { STATUS_CREATED } else { STATUS_OK };
                ApiResponse::endpoint(status, &request.uri, outcome.identifier.as_str())
            }
            Err(err) => write_failure(&err),
        }
    }

    /// Applies a JSON Merge Patch to the latest revision of a record.
    #[must_use]
    pub fn patch(&self, request: &ApiRequest, schema_id: &str, identifier: &str) -> ApiResponse {
        let schema_id = SchemaId::new(schema_id);
        let record_id = RecordId::new(identifier);
        let result = parse_patch(request.content()).and_then(|patch| {
            check_identifier(request.content(), identifier)?;
            self.service.session().patch(&schema_id, &record_id, &patch)
        });
        match result {
            Ok(_) => ApiResponse::endpoint(STATUS_OK, &request.uri, identifier),
            Err(err) => write_failure(&err),
        }
    }

    /// Publishes the latest revision of a record.
    #[must_use]
    pub fn publish(&self, request: &ApiRequest, schema_id: &str, identifier: &str) -> ApiResponse {
        let mut session = self.service.session();
        match session.publish(&SchemaId::new(schema_id), &RecordId::new(identifier)) {
            Ok(_) => ApiResponse::endpoint(STATUS_OK, &request.uri, identifier),
            Err(err) => write_failure(&err),
        }
    }

    /// Deletes a record, cleaning up its resource first for distributions.
    #[must_use]
    pub fn delete(&self, _request: &ApiRequest, schema_id: &str, identifier: &str) -> ApiResponse {
        let schema_id = SchemaId::new(schema_id);
        let record_id = RecordId::new(identifier);
        let mut session = self.service.session();
        if let Err(err) = self.clean_resources(&mut session, &schema_id, &record_id) {
            return ApiResponse::from_error(&err, STATUS_SERVER_ERROR);
        }
        match session.delete(&schema_id, &record_id) {
            Ok(_) => ApiResponse::ok(json!({
                "message": format!("Dataset {identifier} has been deleted.")
            })),
            Err(err) => ApiResponse::from_error(&err, STATUS_SERVER_ERROR),
        }
    }

    /// Returns the assembled catalog.
    #[must_use]
    pub fn get_catalog(&self, request: &ApiRequest) -> ApiResponse {
        let mut session = self.service.session();
        match session.get_catalog() {
            Ok(catalog) => ApiResponse::ok(shape_catalog(catalog, request.wants_references())),
            Err(err) => ApiResponse::from_error(&err, STATUS_SERVER_ERROR),
        }
    }

    /// Runs resource cleanup when the record is a distribution.
    fn clean_resources(
        &self,
        session: &mut MetastoreSession<'_>,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<(), MetastoreError> {
        let Some(cleanup) = &self.cleanup else {
            return Ok(());
        };
        if cleanup.distribution_schema() != schema_id {
            return Ok(());
        }
        match cleanup.clean_resource_mapper_table(session, identifier) {
            Ok(outcome) => {
                debug!(
                    distribution = %identifier,
                    outcome = outcome.as_str(),
                    "resource cleanup finished"
                );
                Ok(())
            }
            Err(MetastoreError::MissingObject(_) | MetastoreError::NotFound(_)) => {
                debug!(distribution = %identifier, "resource cleanup skipped: nothing published");
                Ok(())
            }
            Err(err) => {
                warn!(distribution = %identifier, error = %err, "resource cleanup failed");
                Err(err)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a write failure: domain errors keep their status, others are 400.
fn write_failure(error: &MetastoreError) -> ApiResponse {
    ApiResponse::from_error(error, STATUS_BAD_REQUEST)
}

/// Rejects bodies whose embedded identifier differs from the addressed one.
///
/// Bodies that do not parse are left for validation to reject.
fn check_identifier(content: &str, identifier: &str) -> Result<(), MetastoreError> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content) else {
        return Ok(());
    };
    let embedded = match map.get("identifier") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    if embedded == identifier {
        Ok(())
    } else {
        Err(MetastoreError::CannotChangeUuid(IDENTIFIER_IMMUTABLE.to_string()))
    }
}

/// Parses a merge patch body.
///
/// Only a JSON object is accepted. A non-object patch would replace the whole
/// record under merge-patch rules, so arrays, strings, numbers, booleans and
/// `null` are reported as `Invalid JSON` alongside unparseable input.
fn parse_patch(content: &str) -> Result<Value, MetastoreError> {
    if content.trim().is_empty() {
        return Err(MetastoreError::MissingPayload("Empty body".to_string()));
    }
    match serde_json::from_str::<Value>(content) {
        Ok(patch @ Value::Object(_)) => Ok(patch),
        _ => Err(MetastoreError::InvalidJson("Invalid JSON".to_string())),
    }
}

/// Reads `start`/`length` paging parameters.
fn page(request: &ApiRequest) -> Result<Option<(usize, usize)>, MetastoreError> {
    let start = request.query_param(START_PARAM);
    let length = request.query_param(LENGTH_PARAM);
    if start.is_none() && length.is_none() {
        return Ok(None);
    }
    let parse = |name: &str, value: Option<&str>, default: usize| {
        value.map_or(Ok(default), |text| {
            text.trim().parse::<usize>().map_err(|_| {
                MetastoreError::Validation(format!("{name} must be a non-negative integer"))
            })
        })
    };
    Ok(Some((parse(START_PARAM, start, 0)?, parse(LENGTH_PARAM, length, usize::MAX)?)))
}

/// Shapes a document for output: expanded references or stripped artifacts.
fn shape_document(document: ValidatedDocument, keep_references: bool) -> Value {
    if keep_references {
        swap_references(&document).into_root()
    } else {
        remove_references(document, REFERENCE_MARKER).into_root()
    }
}

/// Shapes every dataset inside an assembled catalog.
fn shape_catalog(mut catalog: Value, keep_references: bool) -> Value {
    if let Some(Value::Array(datasets)) = catalog.get_mut(CATALOG_DATASET_PROPERTY) {
        for dataset in datasets.iter_mut() {
            let document = ValidatedDocument::unvalidated(dataset.take());
            *dataset = shape_document(document, keep_references);
        }
    }
    catalog
}
