// crates/metastore-core/src/runtime/service.rs
// ============================================================================
// Module: Metastore Service
// Description: Revisioned, schema-validated record store and catalog assembly.
// Purpose: Implement create, read, update, patch, publish, and delete over per-schema storage.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`MetastoreService`] owns the long-lived collaborators: schema validation,
//! the storage factory, and data listeners. Each request opens a
//! [`MetastoreSession`], which owns the schema id to storage handle cache for
//! that request and exposes every record operation.
//!
//! Record state per identifier moves from absent, to draft (revisions with no
//! published pointer), to published, to draft-with-pending-changes when a new
//! revision lands beyond the pointer. Writes never move the pointer; only
//! [`MetastoreSession::publish`] does.
//!
//! Bulk reads validate each stored body independently and drop (with a
//! warning) any body that fails validation or is vetoed by a listener.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::REFERENCE_MARKER;
use crate::core::RecordId;
use crate::core::SchemaId;
use crate::core::ValidatedDocument;
use crate::core::apply_merge_patch;
use crate::core::references::strip_artifacts;
use crate::interfaces::DataListener;
use crate::interfaces::MetastoreStorage;
use crate::interfaces::SchemaRetriever;
use crate::interfaces::StorageFactory;
use crate::runtime::errors::MetastoreError;
use crate::runtime::store::IDENTIFIER_PROPERTY;
use crate::runtime::validation::DocumentValidator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default schema id of the catalog skeleton.
pub const DEFAULT_CATALOG_SCHEMA: &str = "catalog";
/// Default schema id of catalog datasets.
pub const DEFAULT_DATASET_SCHEMA: &str = "dataset";
/// Catalog property receiving the published datasets.
pub const CATALOG_DATASET_PROPERTY: &str = "dataset";
/// Record property listing resource references.
pub const DISTRIBUTION_PROPERTY: &str = "distribution";
/// Message reported when a write tries to change a record identifier.
pub const IDENTIFIER_IMMUTABLE: &str = "Identifier cannot be modified";

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// Record identifier.
    pub identifier: RecordId,
    /// True when the PUT created the record.
    pub created: bool,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Long-lived metastore service.
pub struct MetastoreService {
    /// Validation factory.
    validator: Arc<DocumentValidator>,
    /// Per-schema storage factory.
    storage_factory: Arc<dyn StorageFactory>,
    /// Read listeners in registration order.
    data_listeners: Vec<Arc<dyn DataListener>>,
    /// Schema id of the catalog skeleton.
    catalog_schema: SchemaId,
    /// Schema id of catalog datasets.
    dataset_schema: SchemaId,
}

impl MetastoreService {
    /// Creates a service over a schema source and a storage factory.
    #[must_use]
    pub fn new(
        schema_retriever: Arc<dyn SchemaRetriever>,
        storage_factory: Arc<dyn StorageFactory>,
    ) -> Self {
        Self {
            validator: Arc::new(DocumentValidator::new(schema_retriever)),
            storage_factory,
            data_listeners: Vec::new(),
            catalog_schema: SchemaId::new(DEFAULT_CATALOG_SCHEMA),
            dataset_schema: SchemaId::new(DEFAULT_DATASET_SCHEMA),
        }
    }

    /// Appends a data listener.
    #[must_use]
    pub fn with_data_listener(mut self, listener: Arc<dyn DataListener>) -> Self {
        self.data_listeners.push(listener);
        self
    }

    /// Overrides the catalog and dataset schema ids.
    #[must_use]
    pub fn with_catalog_schemas(mut self, catalog: SchemaId, dataset: SchemaId) -> Self {
        self.catalog_schema = catalog;
        self.dataset_schema = dataset;
        self
    }

    /// Returns the validation factory.
    #[must_use]
    pub fn validator(&self) -> &DocumentValidator {
        &self.validator
    }

    /// Opens a request-scoped session.
    #[must_use]
    pub const fn session(&self) -> MetastoreSession<'_> {
        MetastoreSession {
            service: self,
            storages: BTreeMap::new(),
        }
    }

    /// Returns every schema keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when the schema source fails.
    pub fn get_schemas(&self) -> Result<BTreeMap<SchemaId, Value>, MetastoreError> {
        let retriever = self.validator.retriever();
        let mut schemas = BTreeMap::new();
        for schema_id in retriever.all_ids()? {
            let schema = retriever.retrieve(&schema_id)?;
            schemas.insert(schema_id, schema);
        }
        Ok(schemas)
    }

    /// Returns one schema.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::NotFound`] for unknown schema ids.
    pub fn get_schema(&self, schema_id: &SchemaId) -> Result<Value, MetastoreError> {
        Ok(self.validator.retriever().retrieve(schema_id)?)
    }

    /// Parses and validates raw JSON against a schema.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::InvalidJson`] or [`MetastoreError::Validation`].
    pub fn validate(
        &self,
        raw: &str,
        schema_id: &SchemaId,
    ) -> Result<ValidatedDocument, MetastoreError> {
        Ok(self.validator.validate(raw, Some(schema_id))?)
    }

    /// Runs the per-item read listeners.
    fn dispatch_get(
        &self,
        schema_id: &SchemaId,
        document: ValidatedDocument,
    ) -> Result<ValidatedDocument, MetastoreError> {
        let mut document = document;
        for listener in &self.data_listeners {
            document = listener.on_data_get(schema_id, document)?;
        }
        Ok(document)
    }

    /// Runs the bulk read listeners.
    fn dispatch_get_all(
        &self,
        schema_id: &SchemaId,
        documents: Vec<ValidatedDocument>,
    ) -> Result<Vec<ValidatedDocument>, MetastoreError> {
        let mut documents = documents;
        for listener in &self.data_listeners {
            documents = listener.on_data_get_all(schema_id, documents)?;
        }
        Ok(documents)
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Request-scoped view of the metastore.
///
/// # Invariants
/// - Each schema id resolves to one storage handle for the session lifetime.
/// - Sessions are not shared between requests.
pub struct MetastoreSession<'a> {
    /// Owning service.
    service: &'a MetastoreService,
    /// Storage handles resolved during this session.
    storages: BTreeMap<SchemaId, Arc<dyn MetastoreStorage>>,
}

impl MetastoreSession<'_> {
    /// Returns the owning service.
    #[must_use]
    pub const fn service(&self) -> &MetastoreService {
        self.service
    }

    /// Returns the storage for a schema, resolving it once per session.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::Store`] when the factory cannot open the storage.
    pub fn storage(
        &mut self,
        schema_id: &SchemaId,
    ) -> Result<Arc<dyn MetastoreStorage>, MetastoreError> {
        if let Some(storage) = self.storages.get(schema_id) {
            return Ok(Arc::clone(storage));
        }
        let storage = self.service.storage_factory.storage(schema_id)?;
        self.storages.insert(schema_id.clone(), Arc::clone(&storage));
        Ok(storage)
    }

    /// Returns every published record of a schema.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when storage or a bulk listener fails.
    pub fn get_all(
        &mut self,
        schema_id: &SchemaId,
    ) -> Result<Vec<ValidatedDocument>, MetastoreError> {
        let bodies = self.storage(schema_id)?.retrieve_all()?;
        let documents = self.convert_bodies(schema_id, &bodies);
        self.service.dispatch_get_all(schema_id, documents)
    }

    /// Returns a window of published records of a schema.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when storage or a bulk listener fails.
    pub fn get_range(
        &mut self,
        schema_id: &SchemaId,
        start: usize,
        length: usize,
    ) -> Result<Vec<ValidatedDocument>, MetastoreError> {
        let bodies = self.storage(schema_id)?.retrieve_range(start, length)?;
        let documents = self.convert_bodies(schema_id, &bodies);
        self.service.dispatch_get_all(schema_id, documents)
    }

    /// Returns the published revision of a record.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::MissingObject`] when the record has no
    /// published revision.
    pub fn get(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<ValidatedDocument, MetastoreError> {
        let body = self.storage(schema_id)?.retrieve_published(identifier)?;
        let document = self.service.validate(&body, schema_id)?;
        self.service.dispatch_get(schema_id, document)
    }

    /// Returns the distribution entries of the latest revision of a record.
    ///
    /// A missing distribution yields an empty list; a non-array value yields
    /// a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::MissingObject`] when the record does not exist.
    pub fn get_resources(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<Vec<Value>, MetastoreError> {
        let body = self.storage(schema_id)?.retrieve(identifier)?;
        let mut root = self.service.validate(&body, schema_id)?.into_root();
        Ok(match root.get_mut(DISTRIBUTION_PROPERTY).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
        })
    }

    /// Creates a record and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::ExistingObject`] when the document carries an
    /// identifier that already exists.
    pub fn post(
        &mut self,
        schema_id: &SchemaId,
        document: &ValidatedDocument,
    ) -> Result<RecordId, MetastoreError> {
        let identifier = document.identifier().map(RecordId::new);
        if let Some(identifier) = &identifier
            && self.object_exists(schema_id, identifier)?
        {
            return Err(MetastoreError::ExistingObject(format!(
                "{schema_id}/{identifier} already exists."
            )));
        }
        let receipt = self.storage(schema_id)?.store(document.root(), identifier.as_ref())?;
        info!(schema_id = %schema_id, identifier = %receipt.identifier, "record created");
        Ok(receipt.identifier)
    }

    /// Creates or revises a record at a fixed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::CannotChangeUuid`] when the embedded identifier
    /// differs, and [`MetastoreError::UnmodifiedObject`] when the document is
    /// equivalent to the latest revision.
    pub fn put(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
        document: &ValidatedDocument,
    ) -> Result<PutOutcome, MetastoreError> {
        if let Some(embedded) = document.identifier()
            && embedded != identifier.as_str()
        {
            return Err(MetastoreError::CannotChangeUuid(IDENTIFIER_IMMUTABLE.to_string()));
        }
        if self.object_exists(schema_id, identifier)?
            && self.object_is_equivalent(schema_id, identifier, document)?
        {
            return Err(MetastoreError::UnmodifiedObject(format!(
                "No changes to {schema_id} with identifier {identifier}."
            )));
        }
        let receipt = self.storage(schema_id)?.store(document.root(), Some(identifier))?;
        info!(
            schema_id = %schema_id,
            identifier = %identifier,
            revision = %receipt.revision,
            created = receipt.created,
            "record stored"
        );
        Ok(PutOutcome {
            identifier: receipt.identifier,
            created: receipt.created,
        })
    }

    /// Applies a JSON Merge Patch to the latest revision and stores the result.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::MissingObject`] when the record does not
    /// exist, [`MetastoreError::CannotChangeUuid`] when the patch rewrites the
    /// identifier, and [`MetastoreError::Validation`] when the merged document
    /// violates the schema.
    pub fn patch(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
        patch: &Value,
    ) -> Result<RecordId, MetastoreError> {
        let storage = self.storage(schema_id)?;
        if !storage.exists(identifier)? {
            return Err(missing_object(identifier));
        }
        let current = storage.retrieve(identifier)?;
        let mut merged: Value = serde_json::from_str(&current).map_err(|err| {
            MetastoreError::Unexpected(format!("stored record is not json: {err}"))
        })?;
        apply_merge_patch(&mut merged, patch);
        if let Some(embedded) = merged.get(IDENTIFIER_PROPERTY).and_then(Value::as_str)
            && embedded != identifier.as_str()
        {
            return Err(MetastoreError::CannotChangeUuid(IDENTIFIER_IMMUTABLE.to_string()));
        }
        let document = self.service.validator.validate_value(merged, Some(schema_id))?;
        let receipt = storage.store(document.root(), Some(identifier))?;
        info!(
            schema_id = %schema_id,
            identifier = %identifier,
            revision = %receipt.revision,
            "record patched"
        );
        Ok(receipt.identifier)
    }

    /// Moves the published pointer to the latest revision.
    ///
    /// Returns true when the pointer moved.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::MissingObject`] when the record does not exist.
    pub fn publish(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<bool, MetastoreError> {
        if !self.object_exists(schema_id, identifier)? {
            return Err(missing_object(identifier));
        }
        let moved = self.storage(schema_id)?.publish(identifier)?;
        info!(schema_id = %schema_id, identifier = %identifier, moved, "record published");
        Ok(moved)
    }

    /// Removes every revision of a record.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when storage fails.
    pub fn delete(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<RecordId, MetastoreError> {
        let removed = self.storage(schema_id)?.remove(identifier)?;
        info!(schema_id = %schema_id, identifier = %identifier, removed, "record deleted");
        Ok(identifier.clone())
    }

    /// Assembles the catalog: the catalog schema document with every published
    /// dataset under `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when the catalog schema or dataset read fails.
    pub fn get_catalog(&mut self) -> Result<Value, MetastoreError> {
        let catalog_schema = self.service.catalog_schema.clone();
        let dataset_schema = self.service.dataset_schema.clone();
        let mut catalog = self.service.get_schema(&catalog_schema)?;
        let datasets: Vec<Value> =
            self.get_all(&dataset_schema)?.into_iter().map(ValidatedDocument::into_root).collect();
        let Value::Object(map) = &mut catalog else {
            return Err(MetastoreError::Unexpected(format!(
                "catalog schema {catalog_schema} is not a json object"
            )));
        };
        map.insert(CATALOG_DATASET_PROPERTY.to_string(), Value::Array(datasets));
        Ok(catalog)
    }

    /// Returns true when the record has at least one revision.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when storage fails.
    pub fn object_exists(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
    ) -> Result<bool, MetastoreError> {
        Ok(self.storage(schema_id)?.exists(identifier)?)
    }

    /// Compares a document with the latest revision, ignoring reference
    /// artifacts and key order.
    fn object_is_equivalent(
        &mut self,
        schema_id: &SchemaId,
        identifier: &RecordId,
        document: &ValidatedDocument,
    ) -> Result<bool, MetastoreError> {
        let existing = self.storage(schema_id)?.retrieve(identifier)?;
        let existing = self.service.validate(&existing, schema_id)?;
        let mut incoming = strip_artifacts(document.root(), REFERENCE_MARKER);
        if let Value::Object(map) = &mut incoming {
            map.entry(IDENTIFIER_PROPERTY)
                .or_insert_with(|| Value::String(identifier.to_string()));
        }
        Ok(incoming == strip_artifacts(existing.root(), REFERENCE_MARKER))
    }

    /// Validates stored bodies and runs per-item listeners, dropping failures.
    fn convert_bodies(&self, schema_id: &SchemaId, bodies: &[String]) -> Vec<ValidatedDocument> {
        bodies
            .iter()
            .filter_map(|body| {
                let converted = self
                    .service
                    .validator
                    .validate(body, Some(schema_id))
                    .map_err(MetastoreError::from)
                    .and_then(|document| self.service.dispatch_get(schema_id, document));
                match converted {
                    Ok(document) => Some(document),
                    Err(err) => {
                        warn!(
                            schema_id = %schema_id,
                            error = %err,
                            "dropping stored record from bulk read"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

/// Builds the missing-object error for an identifier.
fn missing_object(identifier: &RecordId) -> MetastoreError {
    debug!(identifier = %identifier, "record not found");
    MetastoreError::MissingObject(format!("No data with the identifier {identifier} was found."))
}
