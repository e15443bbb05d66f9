// crates/metastore-core/src/runtime/validation.rs
// ============================================================================
// Module: Metastore Document Validation
// Description: Schema-backed factory for validated documents.
// Purpose: Compile schemas once and validate raw JSON into ValidatedDocument values.
// Dependencies: crate::core, crate::interfaces, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! [`DocumentValidator`] resolves schemas through a [`SchemaRetriever`],
//! compiles each one once, and caches the compiled validator by schema id.
//! Validation always runs over the reference-stripped view of a document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use jsonschema::Validator;
use serde_json::Value;

use crate::core::DocumentError;
use crate::core::SchemaId;
use crate::core::ValidatedDocument;
use crate::interfaces::SchemaError;
use crate::interfaces::SchemaRetriever;

// ============================================================================
// SECTION: Document Validator
// ============================================================================

/// Validation factory with a per-schema compiled validator cache.
///
/// # Invariants
/// - A schema id is compiled at most once per validator instance unless
///   compilation fails.
pub struct DocumentValidator {
    /// Schema source.
    retriever: Arc<dyn SchemaRetriever>,
    /// Compiled validators keyed by schema id.
    compiled: Mutex<BTreeMap<SchemaId, Arc<Validator>>>,
}

impl DocumentValidator {
    /// Creates a validator backed by a schema retriever.
    #[must_use]
    pub fn new(retriever: Arc<dyn SchemaRetriever>) -> Self {
        Self {
            retriever,
            compiled: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the schema retriever.
    #[must_use]
    pub fn retriever(&self) -> &Arc<dyn SchemaRetriever> {
        &self.retriever
    }

    /// Parses and validates raw JSON.
    ///
    /// `schema_id = None` skips validation.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidJson`] for malformed input and
    /// [`DocumentError::Validation`] when the document violates the schema.
    pub fn validate(
        &self,
        raw: &str,
        schema_id: Option<&SchemaId>,
    ) -> Result<ValidatedDocument, DocumentError> {
        let root: Value =
            serde_json::from_str(raw).map_err(|err| DocumentError::InvalidJson(err.to_string()))?;
        self.validate_value(root, schema_id)
    }

    /// Validates an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Validation`] when the document violates the schema.
    pub fn validate_value(
        &self,
        root: Value,
        schema_id: Option<&SchemaId>,
    ) -> Result<ValidatedDocument, DocumentError> {
        match schema_id {
            None => Ok(ValidatedDocument::unvalidated(root)),
            Some(schema_id) => {
                let validator = self.validator_for(schema_id)?;
                ValidatedDocument::validated(schema_id.clone(), validator, root)
            }
        }
    }

    /// Returns the compiled validator for a schema, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::SchemaNotFound`] for unknown schemas and
    /// [`DocumentError::Schema`] when the schema cannot be compiled.
    pub fn validator_for(&self, schema_id: &SchemaId) -> Result<Arc<Validator>, DocumentError> {
        if let Some(validator) = self.lock(schema_id)?.get(schema_id) {
            return Ok(Arc::clone(validator));
        }
        let schema = self.retriever.retrieve(schema_id).map_err(|err| match err {
            SchemaError::NotFound(_) => DocumentError::SchemaNotFound(schema_id.clone()),
            SchemaError::Invalid(message) | SchemaError::Io(message) => DocumentError::Schema {
                schema_id: schema_id.clone(),
                message,
            },
        })?;
        let validator =
            Arc::new(jsonschema::options().build(&schema).map_err(|err| DocumentError::Schema {
                schema_id: schema_id.clone(),
                message: err.to_string(),
            })?);
        let mut guard = self.lock(schema_id)?;
        let entry = guard.entry(schema_id.clone()).or_insert(validator);
        Ok(Arc::clone(entry))
    }

    /// Locks the compiled validator cache.
    fn lock(
        &self,
        schema_id: &SchemaId,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<SchemaId, Arc<Validator>>>, DocumentError> {
        self.compiled.lock().map_err(|_| DocumentError::Schema {
            schema_id: schema_id.clone(),
            message: "validator cache mutex poisoned".to_string(),
        })
    }
}
