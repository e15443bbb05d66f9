// crates/metastore-core/src/core/document.rs
// ============================================================================
// Module: Metastore Validated Documents
// Description: JSON documents that have passed schema validation.
// Purpose: Carry a document root together with the schema it was checked against.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ValidatedDocument`] wraps a JSON root that has been validated against a
//! named schema, or explicitly left unvalidated when no schema id is given.
//! Path access uses RFC 6901 JSON Pointers. Writes through [`ValidatedDocument::set`]
//! re-validate the candidate root and leave the document untouched on failure.
//!
//! Reference artifacts (properties whose name contains `%`) are never part of
//! the validated shape: validation always runs over the reference-stripped view.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::SchemaId;
use crate::core::references::REFERENCE_MARKER;
use crate::core::references::strip_artifacts;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document parsing and validation errors.
///
/// # Invariants
/// - Messages never embed the full document payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Input was not well-formed JSON.
    #[error("invalid json: {0}")]
    InvalidJson(String),
    /// Document failed schema validation.
    #[error("document failed validation against schema {schema_id}: {}", messages.join("; "))]
    Validation {
        /// Schema the document was checked against.
        schema_id: SchemaId,
        /// Individual validation failure messages.
        messages: Vec<String>,
    },
    /// Schema could not be loaded or compiled.
    #[error("schema {schema_id} unavailable: {message}")]
    Schema {
        /// Requested schema identifier.
        schema_id: SchemaId,
        /// Failure description.
        message: String,
    },
    /// Schema does not exist.
    #[error("schema {0} not found")]
    SchemaNotFound(SchemaId),
    /// JSON Pointer could not be applied.
    #[error("invalid document path {0}")]
    Path(String),
}

// ============================================================================
// SECTION: Validated Document
// ============================================================================

/// JSON document checked against a schema.
///
/// # Invariants
/// - When `schema_id` is `Some`, the reference-stripped view of `root` satisfies
///   the compiled schema held in `validator`.
/// - Equality compares `root` values only.
#[derive(Clone)]
pub struct ValidatedDocument {
    /// Schema the root was validated against (`None` means validation was skipped).
    schema_id: Option<SchemaId>,
    /// Document root value.
    root: Value,
    /// Compiled schema used to re-validate writes.
    validator: Option<Arc<Validator>>,
}

impl ValidatedDocument {
    /// Wraps a root value without schema validation.
    #[must_use]
    pub const fn unvalidated(root: Value) -> Self {
        Self {
            schema_id: None,
            root,
            validator: None,
        }
    }

    /// Validates `root` against a compiled schema and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Validation`] when the document does not satisfy the schema.
    pub fn validated(
        schema_id: SchemaId,
        validator: Arc<Validator>,
        root: Value,
    ) -> Result<Self, DocumentError> {
        check_against(&schema_id, &validator, &root)?;
        Ok(Self {
            schema_id: Some(schema_id),
            root,
            validator: Some(validator),
        })
    }

    /// Returns the schema identifier, if any.
    #[must_use]
    pub const fn schema_id(&self) -> Option<&SchemaId> {
        self.schema_id.as_ref()
    }

    /// Returns the document root.
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.root
    }

    /// Consumes the document and returns its root.
    #[must_use]
    pub fn into_root(self) -> Value {
        self.root
    }

    /// Returns the top-level `identifier` property when it is a non-empty string.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.root.get("identifier").and_then(Value::as_str).filter(|value| !value.is_empty())
    }

    /// Returns the value at a JSON Pointer (`""` is the root).
    #[must_use]
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Writes a value at a JSON Pointer and re-validates the document.
    ///
    /// The parent of the target must already exist. Array targets accept an
    /// existing index, the current length, or `-` to append.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Path`] when the pointer cannot be applied and
    /// [`DocumentError::Validation`] when the result violates the schema. The
    /// document is unchanged on error.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<(), DocumentError> {
        let mut candidate = self.root.clone();
        write_pointer(&mut candidate, pointer, value)?;
        if let (Some(schema_id), Some(validator)) = (&self.schema_id, &self.validator) {
            check_against(schema_id, validator, &candidate)?;
        }
        self.root = candidate;
        Ok(())
    }

    /// Mutable access for reference rewriting, which never touches the validated view.
    pub(crate) const fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }
}

impl PartialEq for ValidatedDocument {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl fmt::Debug for ValidatedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedDocument")
            .field("schema_id", &self.schema_id)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ValidatedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the reference-stripped view of `root`.
fn check_against(
    schema_id: &SchemaId,
    validator: &Validator,
    root: &Value,
) -> Result<(), DocumentError> {
    let view = strip_artifacts(root, REFERENCE_MARKER);
    let messages: Vec<String> = validator.iter_errors(&view).map(|err| err.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(DocumentError::Validation {
            schema_id: schema_id.clone(),
            messages,
        })
    }
}

/// Decodes one RFC 6901 reference token.
fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Writes `value` at `pointer` inside `root`.
fn write_pointer(root: &mut Value, pointer: &str, value: Value) -> Result<(), DocumentError> {
    if pointer.is_empty() {
        *root = value;
        return Ok(());
    }
    let Some((parent_pointer, token)) = pointer.rsplit_once('/') else {
        return Err(DocumentError::Path(pointer.to_string()));
    };
    let key = unescape_token(token);
    let parent =
        root.pointer_mut(parent_pointer).ok_or_else(|| DocumentError::Path(pointer.to_string()))?;
    match parent {
        Value::Object(map) => {
            map.insert(key, value);
            Ok(())
        }
        Value::Array(items) => {
            if key == "-" {
                items.push(value);
                return Ok(());
            }
            let index: usize = key.parse().map_err(|_| DocumentError::Path(pointer.to_string()))?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => {
                    items[index] = value;
                    Ok(())
                }
                std::cmp::Ordering::Equal => {
                    items.push(value);
                    Ok(())
                }
                std::cmp::Ordering::Greater => Err(DocumentError::Path(pointer.to_string())),
            }
        }
        _ => Err(DocumentError::Path(pointer.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DocumentError;
    use super::ValidatedDocument;

    #[test]
    fn set_inserts_nested_key_and_appends_to_arrays() {
        let mut doc = ValidatedDocument::unvalidated(json!({"a": {"b": 1}, "list": [1]}));
        assert!(doc.set("/a/c", json!(2)).is_ok());
        assert!(doc.set("/list/-", json!(2)).is_ok());
        assert!(doc.set("/list/2", json!(3)).is_ok());
        assert_eq!(doc.root(), &json!({"a": {"b": 1, "c": 2}, "list": [1, 2, 3]}));
    }

    #[test]
    fn set_rejects_missing_parent_and_leaves_document_unchanged() {
        let mut doc = ValidatedDocument::unvalidated(json!({"a": 1}));
        let err = doc.set("/missing/child", json!(true));
        assert_eq!(err, Err(DocumentError::Path("/missing/child".to_string())));
        assert_eq!(doc.root(), &json!({"a": 1}));
    }

    #[test]
    fn set_with_empty_pointer_replaces_root() {
        let mut doc = ValidatedDocument::unvalidated(json!({"a": 1}));
        assert!(doc.set("", json!({"b": 2})).is_ok());
        assert_eq!(doc.get("/b"), Some(&json!(2)));
    }

    #[test]
    fn escaped_tokens_address_keys_with_slashes() {
        let mut doc = ValidatedDocument::unvalidated(json!({}));
        assert!(doc.set("/a~1b", json!(1)).is_ok());
        assert_eq!(doc.root(), &json!({"a/b": 1}));
    }
}
