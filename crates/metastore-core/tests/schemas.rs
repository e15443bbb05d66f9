// crates/metastore-core/tests/schemas.rs
// ============================================================================
// Module: Schema Retriever Tests
// Description: Tests for directory-backed schema retrieval and validation.
// ============================================================================
//! ## Overview
//! Validates schema listing, bounded reads, id sanitization, and compiled
//! validator reuse.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;
use std::sync::Arc;

use metastore_core::DirectorySchemaRetriever;
use metastore_core::DocumentError;
use metastore_core::DocumentValidator;
use metastore_core::SchemaError;
use metastore_core::SchemaId;
use metastore_core::SchemaRetriever;
use serde_json::json;
use tempfile::TempDir;

fn schema_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("dataset.json"),
        json!({"type": "object", "required": ["title"]}).to_string(),
    )
    .unwrap();
    fs::write(dir.path().join("catalog.json"), json!({"type": "object"}).to_string()).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    dir
}

#[test]
fn directory_lists_json_schemas_in_order() {
    let dir = schema_dir();
    let retriever = DirectorySchemaRetriever::new(dir.path());
    let ids = retriever.all_ids().unwrap();
    assert_eq!(ids, vec![SchemaId::new("catalog"), SchemaId::new("dataset")]);
    assert_eq!(
        retriever.retrieve(&SchemaId::new("dataset")).unwrap()["required"],
        json!(["title"])
    );
}

#[test]
fn unknown_and_unsafe_ids_are_rejected() {
    let dir = schema_dir();
    let retriever = DirectorySchemaRetriever::new(dir.path());
    assert!(matches!(retriever.retrieve(&SchemaId::new("missing")), Err(SchemaError::NotFound(_))));
    assert!(matches!(
        retriever.retrieve(&SchemaId::new("../dataset")),
        Err(SchemaError::Invalid(_))
    ));
}

#[test]
fn oversized_schemas_are_rejected() {
    let dir = schema_dir();
    let retriever = DirectorySchemaRetriever::with_limit(dir.path(), 8);
    assert!(matches!(retriever.retrieve(&SchemaId::new("dataset")), Err(SchemaError::Invalid(_))));
}

#[test]
fn validator_checks_the_reference_stripped_view() {
    let dir = schema_dir();
    let schema = json!({"type": "object", "additionalProperties": false, "properties": {"title": {}}});
    fs::write(dir.path().join("strict.json"), schema.to_string()).unwrap();
    let validator = DocumentValidator::new(Arc::new(DirectorySchemaRetriever::new(dir.path())));
    let strict = SchemaId::new("strict");

    let doc = validator.validate(r#"{"title": "t", "%Ref:title": {"x": 1}}"#, Some(&strict)).unwrap();
    assert_eq!(doc.schema_id(), Some(&strict));
    assert!(matches!(
        validator.validate(r#"{"title": "t", "extra": 1}"#, Some(&strict)),
        Err(DocumentError::Validation { .. })
    ));
    assert!(matches!(validator.validate("{not json", Some(&strict)), Err(DocumentError::InvalidJson(_))));
    assert!(matches!(
        validator.validate("{}", Some(&SchemaId::new("nope"))),
        Err(DocumentError::SchemaNotFound(_))
    ));
    let first = validator.validator_for(&strict).unwrap();
    let second = validator.validator_for(&strict).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn set_revalidates_and_rolls_back() {
    let dir = schema_dir();
    let validator = DocumentValidator::new(Arc::new(DirectorySchemaRetriever::new(dir.path())));
    let mut doc = validator.validate(r#"{"title": "t"}"#, Some(&SchemaId::new("dataset"))).unwrap();
    assert!(doc.set("/title", json!("u")).is_ok());
    assert!(doc.set("", json!({"no_title": true})).is_err());
    assert_eq!(doc.root(), &json!({"title": "u"}));
}
