// crates/metastore-core/tests/references.rs
// ============================================================================
// Module: Reference Resolution Tests
// Description: Tests for stripping and swapping `%Ref:` sidecar properties.
// ============================================================================
//! ## Overview
//! Validates compact and dereferenced document views, including sidecars on
//! every element of list-valued properties.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use metastore_core::REFERENCE_MARKER;
use metastore_core::ValidatedDocument;
use metastore_core::remove_references;
use metastore_core::swap_references;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

fn dataset_with_sidecars() -> ValidatedDocument {
    ValidatedDocument::unvalidated(json!({
        "identifier": "ds-1",
        "title": "Roads",
        "%Ref:publisher": {"identifier": "pub-1", "data": {"name": "City"}},
        "publisher": "pub-1",
        "distribution": [
            {
                "downloadURL": "https://h-o.st/a.csv",
                "%Ref:downloadURL": [{"data": {"identifier": "res-a", "version": 1}}]
            },
            {
                "downloadURL": "https://h-o.st/b.csv",
                "%Ref:downloadURL": [{"data": {"identifier": "res-b", "version": 1}}]
            }
        ]
    }))
}

fn has_marker(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.keys().any(|key| key.contains(REFERENCE_MARKER)) || map.values().any(has_marker)
        }
        Value::Array(items) => items.iter().any(has_marker),
        _ => false,
    }
}

// ============================================================================
// SECTION: Remove References
// ============================================================================

#[test]
fn remove_references_strips_root_and_every_distribution_element() {
    let stripped = remove_references(dataset_with_sidecars(), REFERENCE_MARKER);
    assert!(!has_marker(stripped.root()));
    assert_eq!(stripped.get("/publisher"), Some(&json!("pub-1")));
    assert_eq!(stripped.get("/distribution/1/downloadURL"), Some(&json!("https://h-o.st/b.csv")));
}

#[test]
fn remove_references_leaves_plain_documents_unchanged() {
    let plain = json!({"identifier": "x", "keyword": ["a", "b"], "nested": {"k": 1}});
    let stripped = remove_references(ValidatedDocument::unvalidated(plain.clone()), "%");
    assert_eq!(stripped.root(), &plain);
}

// ============================================================================
// SECTION: Swap References
// ============================================================================

#[test]
fn swap_then_remove_inlines_root_sidecar_values() {
    let swapped = swap_references(&dataset_with_sidecars());
    let view = remove_references(swapped, REFERENCE_MARKER);
    assert!(!has_marker(view.root()));
    assert_eq!(
        view.get("/publisher"),
        Some(&json!({"identifier": "pub-1", "data": {"name": "City"}}))
    );
    assert!(view.schema_id().is_none());
}

#[test]
fn swap_leaves_array_element_properties_and_drops_their_sidecars() {
    let swapped = swap_references(&dataset_with_sidecars());
    assert!(!has_marker(swapped.root()));
    assert_eq!(swapped.get("/distribution/0/downloadURL"), Some(&json!("https://h-o.st/a.csv")));
    assert_eq!(swapped.get("/distribution/1/downloadURL"), Some(&json!("https://h-o.st/b.csv")));
    assert_eq!(swapped.get("/distribution/1/%Ref:downloadURL"), None);
}

#[test]
fn swap_ignores_sidecars_without_a_sibling() {
    let doc = ValidatedDocument::unvalidated(json!({"%Ref:orphan": {"x": 1}, "title": "t"}));
    let swapped = swap_references(&doc);
    assert_eq!(swapped.root(), &json!({"title": "t"}));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn stripping_is_idempotent(keys in proptest::collection::vec("[a-z%]{1,6}", 0..8)) {
        let mut map = serde_json::Map::new();
        for (index, key) in keys.iter().enumerate() {
            map.insert(key.clone(), json!(index));
        }
        let once = remove_references(ValidatedDocument::unvalidated(Value::Object(map)), "%");
        let twice = remove_references(once.clone(), "%");
        prop_assert_eq!(once.root(), twice.root());
        prop_assert!(!has_marker(once.root()));
    }
}
