// crates/metastore-core/tests/store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Tests for the in-memory keyed table and record storage.
// ============================================================================
//! ## Overview
//! Validates query filtering, ordering, paging, projection, guarded inserts,
//! and record identifier assignment.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use metastore_core::InMemoryKeyedTable;
use metastore_core::InMemoryMetastoreStorage;
use metastore_core::InsertOutcome;
use metastore_core::KeyedTable;
use metastore_core::MetastoreStorage;
use metastore_core::Query;
use metastore_core::RecordId;
use metastore_core::SortOrder;
use metastore_core::StoreError;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Keyed Table
// ============================================================================

fn seeded_table() -> InMemoryKeyedTable {
    let table = InMemoryKeyedTable::new();
    for (name, version) in [("a", 1), ("a", 3), ("a", 2), ("b", 1)] {
        table.store(&json!({"name": name, "version": version})).unwrap();
    }
    table
}

#[test]
fn query_filters_sorts_and_limits() {
    let table = seeded_table();
    let query = Query::new()
        .select(&["version", "id"])
        .condition("name", "a")
        .sort_by("version", SortOrder::Descending)
        .limit(2);
    let rows = table.query(&query).unwrap();
    let data: Vec<Value> = rows.into_iter().map(|row| row.data).collect();
    assert_eq!(data, vec![json!({"version": 3, "id": "2"}), json!({"version": 2, "id": "3"})]);
}

#[test]
fn query_offset_skips_rows_after_sorting() {
    let table = seeded_table();
    let query = Query::new().sort_by("version", SortOrder::Ascending).offset(3);
    let rows = table.query(&query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].property("version"), Some(&json!(3)));
}

#[test]
fn rows_expose_their_id_and_can_be_removed() {
    let table = seeded_table();
    let all = table.retrieve_all().unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(table.retrieve(&all[0].id).unwrap().unwrap()["id"], json!(all[0].id));
    assert!(table.remove(&all[0].id).unwrap());
    assert!(!table.remove(&all[0].id).unwrap());
    assert_eq!(table.retrieve_range(1, 10).unwrap().len(), 2);
}

#[test]
fn guarded_insert_reports_the_first_conflict() {
    let table = seeded_table();
    let conflicts = [
        Query::new().condition("name", "z"),
        Query::new().condition("name", "b").limit(1),
    ];
    let outcome = table.insert_unless_exists(&json!({"name": "b", "version": 2}), &conflicts).unwrap();
    match outcome {
        InsertOutcome::Conflict {
            query_index,
            rows,
        } => {
            assert_eq!(query_index, 1);
            assert_eq!(rows.len(), 1);
        }
        InsertOutcome::Inserted(_) => panic!("insert should conflict"),
    }
    assert_eq!(table.retrieve_all().unwrap().len(), 4);

    let fresh = [Query::new().condition("name", "c")];
    let outcome = table.insert_unless_exists(&json!({"name": "c"}), &fresh).unwrap();
    assert!(matches!(outcome, InsertOutcome::Inserted(_)));
}

#[test]
fn non_object_rows_are_rejected() {
    assert!(InMemoryKeyedTable::new().store(&json!([1, 2])).is_err());
}

// ============================================================================
// SECTION: Record Storage
// ============================================================================

#[test]
fn store_assigns_and_injects_identifiers() {
    let storage = InMemoryMetastoreStorage::new();
    let generated = storage.store(&json!({"title": "a"}), None).unwrap();
    assert!(generated.created);
    let body: Value = serde_json::from_str(&storage.retrieve(&generated.identifier).unwrap()).unwrap();
    assert_eq!(body["identifier"], json!(generated.identifier.as_str()));

    let embedded = storage.store(&json!({"identifier": "x", "title": "b"}), None).unwrap();
    assert_eq!(embedded.identifier, RecordId::new("x"));
    let revised = storage.store(&json!({"title": "c"}), Some(&RecordId::new("x"))).unwrap();
    assert!(!revised.created);
    assert_eq!(revised.revision.get(), 2);
}

#[test]
fn unpublished_records_are_invisible_to_published_reads() {
    let storage = InMemoryMetastoreStorage::new();
    let id = RecordId::new("x");
    storage.store(&json!({"title": "a"}), Some(&id)).unwrap();
    assert!(matches!(storage.retrieve_published(&id), Err(StoreError::MissingObject(_))));
    assert!(storage.retrieve_all().unwrap().is_empty());
    assert!(storage.publish(&id).unwrap());
    assert_eq!(storage.retrieve_all().unwrap().len(), 1);
    assert!(matches!(storage.publish(&RecordId::new("y")), Err(StoreError::MissingObject(_))));
}

#[test]
fn non_object_bodies_are_invalid() {
    let storage = InMemoryMetastoreStorage::new();
    assert!(matches!(storage.store(&json!("text"), None), Err(StoreError::Invalid(_))));
}
