// crates/metastore-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite record storage and keyed-table behavior.
// Purpose: Ensure durable revisions, publish pointers, and integrity checks.
// Dependencies: metastore-store-sqlite, metastore-core, proptest, rusqlite, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed record storage and keyed table.
//! Exercises durability across reopen, hash verification against tampered
//! rows, SQL-side query compilation, and the resource mapper and service
//! running on top of the durable backends.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use metastore_core::InMemoryKeyedTable;
use metastore_core::InMemorySchemaRetriever;
use metastore_core::InsertOutcome;
use metastore_core::KeyedTable;
use metastore_core::MetastoreError;
use metastore_core::MetastoreService;
use metastore_core::MetastoreStorage;
use metastore_core::Perspective;
use metastore_core::Query;
use metastore_core::RecordId;
use metastore_core::Resource;
use metastore_core::ResourceMapper;
use metastore_core::ResourceVersion;
use metastore_core::SchemaId;
use metastore_core::SortOrder;
use metastore_core::StoreError;
use metastore_core::TableRow;
use metastore_store_sqlite::SqliteStore;
use metastore_store_sqlite::SqliteStoreConfig;
use metastore_store_sqlite::SqliteStoreError;
use proptest::prelude::*;
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store(dir: &Path) -> SqliteStore {
    SqliteStore::open(SqliteStoreConfig::at(dir.join("metastore.db"))).unwrap()
}

fn dataset() -> SchemaId {
    SchemaId::new("dataset")
}

// ============================================================================
// SECTION: Record Storage
// ============================================================================

#[test]
fn revisions_append_and_publish_moves_pointer() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let storage = store.metastore_storage(&dataset());
    let id = RecordId::new("abc");

    let first = storage.store(&json!({"identifier": "abc", "title": "One"}), None).unwrap();
    assert!(first.created);
    assert_eq!(first.revision.get(), 1);
    assert!(matches!(storage.retrieve_published(&id), Err(StoreError::MissingObject(_))));
    assert!(storage.retrieve_all().unwrap().is_empty());

    assert!(storage.publish(&id).unwrap());
    assert!(!storage.publish(&id).unwrap());

    let second = storage.store(&json!({"title": "Two"}), Some(&id)).unwrap();
    assert!(!second.created);
    assert_eq!(second.revision.get(), 2);
    assert_eq!(storage.revision_count(&id).unwrap(), 2);

    let published: serde_json::Value =
        serde_json::from_str(&storage.retrieve_published(&id).unwrap()).unwrap();
    assert_eq!(published["title"], "One");
    let latest: serde_json::Value = serde_json::from_str(&storage.retrieve(&id).unwrap()).unwrap();
    assert_eq!(latest["title"], "Two");
    assert_eq!(latest["identifier"], "abc");
}

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let id = RecordId::new("persisted");
    {
        let store = open_store(dir.path());
        let storage = store.metastore_storage(&dataset());
        storage.store(&json!({"title": "Kept"}), Some(&id)).unwrap();
        storage.publish(&id).unwrap();
    }
    let store = open_store(dir.path());
    let storage = store.metastore_storage(&dataset());
    assert!(storage.exists(&id).unwrap());
    assert_eq!(storage.retrieve_all().unwrap().len(), 1);
}

#[test]
fn schemas_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let id = RecordId::new("shared");
    store.metastore_storage(&dataset()).store(&json!({}), Some(&id)).unwrap();
    assert!(!store.metastore_storage(&SchemaId::new("keyword")).exists(&id).unwrap());
}

#[test]
fn retrieve_range_pages_published_records_in_identifier_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let storage = store.metastore_storage(&dataset());
    for name in ["c", "a", "d", "b"] {
        let id = RecordId::new(name);
        storage.store(&json!({"name": name}), Some(&id)).unwrap();
        if name != "d" {
            storage.publish(&id).unwrap();
        }
    }
    let names: Vec<String> = storage
        .retrieve_range(1, 2)
        .unwrap()
        .iter()
        .map(|body| serde_json::from_str::<serde_json::Value>(body).unwrap()["name"].to_string())
        .collect();
    assert_eq!(names, vec!["\"b\"", "\"c\""]);
}

#[test]
fn remove_deletes_history() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let storage = store.metastore_storage(&dataset());
    let id = RecordId::new("gone");
    storage.store(&json!({}), Some(&id)).unwrap();
    storage.store(&json!({"v": 2}), Some(&id)).unwrap();
    assert!(storage.remove(&id).unwrap());
    assert!(!storage.remove(&id).unwrap());
    assert_eq!(storage.revision_count(&id).unwrap(), 0);
    assert!(matches!(storage.publish(&id), Err(StoreError::MissingObject(_))));
}

#[test]
fn tampered_body_fails_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metastore.db");
    let store = SqliteStore::open(SqliteStoreConfig::at(&path)).unwrap();
    let storage = store.metastore_storage(&dataset());
    let id = RecordId::new("t");
    storage.store(&json!({"title": "Original"}), Some(&id)).unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE record_revisions SET body = '{\"title\":\"Forged\"}'", []).unwrap();
    drop(raw);

    match storage.retrieve(&id) {
        Err(StoreError::Store(message)) => assert!(message.contains("hash mismatch")),
        other => panic!("expected corruption error, got {other:?}"),
    }
}

#[test]
fn non_object_bodies_are_invalid() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let storage = store.metastore_storage(&dataset());
    assert!(matches!(storage.store(&json!([1, 2]), None), Err(StoreError::Invalid(_))));
}

#[test]
fn schema_version_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metastore.db");
    drop(SqliteStore::open(SqliteStoreConfig::at(&path)).unwrap());
    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(raw);
    assert!(matches!(
        SqliteStore::open(SqliteStoreConfig::at(&path)),
        Err(SqliteStoreError::VersionMismatch(_))
    ));
}

#[test]
fn directory_paths_are_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        SqliteStore::open(SqliteStoreConfig::at(dir.path())),
        Err(SqliteStoreError::Invalid(_))
    ));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: SqliteStoreConfig =
        serde_json::from_value(json!({"path": "data/metastore.db", "sync_mode": "normal"})).unwrap();
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(config.journal_mode.pragma_value(), "wal");
    assert_eq!(config.sync_mode.pragma_value(), "normal");
}

// ============================================================================
// SECTION: Keyed Table
// ============================================================================

#[test]
fn query_filters_sorts_and_projects_in_sql() {
    let dir = TempDir::new().unwrap();
    let table = open_store(dir.path()).keyed_table("resources");
    for (name, version, active) in [("a", 1, true), ("a", 10, false), ("a", 2, true), ("b", 5, true)] {
        table.store(&json!({"name": name, "version": version, "active": active})).unwrap();
    }

    let newest = table
        .query(
            &Query::new()
                .select(&["version"])
                .condition("name", "a")
                .sort_by("version", SortOrder::Descending)
                .limit(1),
        )
        .unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].data, json!({"version": 10}));

    let active = table.query(&Query::new().condition("active", true)).unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|row| row.data["id"] == json!(row.id)));

    let by_id = table.query(&Query::new().condition("id", active[0].id.as_str())).unwrap();
    assert_eq!(by_id.len(), 1);
    assert!(table.query(&Query::new().condition("id", "not-a-number")).unwrap().is_empty());

    let string_one = table.query(&Query::new().condition("version", "1")).unwrap();
    assert!(string_one.is_empty());
}

#[test]
fn rows_are_partitioned_by_table_name() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let left = store.keyed_table("left");
    let right = store.keyed_table("right");
    let id = left.store(&json!({"k": 1})).unwrap();
    assert!(right.retrieve(&id).unwrap().is_none());
    assert!(!right.remove(&id).unwrap());
    assert_eq!(left.retrieve(&id).unwrap(), Some(json!({"k": 1, "id": id})));
    assert!(left.remove(&id).unwrap());
    assert!(left.retrieve_all().unwrap().is_empty());
}

#[test]
fn retrieve_range_pages_by_row_id() {
    let dir = TempDir::new().unwrap();
    let table = open_store(dir.path()).keyed_table("rows");
    for index in 0..5 {
        table.store(&json!({"index": index})).unwrap();
    }
    let page = table.retrieve_range(2, 2).unwrap();
    let indexes: Vec<i64> = page.iter().map(|row| row.data["index"].as_i64().unwrap()).collect();
    assert_eq!(indexes, vec![2, 3]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn range_reads_match_in_memory_table(
        count in 0_usize..8,
        start in 0_usize..10,
        length in 0_usize..10,
    ) {
        let dir = TempDir::new().unwrap();
        let sqlite = open_store(dir.path()).keyed_table("rows");
        let memory = InMemoryKeyedTable::new();
        for index in 0..count {
            let row = json!({"index": index});
            sqlite.store(&row).unwrap();
            memory.store(&row).unwrap();
        }
        let data = |rows: Vec<TableRow>| rows.into_iter().map(|row| row.data).collect::<Vec<_>>();
        let from_sqlite = data(sqlite.retrieve_range(start, length).unwrap());
        let from_memory = data(memory.retrieve_range(start, length).unwrap());
        prop_assert_eq!(from_sqlite, from_memory);
    }
}

#[test]
fn guarded_insert_reports_first_conflict() {
    let dir = TempDir::new().unwrap();
    let table = open_store(dir.path()).keyed_table("rows");
    table.store(&json!({"path": "/x", "name": "a"})).unwrap();
    let conflicts = [
        Query::new().condition("name", "b"),
        Query::new().condition("path", "/x"),
    ];
    match table.insert_unless_exists(&json!({"path": "/x", "name": "b"}), &conflicts).unwrap() {
        InsertOutcome::Conflict {
            query_index,
            rows,
        } => {
            assert_eq!(query_index, 1);
            assert_eq!(rows.len(), 1);
        }
        InsertOutcome::Inserted(id) => panic!("unexpected insert {id}"),
    }
    let inserted = table
        .insert_unless_exists(&json!({"path": "/y"}), &[Query::new().condition("path", "/y")])
        .unwrap();
    assert!(matches!(inserted, InsertOutcome::Inserted(_)));
    assert_eq!(table.retrieve_all().unwrap().len(), 2);
}

// ============================================================================
// SECTION: Core Services On SQLite
// ============================================================================

#[test]
fn resource_mapper_runs_on_sqlite_table() {
    let dir = TempDir::new().unwrap();
    let table: Arc<dyn KeyedTable> = Arc::new(open_store(dir.path()).keyed_table("resource_mapper"));
    let mapper = ResourceMapper::new(table);
    let v1 = Resource::new("res", ResourceVersion::new(1), "/data/v1.csv", "text/csv");
    let v2 = Resource::new("res", ResourceVersion::new(2), "/data/v2.csv", "text/csv");
    mapper.register(&v1).unwrap();
    mapper.register_new_version(&v2).unwrap();
    assert!(matches!(mapper.register(&v1), Err(MetastoreError::AlreadyRegistered(_))));

    let latest = mapper.get("res", &Perspective::Source, None).unwrap().unwrap();
    assert_eq!(latest.version, ResourceVersion::new(2));
    assert!(latest.id.is_some());
    assert!(!mapper.file_path_exists("/data/v1.csv").unwrap().is_available());
    assert!(mapper.remove(&v1).unwrap());
    assert!(mapper.file_path_exists("/data/v1.csv").unwrap().is_available());
}

#[test]
fn service_round_trips_through_sqlite_factory() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let schemas = InMemorySchemaRetriever::new().with_schema(
        "dataset",
        json!({"type": "object", "required": ["title"], "properties": {"title": {"type": "string"}}}),
    );
    let service = MetastoreService::new(Arc::new(schemas), Arc::new(store.storage_factory()));
    let mut session = service.session();
    let document = service.validate(r#"{"identifier": "d1", "title": "Durable"}"#, &dataset()).unwrap();
    let id = session.post(&dataset(), &document).unwrap();
    session.publish(&dataset(), &id).unwrap();
    let fetched = session.get(&dataset(), &id).unwrap();
    assert_eq!(fetched.root()["title"], "Durable");
    assert!(matches!(
        session.post(&dataset(), &document),
        Err(MetastoreError::ExistingObject(_))
    ));
}
