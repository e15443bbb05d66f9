// crates/metastore-core/src/interfaces/mod.rs
// ============================================================================
// Module: Metastore Interfaces
// Description: Backend-agnostic interfaces for tables, record storage, schemas, and listeners.
// Purpose: Define the contract surfaces consumed by the metastore runtime.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the metastore integrates with storage engines, schema
//! sources, and observers without embedding backend-specific details.
//! Implementations must fail closed on missing or invalid data.
//!
//! The [`Query`] type carries its own in-process evaluation helpers so every
//! [`KeyedTable`] backend applies projection, ordering, and paging the same
//! way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::RecordId;
use crate::core::Resource;
use crate::core::RevisionId;
use crate::core::SchemaId;
use crate::core::ValidatedDocument;

// ============================================================================
// SECTION: Keyed Table
// ============================================================================

/// Property name that addresses the storage-assigned row id in queries.
pub const ROW_ID_PROPERTY: &str = "id";

/// Sort direction for table queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// Ordering applied to query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySort {
    /// Property to order by.
    pub property: String,
    /// Sort direction.
    pub order: SortOrder,
}

/// Filtered read against a keyed table.
///
/// # Invariants
/// - Conditions are conjunctive equality tests on top-level properties.
/// - An empty projection returns whole rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Properties to return; empty means all.
    pub properties: Vec<String>,
    /// Equality conditions (`property == value`).
    pub conditions: Vec<(String, Value)>,
    /// Optional result ordering.
    pub sort: Option<QuerySort>,
    /// Rows to skip before returning results.
    pub offset: Option<usize>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an unconstrained query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned properties.
    #[must_use]
    pub fn select(mut self, properties: &[&str]) -> Self {
        self.properties = properties.iter().map(|property| (*property).to_string()).collect();
        self
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn condition(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((property.to_string(), value.into()));
        self
    }

    /// Orders results by one property.
    #[must_use]
    pub fn sort_by(mut self, property: &str, order: SortOrder) -> Self {
        self.sort = Some(QuerySort {
            property: property.to_string(),
            order,
        });
        self
    }

    /// Skips the first `offset` rows.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true when `row` satisfies every condition.
    #[must_use]
    pub fn matches(&self, row: &TableRow) -> bool {
        self.conditions.iter().all(|(property, expected)| row.property(property) == Some(expected))
    }

    /// Filters, orders, pages, and projects rows held in memory.
    #[must_use]
    pub fn evaluate(&self, rows: impl IntoIterator<Item = TableRow>) -> Vec<TableRow> {
        let mut selected: Vec<TableRow> =
            rows.into_iter().filter(|row| self.matches(row)).collect();
        if let Some(sort) = &self.sort {
            selected.sort_by(|left, right| {
                let ordering =
                    compare_values(left.property(&sort.property), right.property(&sort.property));
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        self.page_and_project(selected)
    }

    /// Applies offset, limit, and projection to rows that are already filtered and ordered.
    #[must_use]
    pub fn page_and_project(&self, rows: Vec<TableRow>) -> Vec<TableRow> {
        rows.into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|row| self.project(row))
            .collect()
    }

    /// Applies the projection to a single row.
    #[must_use]
    pub fn project(&self, row: TableRow) -> TableRow {
        if self.properties.is_empty() {
            return row;
        }
        let mut data = Map::new();
        for property in &self.properties {
            if let Some(value) = row.property(property) {
                data.insert(property.clone(), value.clone());
            }
        }
        TableRow {
            id: row.id,
            data: Value::Object(data),
        }
    }
}

/// One stored table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Storage-assigned row identifier.
    pub id: String,
    /// Stored (or projected) row data.
    pub data: Value,
}

impl TableRow {
    /// Builds a row, writing the row id into the `id` property of object data.
    #[must_use]
    pub fn new(id: impl Into<String>, mut data: Value) -> Self {
        let id = id.into();
        if let Value::Object(map) = &mut data {
            map.insert(ROW_ID_PROPERTY.to_string(), Value::String(id.clone()));
        }
        Self {
            id,
            data,
        }
    }

    /// Returns a top-level property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Result of a guarded insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row stored under the returned id.
    Inserted(String),
    /// A conflict query matched; nothing was written.
    Conflict {
        /// Index of the first matching conflict query.
        query_index: usize,
        /// Rows returned by that query.
        rows: Vec<TableRow>,
    },
}

/// Keyed table errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TableError {
    /// Backend failure.
    #[error("table store error: {0}")]
    Store(String),
    /// Row data was not acceptable.
    #[error("table data invalid: {0}")]
    Invalid(String),
}

/// Abstract ordered keyed store.
///
/// Rows are JSON objects. Row ids are assigned by the table, are unique, and
/// order rows by insertion. Returned rows always carry their id in the `id`
/// property, so queries may filter, sort, and project on it.
pub trait KeyedTable: Send + Sync {
    /// Stores a new row and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the row cannot be written.
    fn store(&self, data: &Value) -> Result<String, TableError>;

    /// Returns a row by id.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend read fails.
    fn retrieve(&self, id: &str) -> Result<Option<Value>, TableError>;

    /// Returns every row in id order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend read fails.
    fn retrieve_all(&self) -> Result<Vec<TableRow>, TableError>;

    /// Returns up to `length` rows starting at `start`, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend read fails.
    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<TableRow>, TableError>;

    /// Removes a row; returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend write fails.
    fn remove(&self, id: &str) -> Result<bool, TableError>;

    /// Runs a filtered query.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend read fails.
    fn query(&self, query: &Query) -> Result<Vec<TableRow>, TableError>;

    /// Runs each conflict query and stores `data` only if all of them are empty.
    ///
    /// The checks and the insert are atomic with respect to other writers on
    /// the same table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when the backend read or write fails.
    fn insert_unless_exists(
        &self,
        data: &Value,
        conflicts: &[Query],
    ) -> Result<InsertOutcome, TableError>;
}

// ============================================================================
// SECTION: Record Storage
// ============================================================================

/// Record storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record (or its published revision) does not exist.
    #[error("missing object: {0}")]
    MissingObject(String),
    /// Record body was not acceptable.
    #[error("invalid record: {0}")]
    Invalid(String),
    /// Backend failure.
    #[error("record store error: {0}")]
    Store(String),
}

/// Result of storing a record body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Identifier the body was stored under.
    pub identifier: RecordId,
    /// Revision created by the write.
    pub revision: RevisionId,
    /// True when the write created the record.
    pub created: bool,
}

/// Per-schema append-only record store with a published pointer.
///
/// # Invariants
/// - Every `store` appends a revision; revisions are never rewritten.
/// - The published pointer moves only through `publish`.
pub trait MetastoreStorage: Send + Sync {
    /// Returns the latest revision body.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingObject`] when the record does not exist.
    fn retrieve(&self, identifier: &RecordId) -> Result<String, StoreError>;

    /// Returns the published revision body.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingObject`] when the record does not exist or
    /// has never been published.
    fn retrieve_published(&self, identifier: &RecordId) -> Result<String, StoreError>;

    /// Returns the published body of every published record in identifier order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend read fails.
    fn retrieve_all(&self) -> Result<Vec<String>, StoreError>;

    /// Returns a window of [`MetastoreStorage::retrieve_all`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend read fails.
    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<String>, StoreError>;

    /// Stores a body as a new revision.
    ///
    /// With `identifier` set, an existing record gains a revision and a missing
    /// one is created under that identifier. Without it, the body's
    /// `identifier` property is used, or a fresh UUID v4 is generated. The
    /// identifier is written into the body when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the body is not a JSON object.
    fn store(
        &self,
        body: &Value,
        identifier: Option<&RecordId>,
    ) -> Result<StoreReceipt, StoreError>;

    /// Moves the published pointer to the latest revision.
    ///
    /// Returns true when the pointer moved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingObject`] when the record does not exist.
    fn publish(&self, identifier: &RecordId) -> Result<bool, StoreError>;

    /// Removes every revision of a record; returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend write fails.
    fn remove(&self, identifier: &RecordId) -> Result<bool, StoreError>;

    /// Returns true when the record has at least one revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend read fails.
    fn exists(&self, identifier: &RecordId) -> Result<bool, StoreError>;
}

/// Produces per-schema record storage handles.
pub trait StorageFactory: Send + Sync {
    /// Returns the storage for a schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the storage cannot be opened.
    fn storage(&self, schema_id: &SchemaId) -> Result<Arc<dyn MetastoreStorage>, StoreError>;
}

// ============================================================================
// SECTION: Schema Retrieval
// ============================================================================

/// Schema retrieval errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema does not exist.
    #[error("schema not found: {0}")]
    NotFound(String),
    /// Schema content or identifier is invalid.
    #[error("schema invalid: {0}")]
    Invalid(String),
    /// Schema source could not be read.
    #[error("schema io error: {0}")]
    Io(String),
}

/// Opaque schema-by-id lookup.
pub trait SchemaRetriever: Send + Sync {
    /// Returns every available schema id in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the source cannot be listed.
    fn all_ids(&self) -> Result<Vec<SchemaId>, SchemaError>;

    /// Returns a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotFound`] for unknown ids.
    fn retrieve(&self, schema_id: &SchemaId) -> Result<Value, SchemaError>;
}

// ============================================================================
// SECTION: Listeners
// ============================================================================

/// Listener failures; any error aborts the notifying operation.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Listener refused the operation.
    #[error("listener rejected operation: {0}")]
    Rejected(String),
    /// Listener failed while handling the notification.
    #[error("listener failed: {0}")]
    Failed(String),
}

/// Observer of resource registrations and removals.
pub trait ResourceListener: Send + Sync {
    /// Called after a resource row is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] to fail the registration call.
    fn on_registration(&self, _resource: &Resource) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called before a source-perspective resource row is removed.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] to abort the removal.
    fn on_pre_remove_source(&self, _resource: &Resource) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Observer that may transform or veto documents on read.
pub trait DataListener: Send + Sync {
    /// Called for each document read.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] to veto the document.
    fn on_data_get(
        &self,
        _schema_id: &SchemaId,
        document: ValidatedDocument,
    ) -> Result<ValidatedDocument, ListenerError> {
        Ok(document)
    }

    /// Called with the full result of a bulk read.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] to fail the bulk read.
    fn on_data_get_all(
        &self,
        _schema_id: &SchemaId,
        documents: Vec<ValidatedDocument>,
    ) -> Result<Vec<ValidatedDocument>, ListenerError> {
        Ok(documents)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Total order over optional JSON values used for query sorting.
///
/// Missing values sort first, then null, booleans, numbers, strings, and
/// structured values (compared by serialized form).
#[must_use]
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => {
            let rank = value_rank(left).cmp(&value_rank(right));
            if rank != Ordering::Equal {
                return rank;
            }
            match (left, right) {
                (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
                (Value::Number(left), Value::Number(right)) => compare_numbers(left, right),
                (Value::String(left), Value::String(right)) => left.cmp(right),
                _ => left.to_string().cmp(&right.to_string()),
            }
        }
    }
}

/// Rank of a JSON value kind for cross-type ordering.
const fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compares JSON numbers, exactly for integers.
fn compare_numbers(left: &serde_json::Number, right: &serde_json::Number) -> Ordering {
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left.cmp(&right);
    }
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left.cmp(&right);
    }
    let left = left.as_f64().unwrap_or(0.0);
    let right = right.as_f64().unwrap_or(0.0);
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}
