// crates/metastore-core/src/runtime/store.rs
// ============================================================================
// Module: Metastore In-Memory Stores
// Description: In-memory keyed table and revisioned record storage.
// Purpose: Provide deterministic collaborator implementations without external deps.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`KeyedTable`],
//! [`MetastoreStorage`], and [`StorageFactory`] for tests, embedding, and
//! local demos. Each structure guards its state with a single mutex, so
//! guarded inserts are atomic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use crate::core::RecordId;
use crate::core::RevisionId;
use crate::core::SchemaId;
use crate::interfaces::InsertOutcome;
use crate::interfaces::KeyedTable;
use crate::interfaces::MetastoreStorage;
use crate::interfaces::Query;
use crate::interfaces::ROW_ID_PROPERTY;
use crate::interfaces::StorageFactory;
use crate::interfaces::StoreError;
use crate::interfaces::StoreReceipt;
use crate::interfaces::TableError;
use crate::interfaces::TableRow;

// ============================================================================
// SECTION: Record Body Preparation
// ============================================================================

/// Property holding a record's identifier inside its body.
pub const IDENTIFIER_PROPERTY: &str = "identifier";

/// Resolves the identifier for a write and serializes the body.
///
/// Precedence: explicit identifier, then the body's `identifier` property,
/// then a generated UUID v4. The identifier is written into the body when the
/// body lacks one.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when the body is not a JSON object.
pub fn prepare_record_body(
    body: &Value,
    identifier: Option<&RecordId>,
) -> Result<(RecordId, String), StoreError> {
    let Value::Object(map) = body else {
        return Err(StoreError::Invalid("record body must be a json object".to_string()));
    };
    let embedded =
        map.get(IDENTIFIER_PROPERTY).and_then(Value::as_str).filter(|value| !value.is_empty());
    let identifier = match (identifier, embedded) {
        (Some(identifier), _) => identifier.clone(),
        (None, Some(embedded)) => RecordId::new(embedded),
        (None, None) => RecordId::generate(),
    };
    let mut map = map.clone();
    if embedded.is_none() {
        map.insert(IDENTIFIER_PROPERTY.to_string(), Value::String(identifier.to_string()));
    }
    let serialized = serde_json::to_string(&Value::Object(map))
        .map_err(|err| StoreError::Invalid(err.to_string()))?;
    Ok((identifier, serialized))
}

// ============================================================================
// SECTION: In-Memory Keyed Table
// ============================================================================

/// Mutable state of an in-memory table.
#[derive(Debug, Default)]
struct TableState {
    /// Last assigned row id.
    last_id: u64,
    /// Rows keyed by numeric id.
    rows: BTreeMap<u64, Value>,
}

impl TableState {
    /// Returns every row in id order.
    fn rows(&self) -> Vec<TableRow> {
        self.rows.iter().map(|(id, data)| TableRow::new(id.to_string(), data.clone())).collect()
    }

    /// Inserts a row and returns its id.
    fn insert(&mut self, data: &Value) -> Result<String, TableError> {
        let Value::Object(map) = data else {
            return Err(TableError::Invalid("table rows must be json objects".to_string()));
        };
        let mut map = map.clone();
        map.remove(ROW_ID_PROPERTY);
        self.last_id = self.last_id.saturating_add(1);
        self.rows.insert(self.last_id, Value::Object(map));
        Ok(self.last_id.to_string())
    }
}

/// In-memory keyed table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyedTable {
    /// Table state protected by a mutex.
    state: Arc<Mutex<TableState>>,
}

impl InMemoryKeyedTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the table state.
    fn lock(&self) -> Result<MutexGuard<'_, TableState>, TableError> {
        self.state.lock().map_err(|_| TableError::Store("keyed table mutex poisoned".to_string()))
    }
}

impl KeyedTable for InMemoryKeyedTable {
    fn store(&self, data: &Value) -> Result<String, TableError> {
        self.lock()?.insert(data)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Value>, TableError> {
        let Ok(key) = id.parse::<u64>() else {
            return Ok(None);
        };
        Ok(self.lock()?.rows.get(&key).map(|data| TableRow::new(id, data.clone()).data))
    }

    fn retrieve_all(&self) -> Result<Vec<TableRow>, TableError> {
        Ok(self.lock()?.rows())
    }

    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<TableRow>, TableError> {
        Ok(self.lock()?.rows().into_iter().skip(start).take(length).collect())
    }

    fn remove(&self, id: &str) -> Result<bool, TableError> {
        let Ok(key) = id.parse::<u64>() else {
            return Ok(false);
        };
        Ok(self.lock()?.rows.remove(&key).is_some())
    }

    fn query(&self, query: &Query) -> Result<Vec<TableRow>, TableError> {
        Ok(query.evaluate(self.lock()?.rows()))
    }

    fn insert_unless_exists(
        &self,
        data: &Value,
        conflicts: &[Query],
    ) -> Result<InsertOutcome, TableError> {
        let mut guard = self.lock()?;
        let rows = guard.rows();
        for (query_index, query) in conflicts.iter().enumerate() {
            let matched = query.evaluate(rows.iter().cloned());
            if !matched.is_empty() {
                return Ok(InsertOutcome::Conflict {
                    query_index,
                    rows: matched,
                });
            }
        }
        guard.insert(data).map(InsertOutcome::Inserted)
    }
}

// ============================================================================
// SECTION: In-Memory Record Storage
// ============================================================================

/// Revision history of one record.
#[derive(Debug, Clone, Default)]
struct RecordEntry {
    /// Serialized bodies, oldest first.
    revisions: Vec<String>,
    /// Published revision number (1-based).
    published: Option<usize>,
}

impl RecordEntry {
    /// Returns the published body, if any.
    fn published_body(&self) -> Option<&String> {
        self.published.and_then(|revision| self.revisions.get(revision.checked_sub(1)?))
    }
}

/// In-memory append-only record storage for one schema.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetastoreStorage {
    /// Records keyed by identifier.
    records: Arc<Mutex<BTreeMap<RecordId, RecordEntry>>>,
}

impl InMemoryMetastoreStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of revisions stored for a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the state mutex is poisoned.
    pub fn revision_count(&self, identifier: &RecordId) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(identifier).map_or(0, |entry| entry.revisions.len()))
    }

    /// Locks the record map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<RecordId, RecordEntry>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("record storage mutex poisoned".to_string()))
    }
}

/// Builds the missing-object error for an identifier.
fn missing(identifier: &RecordId) -> StoreError {
    StoreError::MissingObject(format!("No data with the identifier {identifier} was found."))
}

impl MetastoreStorage for InMemoryMetastoreStorage {
    fn retrieve(&self, identifier: &RecordId) -> Result<String, StoreError> {
        self.lock()?
            .get(identifier)
            .and_then(|entry| entry.revisions.last().cloned())
            .ok_or_else(|| missing(identifier))
    }

    fn retrieve_published(&self, identifier: &RecordId) -> Result<String, StoreError> {
        self.lock()?
            .get(identifier)
            .and_then(|entry| entry.published_body().cloned())
            .ok_or_else(|| missing(identifier))
    }

    fn retrieve_all(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.values().filter_map(|entry| entry.published_body().cloned()).collect())
    }

    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter_map(|entry| entry.published_body().cloned())
            .skip(start)
            .take(length)
            .collect())
    }

    fn store(
        &self,
        body: &Value,
        identifier: Option<&RecordId>,
    ) -> Result<StoreReceipt, StoreError> {
        let (identifier, serialized) = prepare_record_body(body, identifier)?;
        let mut guard = self.lock()?;
        let created = !guard.contains_key(&identifier);
        let entry = guard.entry(identifier.clone()).or_default();
        entry.revisions.push(serialized);
        let revision = RevisionId::new(entry.revisions.len() as u64);
        Ok(StoreReceipt {
            identifier,
            revision,
            created,
        })
    }

    fn publish(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let entry = guard.get_mut(identifier).ok_or_else(|| missing(identifier))?;
        let latest = entry.revisions.len();
        if entry.published == Some(latest) {
            return Ok(false);
        }
        entry.published = Some(latest);
        Ok(true)
    }

    fn remove(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(identifier).is_some())
    }

    fn exists(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(identifier))
    }
}

// ============================================================================
// SECTION: In-Memory Storage Factory
// ============================================================================

/// Factory handing out one in-memory storage per schema.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorageFactory {
    /// Storages keyed by schema id.
    storages: Arc<Mutex<BTreeMap<SchemaId, Arc<InMemoryMetastoreStorage>>>>,
}

impl InMemoryStorageFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the concrete storage for a schema, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the factory mutex is poisoned.
    pub fn in_memory(
        &self,
        schema_id: &SchemaId,
    ) -> Result<Arc<InMemoryMetastoreStorage>, StoreError> {
        let mut guard = self
            .storages
            .lock()
            .map_err(|_| StoreError::Store("storage factory mutex poisoned".to_string()))?;
        Ok(Arc::clone(guard.entry(schema_id.clone()).or_default()))
    }
}

impl StorageFactory for InMemoryStorageFactory {
    fn storage(&self, schema_id: &SchemaId) -> Result<Arc<dyn MetastoreStorage>, StoreError> {
        let storage: Arc<dyn MetastoreStorage> = self.in_memory(schema_id)?;
        Ok(storage)
    }
}
