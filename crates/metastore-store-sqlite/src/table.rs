// crates/metastore-store-sqlite/src/table.rs
// ============================================================================
// Module: SQLite Keyed Table
// Description: KeyedTable backed by a shared SQLite rows table.
// Purpose: Persist resource-mapper rows with SQL-side filtering and ordering.
// Dependencies: metastore-core, rusqlite, serde_json, tracing
// ============================================================================

//! ## Overview
//! Rows of every logical table live in `table_rows`, keyed by an
//! autoincrement id and partitioned by `table_name`. Query conditions and
//! ordering compile to `json_extract` expressions; the row id maps to the `id`
//! column. Projection runs after the fetch. Guarded inserts evaluate their
//! conflict queries and write the row inside one transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use metastore_core::InsertOutcome;
use metastore_core::KeyedTable;
use metastore_core::Query;
use metastore_core::SortOrder;
use metastore_core::TableError;
use metastore_core::TableRow;
use metastore_core::interfaces::ROW_ID_PROPERTY;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use tracing::debug;

use crate::store::SqliteStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::enforce_size;
use crate::store::to_sql_count;

// ============================================================================
// SECTION: Keyed Table
// ============================================================================

/// Named keyed table stored in `SQLite`.
#[derive(Clone)]
pub struct SqliteKeyedTable {
    /// Backing database.
    store: SqliteStore,
    /// Logical table name.
    table_name: String,
}

impl SqliteKeyedTable {
    /// Creates a table view over `store`.
    #[must_use]
    pub fn new(store: SqliteStore, table_name: &str) -> Self {
        Self {
            store,
            table_name: table_name.to_string(),
        }
    }

    /// Returns the logical table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Inserts a row.
    fn insert_row(&self, data: &Value) -> Result<String, SqliteStoreError> {
        let guard = self.store.lock()?;
        let id = insert_row(&guard, &self.table_name, data)?;
        drop(guard);
        Ok(id)
    }

    /// Reads one row body.
    fn read_row(&self, id: &str) -> Result<Option<Value>, SqliteStoreError> {
        let Ok(row_id) = id.parse::<i64>() else {
            return Ok(None);
        };
        let guard = self.store.lock()?;
        let body: Option<String> = guard
            .query_row(
                "SELECT body FROM table_rows WHERE table_name = ?1 AND id = ?2",
                params![self.table_name, row_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        body.map(|body| decode_row(row_id, &body).map(|row| row.data)).transpose()
    }

    /// Reads rows in id order.
    fn read_rows(
        &self,
        start: usize,
        length: Option<usize>,
    ) -> Result<Vec<TableRow>, SqliteStoreError> {
        let mut query = Query::new().offset(start);
        if let Some(length) = length {
            query = query.limit(length);
        }
        let guard = self.store.lock()?;
        let rows = run_query(&guard, &self.table_name, &query)?;
        drop(guard);
        Ok(rows)
    }

    /// Deletes a row.
    fn delete_row(&self, id: &str) -> Result<bool, SqliteStoreError> {
        let Ok(row_id) = id.parse::<i64>() else {
            return Ok(false);
        };
        let guard = self.store.lock()?;
        let removed = guard
            .execute(
                "DELETE FROM table_rows WHERE table_name = ?1 AND id = ?2",
                params![self.table_name, row_id],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(removed > 0)
    }

    /// Runs a query.
    fn select(&self, query: &Query) -> Result<Vec<TableRow>, SqliteStoreError> {
        let guard = self.store.lock()?;
        let rows = run_query(&guard, &self.table_name, query)?;
        drop(guard);
        Ok(rows)
    }

    /// Inserts a row unless any conflict query matches, atomically.
    fn guarded_insert(
        &self,
        data: &Value,
        conflicts: &[Query],
    ) -> Result<InsertOutcome, SqliteStoreError> {
        let mut guard = self.store.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        for (query_index, query) in conflicts.iter().enumerate() {
            let rows = run_query(&tx, &self.table_name, query)?;
            if !rows.is_empty() {
                debug!(table = %self.table_name, query_index, "guarded insert rejected");
                return Ok(InsertOutcome::Conflict {
                    query_index,
                    rows,
                });
            }
        }
        let id = insert_row(&tx, &self.table_name, data)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(InsertOutcome::Inserted(id))
    }
}

impl KeyedTable for SqliteKeyedTable {
    fn store(&self, data: &Value) -> Result<String, TableError> {
        self.insert_row(data).map_err(TableError::from)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Value>, TableError> {
        self.read_row(id).map_err(TableError::from)
    }

    fn retrieve_all(&self) -> Result<Vec<TableRow>, TableError> {
        self.read_rows(0, None).map_err(TableError::from)
    }

    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<TableRow>, TableError> {
        self.read_rows(start, Some(length)).map_err(TableError::from)
    }

    fn remove(&self, id: &str) -> Result<bool, TableError> {
        self.delete_row(id).map_err(TableError::from)
    }

    fn query(&self, query: &Query) -> Result<Vec<TableRow>, TableError> {
        self.select(query).map_err(TableError::from)
    }

    fn insert_unless_exists(
        &self,
        data: &Value,
        conflicts: &[Query],
    ) -> Result<InsertOutcome, TableError> {
        self.guarded_insert(data, conflicts).map_err(TableError::from)
    }
}

// ============================================================================
// SECTION: SQL Compilation
// ============================================================================

/// Inserts a row body, dropping any caller-supplied `id`.
fn insert_row(
    connection: &Connection,
    table_name: &str,
    data: &Value,
) -> Result<String, SqliteStoreError> {
    let Value::Object(map) = data else {
        return Err(SqliteStoreError::Invalid("table rows must be json objects".to_string()));
    };
    let mut map = map.clone();
    map.remove(ROW_ID_PROPERTY);
    let body = serde_json::to_string(&Value::Object(map))
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    enforce_size(body.len())?;
    connection
        .execute(
            "INSERT INTO table_rows (table_name, body) VALUES (?1, ?2)",
            params![table_name, body],
        )
        .map_err(db_error)?;
    Ok(connection.last_insert_rowid().to_string())
}

/// Compiles and runs a query against one logical table.
fn run_query(
    connection: &Connection,
    table_name: &str,
    query: &Query,
) -> Result<Vec<TableRow>, SqliteStoreError> {
    let mut sql = String::from("SELECT id, body FROM table_rows WHERE table_name = ?");
    let mut bindings = vec![SqlValue::Text(table_name.to_string())];
    for (property, expected) in &query.conditions {
        if property == ROW_ID_PROPERTY {
            let Some(row_id) = expected.as_str().and_then(|id| id.parse::<i64>().ok()) else {
                return Ok(Vec::new());
            };
            sql.push_str(" AND id = ?");
            bindings.push(SqlValue::Integer(row_id));
            continue;
        }
        match expected {
            Value::Null => {
                sql.push_str(" AND json_type(body, ?) = 'null'");
                bindings.push(SqlValue::Text(json_path(property)));
            }
            Value::Bool(flag) => {
                sql.push_str(" AND json_type(body, ?) = ?");
                bindings.push(SqlValue::Text(json_path(property)));
                bindings.push(SqlValue::Text(flag.to_string()));
            }
            Value::Array(_) | Value::Object(_) => {
                sql.push_str(" AND json_extract(body, ?) = json(?)");
                bindings.push(SqlValue::Text(json_path(property)));
                bindings.push(SqlValue::Text(expected.to_string()));
            }
            scalar => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                bindings.push(SqlValue::Text(json_path(property)));
                bindings.push(scalar_binding(scalar));
            }
        }
    }
    match &query.sort {
        Some(sort) => {
            let direction = match sort.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            if sort.property == ROW_ID_PROPERTY {
                sql.push_str(&format!(" ORDER BY id {direction}"));
            } else {
                sql.push_str(&format!(" ORDER BY json_extract(body, ?) {direction}, id ASC"));
                bindings.push(SqlValue::Text(json_path(&sort.property)));
            }
        }
        None => sql.push_str(" ORDER BY id ASC"),
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    bindings.push(SqlValue::Integer(query.limit.map(to_sql_count).transpose()?.unwrap_or(-1)));
    bindings.push(SqlValue::Integer(to_sql_count(query.offset.unwrap_or(0))?));

    let mut statement = connection.prepare(&sql).map_err(db_error)?;
    let fetched = statement
        .query_map(params_from_iter(bindings), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    fetched
        .into_iter()
        .map(|(row_id, body)| decode_row(row_id, &body).map(|row| query.project(row)))
        .collect()
}

/// Decodes a stored body into a row carrying its id.
fn decode_row(row_id: i64, body: &str) -> Result<TableRow, SqliteStoreError> {
    enforce_size(body.len())?;
    let data: Value = serde_json::from_str(body)
        .map_err(|err| SqliteStoreError::Corrupt(format!("row {row_id}: {err}")))?;
    Ok(TableRow::new(row_id.to_string(), data))
}

/// Builds a `json_extract` path for a top-level property.
fn json_path(property: &str) -> String {
    format!("$.\"{}\"", property.replace('"', "\\\""))
}

/// Binds a scalar JSON value the way `json_extract` returns it.
fn scalar_binding(value: &Value) -> SqlValue {
    match value {
        Value::Number(number) => number.as_i64().map_or_else(
            || number.as_f64().map_or(SqlValue::Null, SqlValue::Real),
            SqlValue::Integer,
        ),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => SqlValue::Null,
    }
}
