// crates/metastore-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Metastore Store
// Description: Durable revisioned record storage backed by SQLite WAL.
// Purpose: Persist record revisions and published pointers per schema.
// Dependencies: metastore-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module owns the shared `SQLite` connection and implements
//! [`MetastoreStorage`] and [`StorageFactory`] on top of it. Every write
//! appends a row to `record_revisions`; the `records` table holds the latest
//! and published revision numbers per `(schema_id, identifier)`. Bodies are
//! hashed on write and verified on read, so a tampered row fails closed.
//! Security posture: database contents are untrusted.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use metastore_core::MetastoreStorage;
use metastore_core::RecordId;
use metastore_core::RevisionId;
use metastore_core::SchemaId;
use metastore_core::StorageFactory;
use metastore_core::StoreError;
use metastore_core::StoreReceipt;
use metastore_core::TableError;
use metastore_core::hashing::DEFAULT_HASH_ALGORITHM;
use metastore_core::hashing::HashAlgorithm;
use metastore_core::hashing::hash_bytes;
use metastore_core::runtime::prepare_record_body;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::table::SqliteKeyedTable;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized record or row size accepted by the store.
pub const MAX_RECORD_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` metastore store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config with default pragmas for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Record does not exist.
    #[error("{0}")]
    Missing(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Missing(message) => Self::MissingObject(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "record body exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<SqliteStoreError> for TableError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "row exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            other => Self::Store(other.to_string()),
        }
    }
}

/// Maps a `rusqlite` error into a store error.
pub(crate) fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// Shared `SQLite` database holding keyed tables and record revisions.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        debug!(path = %config.path.display(), "sqlite store opened");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns a keyed table view named `table_name`.
    #[must_use]
    pub fn keyed_table(&self, table_name: &str) -> SqliteKeyedTable {
        SqliteKeyedTable::new(self.clone(), table_name)
    }

    /// Returns a storage factory over this database.
    #[must_use]
    pub fn storage_factory(&self) -> SqliteStorageFactory {
        SqliteStorageFactory {
            store: self.clone(),
        }
    }

    /// Returns record storage for one schema.
    #[must_use]
    pub fn metastore_storage(&self, schema_id: &SchemaId) -> SqliteMetastoreStorage {
        SqliteMetastoreStorage {
            store: self.clone(),
            schema_id: schema_id.clone(),
        }
    }

    /// Locks the shared connection.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

// ============================================================================//
// SECTION: Storage Factory
// ============================================================================//

/// Factory handing out per-schema `SQLite` record storage.
#[derive(Clone)]
pub struct SqliteStorageFactory {
    /// Backing database.
    store: SqliteStore,
}

impl StorageFactory for SqliteStorageFactory {
    fn storage(&self, schema_id: &SchemaId) -> Result<Arc<dyn MetastoreStorage>, StoreError> {
        let storage: Arc<dyn MetastoreStorage> = Arc::new(self.store.metastore_storage(schema_id));
        Ok(storage)
    }
}

// ============================================================================//
// SECTION: Record Storage
// ============================================================================//

/// Append-only record storage for one schema.
///
/// # Invariants
/// - Revisions are numbered from 1 and never rewritten.
/// - `published_revision`, when set, names an existing revision.
#[derive(Clone)]
pub struct SqliteMetastoreStorage {
    /// Backing database.
    store: SqliteStore,
    /// Schema whose records this storage holds.
    schema_id: SchemaId,
}

/// Which revision pointer a read follows.
#[derive(Debug, Clone, Copy)]
enum RevisionPointer {
    /// The newest stored revision.
    Latest,
    /// The published revision.
    Published,
}

impl RevisionPointer {
    /// Returns the `records` column holding the pointer.
    const fn column(self) -> &'static str {
        match self {
            Self::Latest => "latest_revision",
            Self::Published => "published_revision",
        }
    }
}

impl SqliteMetastoreStorage {
    /// Returns the schema id this storage serves.
    #[must_use]
    pub const fn schema_id(&self) -> &SchemaId {
        &self.schema_id
    }

    /// Returns the number of revisions stored for a record.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn revision_count(&self, identifier: &RecordId) -> Result<u64, SqliteStoreError> {
        let guard = self.store.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM record_revisions WHERE schema_id = ?1 AND identifier = ?2",
                params![self.schema_id.as_str(), identifier.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        drop(guard);
        u64::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative revision count".to_string()))
    }

    /// Reads the body behind a revision pointer.
    fn read_body(
        &self,
        identifier: &RecordId,
        pointer: RevisionPointer,
    ) -> Result<String, SqliteStoreError> {
        let sql = format!(
            "SELECT v.body, v.body_hash, v.hash_algorithm FROM records r JOIN record_revisions v \
             ON v.schema_id = r.schema_id AND v.identifier = r.identifier AND v.revision = r.{} \
             WHERE r.schema_id = ?1 AND r.identifier = ?2",
            pointer.column()
        );
        let guard = self.store.lock()?;
        let row = guard
            .query_row(&sql, params![self.schema_id.as_str(), identifier.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .optional()
            .map_err(db_error)?;
        drop(guard);
        let Some((body, hash, algorithm)) = row else {
            return Err(missing(identifier));
        };
        verify_body(identifier, &body, &hash, &algorithm)?;
        Ok(body)
    }

    /// Reads published bodies in identifier order.
    fn read_published(
        &self,
        start: usize,
        length: Option<usize>,
    ) -> Result<Vec<String>, SqliteStoreError> {
        let offset = to_sql_count(start)?;
        let limit = length.map(to_sql_count).transpose()?.unwrap_or(-1);
        let guard = self.store.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT r.identifier, v.body, v.body_hash, v.hash_algorithm FROM records r JOIN \
                 record_revisions v ON v.schema_id = r.schema_id AND v.identifier = r.identifier \
                 AND v.revision = r.published_revision WHERE r.schema_id = ?1 ORDER BY \
                 r.identifier LIMIT ?2 OFFSET ?3",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![self.schema_id.as_str(), limit, offset], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        drop(statement);
        drop(guard);
        rows.into_iter()
            .map(|(identifier, body, hash, algorithm)| {
                verify_body(&RecordId::new(identifier), &body, &hash, &algorithm)?;
                Ok(body)
            })
            .collect()
    }

    /// Appends a revision.
    fn store_body(
        &self,
        body: &serde_json::Value,
        identifier: Option<&RecordId>,
    ) -> Result<StoreReceipt, SqliteStoreError> {
        let (identifier, serialized) = prepare_record_body(body, identifier)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        enforce_size(serialized.len())?;
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, serialized.as_bytes());
        let saved_at = unix_millis();
        let mut guard = self.store.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let latest: Option<i64> = tx
            .query_row(
                "SELECT latest_revision FROM records WHERE schema_id = ?1 AND identifier = ?2",
                params![self.schema_id.as_str(), identifier.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        let next_revision = match latest {
            None => 1,
            Some(value) if value < 1 => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "invalid latest_revision for record {identifier}"
                )));
            }
            Some(value) => value.checked_add(1).ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("revision overflow for record {identifier}"))
            })?,
        };
        tx.execute(
            "INSERT INTO records (schema_id, identifier, latest_revision, published_revision) \
             VALUES (?1, ?2, ?3, NULL) ON CONFLICT(schema_id, identifier) DO UPDATE SET \
             latest_revision = excluded.latest_revision",
            params![self.schema_id.as_str(), identifier.as_str(), next_revision],
        )
        .map_err(db_error)?;
        tx.execute(
            "INSERT INTO record_revisions (schema_id, identifier, revision, body, body_hash, \
             hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.schema_id.as_str(),
                identifier.as_str(),
                next_revision,
                serialized,
                digest.value,
                hash_algorithm_label(digest.algorithm),
                saved_at
            ],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        let revision = u64::try_from(next_revision)
            .map_err(|_| SqliteStoreError::Corrupt("negative revision".to_string()))?;
        debug!(
            schema = %self.schema_id,
            identifier = %identifier,
            revision,
            "record revision stored"
        );
        Ok(StoreReceipt {
            identifier,
            revision: RevisionId::new(revision),
            created: latest.is_none(),
        })
    }

    /// Moves the published pointer to the latest revision.
    fn publish_latest(&self, identifier: &RecordId) -> Result<bool, SqliteStoreError> {
        let mut guard = self.store.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let pointers: Option<(i64, Option<i64>)> = tx
            .query_row(
                "SELECT latest_revision, published_revision FROM records WHERE schema_id = ?1 AND \
                 identifier = ?2",
                params![self.schema_id.as_str(), identifier.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_error)?;
        let Some((latest, published)) = pointers else {
            return Err(missing(identifier));
        };
        if published == Some(latest) {
            return Ok(false);
        }
        tx.execute(
            "UPDATE records SET published_revision = ?3 WHERE schema_id = ?1 AND identifier = ?2",
            params![self.schema_id.as_str(), identifier.as_str(), latest],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(true)
    }

    /// Deletes a record with its full history.
    fn remove_record(&self, identifier: &RecordId) -> Result<bool, SqliteStoreError> {
        let mut guard = self.store.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute(
            "DELETE FROM record_revisions WHERE schema_id = ?1 AND identifier = ?2",
            params![self.schema_id.as_str(), identifier.as_str()],
        )
        .map_err(db_error)?;
        let removed = tx
            .execute(
                "DELETE FROM records WHERE schema_id = ?1 AND identifier = ?2",
                params![self.schema_id.as_str(), identifier.as_str()],
            )
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(removed > 0)
    }

    /// Reports whether any revision exists for the record.
    fn record_exists(&self, identifier: &RecordId) -> Result<bool, SqliteStoreError> {
        let guard = self.store.lock()?;
        let found: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM records WHERE schema_id = ?1 AND identifier = ?2",
                params![self.schema_id.as_str(), identifier.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        Ok(found.is_some())
    }
}

impl MetastoreStorage for SqliteMetastoreStorage {
    fn retrieve(&self, identifier: &RecordId) -> Result<String, StoreError> {
        self.read_body(identifier, RevisionPointer::Latest).map_err(StoreError::from)
    }

    fn retrieve_published(&self, identifier: &RecordId) -> Result<String, StoreError> {
        self.read_body(identifier, RevisionPointer::Published).map_err(StoreError::from)
    }

    fn retrieve_all(&self) -> Result<Vec<String>, StoreError> {
        self.read_published(0, None).map_err(StoreError::from)
    }

    fn retrieve_range(&self, start: usize, length: usize) -> Result<Vec<String>, StoreError> {
        self.read_published(start, Some(length)).map_err(StoreError::from)
    }

    fn store(
        &self,
        body: &serde_json::Value,
        identifier: Option<&RecordId>,
    ) -> Result<StoreReceipt, StoreError> {
        self.store_body(body, identifier).map_err(StoreError::from)
    }

    fn publish(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        self.publish_latest(identifier).map_err(StoreError::from)
    }

    fn remove(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        self.remove_record(identifier).map_err(StoreError::from)
    }

    fn exists(&self, identifier: &RecordId) -> Result<bool, StoreError> {
        self.record_exists(identifier).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Builds the missing-record error.
fn missing(identifier: &RecordId) -> SqliteStoreError {
    SqliteStoreError::Missing(format!("No data with the identifier {identifier} was found."))
}

/// Rejects payloads above [`MAX_RECORD_BYTES`].
pub(crate) const fn enforce_size(actual_bytes: usize) -> Result<(), SqliteStoreError> {
    if actual_bytes > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

/// Converts a count into an `SQLite` integer.
pub(crate) fn to_sql_count(value: usize) -> Result<i64, SqliteStoreError> {
    i64::try_from(value).map_err(|_| SqliteStoreError::Invalid("count exceeds i64".to_string()))
}

/// Verifies a stored body against its recorded hash.
fn verify_body(
    identifier: &RecordId,
    body: &str,
    hash: &str,
    algorithm: &str,
) -> Result<(), SqliteStoreError> {
    enforce_size(body.len())?;
    let algorithm = parse_hash_algorithm(algorithm)?;
    if hash_bytes(algorithm, body.as_bytes()).value != hash {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for record {identifier}")));
    }
    Ok(())
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    schema_id TEXT NOT NULL,
                    identifier TEXT NOT NULL,
                    latest_revision INTEGER NOT NULL,
                    published_revision INTEGER,
                    PRIMARY KEY (schema_id, identifier)
                );
                CREATE TABLE IF NOT EXISTS record_revisions (
                    schema_id TEXT NOT NULL,
                    identifier TEXT NOT NULL,
                    revision INTEGER NOT NULL,
                    body TEXT NOT NULL,
                    body_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL,
                    PRIMARY KEY (schema_id, identifier, revision),
                    FOREIGN KEY (schema_id, identifier)
                        REFERENCES records(schema_id, identifier) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS table_rows (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    table_name TEXT NOT NULL,
                    body TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_table_rows_table_name
                    ON table_rows (table_name);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Returns the canonical hash algorithm label.
const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}
