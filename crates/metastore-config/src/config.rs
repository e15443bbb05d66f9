// crates/metastore-config/src/config.rs
// ============================================================================
// Module: Metastore Configuration
// Description: Configuration loading and validation for the metastore.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: metastore-core, metastore-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid in-memory setup.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use metastore_core::SchemaId;
use metastore_core::runtime::DEFAULT_CATALOG_SCHEMA;
use metastore_core::runtime::DEFAULT_DATASET_SCHEMA;
use metastore_core::runtime::DEFAULT_DISTRIBUTION_SCHEMA;
use metastore_core::runtime::schemas::DEFAULT_MAX_SCHEMA_BYTES;
use metastore_store_sqlite::SqliteStoreConfig;
use metastore_store_sqlite::SqliteStoreMode;
use metastore_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "metastore.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "METASTORE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default keyed-table name for resource rows.
const DEFAULT_RESOURCE_TABLE: &str = "resource_mapper";
/// Default schema directory.
const DEFAULT_SCHEMA_DIRECTORY: &str = "schemas";
/// Maximum allowed schema size in bytes.
pub(crate) const MAX_SCHEMA_MAX_BYTES: u64 = 10 * 1024 * 1024;
/// Maximum length of a configured schema id or table name.
pub(crate) const MAX_NAME_LENGTH: usize = 128;
/// Maximum length of a log filter directive.
pub(crate) const MAX_LOG_DIRECTIVE_LENGTH: usize = 1024;
/// Default log filter directive.
const DEFAULT_LOG_LEVEL: &str = "info";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Metastore configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetastoreConfig {
    /// Record and resource store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Schema source configuration.
    #[serde(default)]
    pub schemas: SchemasConfig,
    /// Catalog assembly configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl MetastoreConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// the explicit path, then `METASTORE_CONFIG`, then `metastore.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        config.source_path = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.schemas.validate()?;
        self.catalog.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store (contents are lost on exit).
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Record and resource store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Keyed-table name holding resource rows.
    #[serde(default = "default_resource_table")]
    pub resource_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            resource_table: default_resource_table(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config for the sqlite backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("store.resource_table", &self.resource_table)?;
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Schema source configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemasConfig {
    /// Directory holding `<schema_id>.json` files.
    #[serde(default = "default_schema_directory")]
    pub directory: PathBuf,
    /// Maximum schema file size in bytes.
    #[serde(default = "default_max_schema_bytes")]
    pub max_schema_bytes: u64,
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            directory: default_schema_directory(),
            max_schema_bytes: default_max_schema_bytes(),
        }
    }
}

impl SchemasConfig {
    /// Validates schema source configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("schemas.directory", &self.directory.to_string_lossy())?;
        if self.max_schema_bytes == 0 || self.max_schema_bytes > MAX_SCHEMA_MAX_BYTES {
            return Err(ConfigError::Invalid(format!(
                "schemas.max_schema_bytes must be between 1 and {MAX_SCHEMA_MAX_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Catalog assembly configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Schema id of the catalog template.
    #[serde(default = "default_catalog_schema")]
    pub catalog_schema: String,
    /// Schema id of dataset records.
    #[serde(default = "default_dataset_schema")]
    pub dataset_schema: String,
    /// Schema id of distribution records.
    #[serde(default = "default_distribution_schema")]
    pub distribution_schema: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_schema: default_catalog_schema(),
            dataset_schema: default_dataset_schema(),
            distribution_schema: default_distribution_schema(),
        }
    }
}

impl CatalogConfig {
    /// Returns the catalog schema id.
    #[must_use]
    pub fn catalog_schema_id(&self) -> SchemaId {
        SchemaId::new(self.catalog_schema.clone())
    }

    /// Returns the dataset schema id.
    #[must_use]
    pub fn dataset_schema_id(&self) -> SchemaId {
        SchemaId::new(self.dataset_schema.clone())
    }

    /// Returns the distribution schema id.
    #[must_use]
    pub fn distribution_schema_id(&self) -> SchemaId {
        SchemaId::new(self.distribution_schema.clone())
    }

    /// Validates catalog configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("catalog.catalog_schema", &self.catalog_schema)?;
        validate_name("catalog.dataset_schema", &self.dataset_schema)?;
        validate_name("catalog.distribution_schema", &self.distribution_schema)?;
        if self.catalog_schema == self.dataset_schema {
            return Err(ConfigError::Invalid(
                "catalog.catalog_schema and catalog.dataset_schema must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.level.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        if trimmed.len() > MAX_LOG_DIRECTIVE_LENGTH {
            return Err(ConfigError::Invalid("logging.level exceeds max length".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default resource table name.
fn default_resource_table() -> String {
    DEFAULT_RESOURCE_TABLE.to_string()
}

/// Returns the default schema directory.
fn default_schema_directory() -> PathBuf {
    PathBuf::from(DEFAULT_SCHEMA_DIRECTORY)
}

/// Returns the default schema size limit.
const fn default_max_schema_bytes() -> u64 {
    DEFAULT_MAX_SCHEMA_BYTES
}

/// Returns the default catalog schema id.
fn default_catalog_schema() -> String {
    DEFAULT_CATALOG_SCHEMA.to_string()
}

/// Returns the default dataset schema id.
fn default_dataset_schema() -> String {
    DEFAULT_DATASET_SCHEMA.to_string()
}

/// Returns the default distribution schema id.
fn default_distribution_schema() -> String {
    DEFAULT_DISTRIBUTION_SCHEMA.to_string()
}

/// Returns the default log filter directive.
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a schema id or table name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if value.starts_with('.') || value.contains(['/', '\\', '\0']) {
        return Err(ConfigError::Invalid(format!("{field} contains invalid characters")));
    }
    Ok(())
}
