// crates/metastore-core/src/runtime/schemas.rs
// ============================================================================
// Module: Metastore Schema Retrievers
// Description: In-memory and directory-backed schema sources.
// Purpose: Provide schema-by-id lookup for validation and schema listing.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! [`InMemorySchemaRetriever`] serves schemas registered in code (tests and
//! embedding). [`DirectorySchemaRetriever`] serves `<dir>/<schema_id>.json`
//! files with bounded reads and rejects ids that could escape the directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use crate::core::SchemaId;
use crate::interfaces::SchemaError;
use crate::interfaces::SchemaRetriever;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum schema file size in bytes.
pub const DEFAULT_MAX_SCHEMA_BYTES: u64 = 1024 * 1024;
/// File extension of schema files.
const SCHEMA_EXTENSION: &str = "json";

// ============================================================================
// SECTION: In-Memory Retriever
// ============================================================================

/// Schema retriever over an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaRetriever {
    /// Schemas keyed by id.
    schemas: BTreeMap<SchemaId, Value>,
}

impl InMemorySchemaRetriever {
    /// Creates an empty retriever.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a schema.
    #[must_use]
    pub fn with_schema(mut self, schema_id: impl Into<SchemaId>, schema: Value) -> Self {
        self.schemas.insert(schema_id.into(), schema);
        self
    }
}

impl SchemaRetriever for InMemorySchemaRetriever {
    fn all_ids(&self) -> Result<Vec<SchemaId>, SchemaError> {
        Ok(self.schemas.keys().cloned().collect())
    }

    fn retrieve(&self, schema_id: &SchemaId) -> Result<Value, SchemaError> {
        self.schemas
            .get(schema_id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(schema_id.to_string()))
    }
}

// ============================================================================
// SECTION: Directory Retriever
// ============================================================================

/// Schema retriever reading `<root>/<schema_id>.json`.
///
/// # Invariants
/// - Only plain file names are resolved; ids with separators or dot prefixes
///   are rejected.
#[derive(Debug, Clone)]
pub struct DirectorySchemaRetriever {
    /// Schema directory.
    root: PathBuf,
    /// Maximum schema file size in bytes.
    max_schema_bytes: u64,
}

impl DirectorySchemaRetriever {
    /// Creates a retriever with the default size limit.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_limit(root, DEFAULT_MAX_SCHEMA_BYTES)
    }

    /// Creates a retriever with an explicit size limit.
    #[must_use]
    pub fn with_limit(root: impl Into<PathBuf>, max_schema_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_schema_bytes,
        }
    }

    /// Returns the schema directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the file path of a schema id.
    fn schema_path(&self, schema_id: &SchemaId) -> Result<PathBuf, SchemaError> {
        let id = schema_id.as_str();
        if id.is_empty()
            || id.starts_with('.')
            || id.contains(['/', '\\', '\0'])
        {
            return Err(SchemaError::Invalid(format!("invalid schema id: {id}")));
        }
        Ok(self.root.join(format!("{id}.{SCHEMA_EXTENSION}")))
    }
}

impl SchemaRetriever for DirectorySchemaRetriever {
    fn all_ids(&self) -> Result<Vec<SchemaId>, SchemaError> {
        let entries = fs::read_dir(&self.root).map_err(|err| SchemaError::Io(err.to_string()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| SchemaError::Io(err.to_string()))?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(SCHEMA_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                && !stem.starts_with('.')
            {
                ids.push(SchemaId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn retrieve(&self, schema_id: &SchemaId) -> Result<Value, SchemaError> {
        let path = self.schema_path(schema_id)?;
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SchemaError::NotFound(schema_id.to_string()));
            }
            Err(err) => return Err(SchemaError::Io(err.to_string())),
        };
        let mut bytes = Vec::new();
        file.take(self.max_schema_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| SchemaError::Io(err.to_string()))?;
        if bytes.len() as u64 > self.max_schema_bytes {
            return Err(SchemaError::Invalid(format!(
                "schema {schema_id} exceeds size limit of {} bytes",
                self.max_schema_bytes
            )));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| SchemaError::Invalid(format!("schema {schema_id}: {err}")))
    }
}
