// crates/metastore-core/src/runtime/resource_mapper.rs
// ============================================================================
// Module: Metastore Resource Mapper
// Description: Registration and lookup of file-backed resources.
// Purpose: Track resources across perspectives and versions with uniqueness guarantees.
// Dependencies: crate::core, crate::interfaces, serde_json, tracing
// ============================================================================

//! ## Overview
//! The resource mapper stores one row per `(identifier, perspective, version)`
//! in a [`KeyedTable`]. Every registration path goes through
//! [`KeyedTable::insert_unless_exists`] with conflict queries on the triple and
//! on the file path, so duplicates are rejected before any row is written.
//!
//! Lookups select the newest version by descending sort, or an exact version
//! by equality, always with `limit 1` and the minimal resource projection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::core::Perspective;
use crate::core::RESOURCE_PROJECTION;
use crate::core::Resource;
use crate::core::ResourceVersion;
use crate::interfaces::InsertOutcome;
use crate::interfaces::KeyedTable;
use crate::interfaces::Query;
use crate::interfaces::ResourceListener;
use crate::interfaces::SortOrder;
use crate::interfaces::TableRow;
use crate::runtime::errors::MetastoreError;

// ============================================================================
// SECTION: Path Status
// ============================================================================

/// Registration status of a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStatus {
    /// No active row uses the path.
    Available,
    /// Active rows already use the path.
    Registered(Vec<Resource>),
}

impl PathStatus {
    /// Returns true when the path is free.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

// ============================================================================
// SECTION: Resource Mapper
// ============================================================================

/// Conflict query slots passed to guarded inserts.
#[derive(Debug, Clone, Copy)]
enum ConflictSlot {
    /// Same identifier, perspective, and version.
    Triple,
    /// Same file path.
    FilePath,
}

/// Tracks resource registrations in a keyed table.
///
/// # Invariants
/// - No two rows share a file path.
/// - No two rows share an `(identifier, perspective, version)` triple.
/// - Non-source perspectives and later versions are only registered on top of
///   an existing source row.
pub struct ResourceMapper {
    /// Backing table.
    table: Arc<dyn KeyedTable>,
    /// Listeners notified in registration order.
    listeners: Vec<Arc<dyn ResourceListener>>,
}

impl ResourceMapper {
    /// Creates a mapper over a keyed table.
    #[must_use]
    pub fn new(table: Arc<dyn KeyedTable>) -> Self {
        Self {
            table,
            listeners: Vec::new(),
        }
    }

    /// Appends a listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ResourceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Registers a brand-new resource.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::AlreadyRegistered`] when the file path or the
    /// triple is already in use.
    pub fn register(&self, resource: &Resource) -> Result<Resource, MetastoreError> {
        self.insert(resource, &[ConflictSlot::FilePath, ConflictSlot::Triple])
    }

    /// Registers a derived perspective of an existing source version.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::NotFound`] when no source row exists for the
    /// identifier and version, and [`MetastoreError::AlreadyRegistered`] when
    /// the triple or file path is taken.
    pub fn register_new_perspective(
        &self,
        resource: &Resource,
    ) -> Result<Resource, MetastoreError> {
        let source = self.get(&resource.identifier, &Perspective::Source, Some(resource.version))?;
        if source.is_none() {
            return Err(MetastoreError::NotFound(format!(
                "A resource with identifier {} was not found.",
                resource.identifier
            )));
        }
        self.insert(resource, &[ConflictSlot::Triple, ConflictSlot::FilePath])
    }

    /// Registers a new source version of an existing resource.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::Validation`] for non-source perspectives,
    /// [`MetastoreError::NotFound`] when no source row exists for the
    /// identifier, and [`MetastoreError::AlreadyRegistered`] when the version
    /// or file path is taken.
    pub fn register_new_version(&self, resource: &Resource) -> Result<Resource, MetastoreError> {
        if !resource.perspective.is_source() {
            return Err(MetastoreError::Validation(
                "Only versions of source resources are allowed.".to_string(),
            ));
        }
        if self.get(&resource.identifier, &Perspective::Source, None)?.is_none() {
            return Err(MetastoreError::NotFound(format!(
                "A resource with identifier {} was not found.",
                resource.identifier
            )));
        }
        self.insert(resource, &[ConflictSlot::Triple, ConflictSlot::FilePath])
    }

    /// Returns one resource: the newest version when `version` is `None`,
    /// otherwise the exact version.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when the table read fails or a row is malformed.
    pub fn get(
        &self,
        identifier: &str,
        perspective: &Perspective,
        version: Option<ResourceVersion>,
    ) -> Result<Option<Resource>, MetastoreError> {
        let query = match version {
            None => common_query(identifier, perspective).sort_by("version", SortOrder::Descending),
            Some(version) => triple_query(identifier, perspective, version),
        };
        self.table.query(&query)?.into_iter().next().map(row_to_resource).transpose()
    }

    /// Removes the row matching the resource's triple.
    ///
    /// Source-perspective removals notify listeners first; a listener error
    /// aborts the removal. Returns false when no such row exists.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError::Listener`] when a listener vetoes the removal.
    pub fn remove(&self, resource: &Resource) -> Result<bool, MetastoreError> {
        let stored = self.get(&resource.identifier, &resource.perspective, Some(resource.version))?;
        let Some(stored) = stored else {
            debug!(identifier = %resource.identifier, "resource removal skipped: not registered");
            return Ok(false);
        };
        if stored.perspective.is_source() {
            for listener in &self.listeners {
                listener.on_pre_remove_source(&stored)?;
            }
        }
        let Some(row_id) = stored.id.as_deref() else {
            return Err(MetastoreError::Unexpected(
                "resource row returned without an id".to_string(),
            ));
        };
        let removed = self.table.remove(row_id)?;
        info!(
            identifier = %stored.identifier,
            perspective = %stored.perspective,
            version = %stored.version,
            "resource removed"
        );
        Ok(removed)
    }

    /// Reports whether any active row uses `file_path`.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when the table read fails.
    pub fn file_path_exists(&self, file_path: &str) -> Result<PathStatus, MetastoreError> {
        let rows = self.table.query(&file_path_query(file_path))?;
        if rows.is_empty() {
            return Ok(PathStatus::Available);
        }
        let resources = rows.into_iter().map(row_to_resource).collect::<Result<Vec<_>, _>>()?;
        Ok(PathStatus::Registered(resources))
    }

    /// Stores a row guarded by the given conflict queries and notifies listeners.
    fn insert(
        &self,
        resource: &Resource,
        slots: &[ConflictSlot],
    ) -> Result<Resource, MetastoreError> {
        let conflicts: Vec<Query> = slots
            .iter()
            .map(|slot| match slot {
                ConflictSlot::Triple => {
                    triple_query(&resource.identifier, &resource.perspective, resource.version)
                }
                ConflictSlot::FilePath => file_path_query(&resource.file_path),
            })
            .collect();
        let mut row = resource.clone();
        row.id = None;
        let data = serde_json::to_value(&row)
            .map_err(|err| MetastoreError::Unexpected(err.to_string()))?;
        match self.table.insert_unless_exists(&data, &conflicts)? {
            InsertOutcome::Inserted(id) => {
                let stored = row.with_id(id);
                debug!(
                    identifier = %stored.identifier,
                    perspective = %stored.perspective,
                    version = %stored.version,
                    "resource registered"
                );
                for listener in &self.listeners {
                    listener.on_registration(&stored)?;
                }
                Ok(stored)
            }
            InsertOutcome::Conflict {
                query_index,
                rows,
            } => Err(conflict_error(resource, slots.get(query_index).copied(), &rows)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Query on identifier and perspective with the resource projection and `limit 1`.
fn common_query(identifier: &str, perspective: &Perspective) -> Query {
    Query::new()
        .select(&RESOURCE_PROJECTION)
        .condition("identifier", identifier)
        .condition("perspective", perspective.as_str())
        .limit(1)
}

/// Query on the full `(identifier, perspective, version)` triple.
fn triple_query(identifier: &str, perspective: &Perspective, version: ResourceVersion) -> Query {
    common_query(identifier, perspective).condition("version", version.get())
}

/// Query on file path equality.
fn file_path_query(file_path: &str) -> Query {
    Query::new().select(&RESOURCE_PROJECTION).condition("filePath", file_path).limit(1)
}

/// Converts a table row into a resource.
fn row_to_resource(row: TableRow) -> Result<Resource, MetastoreError> {
    let row_id = row.id;
    serde_json::from_value::<Resource>(row.data).map_err(|err| {
        MetastoreError::Unexpected(format!("malformed resource row {row_id}: {err}"))
    })
}

/// Builds the conflict error for a rejected registration.
fn conflict_error(
    resource: &Resource,
    slot: Option<ConflictSlot>,
    rows: &[TableRow],
) -> MetastoreError {
    let message = match slot {
        Some(ConflictSlot::Triple) if resource.perspective.is_source() => format!(
            "A resource with identifier {} and version {} already exists.",
            resource.identifier, resource.version
        ),
        Some(ConflictSlot::Triple) => format!(
            "A resource with identifier {} and perspective {} already exists.",
            resource.identifier, resource.perspective
        ),
        Some(ConflictSlot::FilePath) | None => {
            let existing: Vec<Value> = rows.iter().map(|row| row.data.clone()).collect();
            Value::Array(existing).to_string()
        }
    };
    MetastoreError::AlreadyRegistered(message)
}
