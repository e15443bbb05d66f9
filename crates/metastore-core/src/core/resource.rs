// crates/metastore-core/src/core/resource.rs
// ============================================================================
// Module: Metastore Resources
// Description: File-backed resource registrations tracked by the resource mapper.
// Purpose: Define the resource row shape shared by mappers, stores, and cleanup.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Resource`] describes one registered file for an identifier, at one
//! version, under one perspective. Rows are never updated in place: a new
//! version or perspective is a new row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Perspective;
use crate::core::identifiers::ResourceVersion;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Property projection requested by every resource lookup.
pub const RESOURCE_PROJECTION: [&str; 6] =
    ["identifier", "version", "perspective", "filePath", "mimeType", "id"];

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Registered file-backed resource.
///
/// # Invariants
/// - `(identifier, perspective, version)` identifies at most one active row.
/// - `file_path` is unique among active rows.
/// - `id` is assigned by storage and absent on rows not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Stable identifier shared across versions and perspectives.
    pub identifier: String,
    /// Version, monotonic per identifier and perspective.
    pub version: ResourceVersion,
    /// Representation variant.
    #[serde(default)]
    pub perspective: Perspective,
    /// Location of the backing file.
    pub file_path: String,
    /// Media type of the backing file.
    pub mime_type: String,
    /// Storage-assigned row identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Resource {
    /// Creates an unstored source-perspective resource.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        version: ResourceVersion,
        file_path: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            perspective: Perspective::Source,
            file_path: file_path.into(),
            mime_type: mime_type.into(),
            id: None,
        }
    }

    /// Returns a copy of this resource under another perspective.
    #[must_use]
    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspective = perspective;
        self
    }

    /// Returns a copy of this resource with the storage row id set.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns true when both rows address the same identifier, perspective, and version.
    #[must_use]
    pub fn same_triple(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.perspective == other.perspective
            && self.version == other.version
    }
}
