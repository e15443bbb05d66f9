// crates/metastore-core/src/runtime/cleanup.rs
// ============================================================================
// Module: Metastore Resource Cleanup
// Description: Removal of resource rows orphaned by distribution deletes.
// Purpose: Drop a distribution's resource only when no other distribution uses it.
// Dependencies: crate::core, crate::runtime, serde_json, tracing
// ============================================================================

//! ## Overview
//! Distribution records carry their resource under
//! `data["%Ref:downloadURL"][0].data`. Before a distribution is deleted, the
//! cleanup reads that sidecar, looks the resource up in the mapper, and removes
//! it unless another published distribution shares the same `downloadURL`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::core::Perspective;
use crate::core::RecordId;
use crate::core::ResourceVersion;
use crate::core::SchemaId;
use crate::core::ValidatedDocument;
use crate::runtime::errors::MetastoreError;
use crate::runtime::resource_mapper::ResourceMapper;
use crate::runtime::service::MetastoreSession;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default schema id of distribution records.
pub const DEFAULT_DISTRIBUTION_SCHEMA: &str = "distribution";
/// JSON Pointer to a distribution's download URL.
const DOWNLOAD_URL_POINTER: &str = "/data/downloadURL";
/// JSON Pointer to the resource payload inside a distribution's sidecar.
const RESOURCE_SIDECAR_POINTER: &str = "/data/%Ref:downloadURL/0/data";

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of a cleanup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The resource row was removed.
    Removed,
    /// Another published distribution still uses the resource.
    InUseElsewhere,
    /// The distribution carries no resolvable resource.
    NoResource,
}

impl CleanupOutcome {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::InUseElsewhere => "in_use_elsewhere",
            Self::NoResource => "no_resource",
        }
    }
}

// ============================================================================
// SECTION: Resource Cleanup
// ============================================================================

/// Resource cleanup driven by distribution deletes.
pub struct ResourceCleanup {
    /// Resource mapper owning the rows.
    mapper: Arc<ResourceMapper>,
    /// Schema id of distribution records.
    distribution_schema: SchemaId,
}

impl ResourceCleanup {
    /// Creates a cleanup for the default distribution schema.
    #[must_use]
    pub fn new(mapper: Arc<ResourceMapper>) -> Self {
        Self {
            mapper,
            distribution_schema: SchemaId::new(DEFAULT_DISTRIBUTION_SCHEMA),
        }
    }

    /// Overrides the distribution schema id.
    #[must_use]
    pub fn with_distribution_schema(mut self, schema_id: SchemaId) -> Self {
        self.distribution_schema = schema_id;
        self
    }

    /// Returns the distribution schema id.
    #[must_use]
    pub const fn distribution_schema(&self) -> &SchemaId {
        &self.distribution_schema
    }

    /// Removes the resource behind a distribution unless another published
    /// distribution shares its download URL.
    ///
    /// # Errors
    ///
    /// Returns [`MetastoreError`] when the distribution cannot be read or the
    /// removal fails (including listener vetoes).
    pub fn clean_resource_mapper_table(
        &self,
        session: &mut MetastoreSession<'_>,
        distribution_id: &RecordId,
    ) -> Result<CleanupOutcome, MetastoreError> {
        let distribution = session.get(&self.distribution_schema, distribution_id)?;
        let Some((identifier, perspective, version)) = resource_triple(&distribution) else {
            debug!(distribution = %distribution_id, "distribution has no resource sidecar");
            return Ok(CleanupOutcome::NoResource);
        };
        let Some(resource) = self.mapper.get(&identifier, &perspective, Some(version))? else {
            debug!(
                distribution = %distribution_id,
                resource = %identifier,
                "resource not registered"
            );
            return Ok(CleanupOutcome::NoResource);
        };
        let download_url = distribution.get(DOWNLOAD_URL_POINTER).cloned();
        let in_use_elsewhere = session
            .get_all(&self.distribution_schema)?
            .iter()
            .filter(|other| other.identifier() != Some(distribution_id.as_str()))
            .any(|other| {
                download_url.is_some() && other.get(DOWNLOAD_URL_POINTER) == download_url.as_ref()
            });
        if in_use_elsewhere {
            info!(
                distribution = %distribution_id,
                resource = %resource.identifier,
                "resource kept: in use by another distribution"
            );
            return Ok(CleanupOutcome::InUseElsewhere);
        }
        self.mapper.remove(&resource)?;
        Ok(CleanupOutcome::Removed)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the resource triple from a distribution's sidecar.
fn resource_triple(
    distribution: &ValidatedDocument,
) -> Option<(String, Perspective, ResourceVersion)> {
    let payload = distribution.get(RESOURCE_SIDECAR_POINTER)?;
    let identifier = payload.get("identifier")?.as_str()?.to_string();
    let perspective = payload
        .get("perspective")
        .and_then(Value::as_str)
        .map_or(Perspective::Source, Perspective::from_label);
    let version = match payload.get("version")? {
        Value::Number(number) => ResourceVersion::new(number.as_u64()?),
        Value::String(text) => text.parse().ok()?,
        _ => return None,
    };
    Some((identifier, perspective, version))
}
