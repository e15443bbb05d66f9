// crates/metastore-core/src/core/identifiers.rs
// ============================================================================
// Module: Metastore Identifiers
// Description: Canonical opaque identifiers for schemas, records, and resources.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout the metastore. String
//! identifiers are opaque and serialize as plain strings. Resource versions are
//! numeric so that "newest version" ordering is well defined in every store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Schema identifier (for example `dataset`, `distribution`, `catalog`).
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    /// Creates a new schema identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SchemaId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SchemaId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Record identifier, unique within one schema.
///
/// # Invariants
/// - Opaque UTF-8 string; immutable once assigned to a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new record identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random record identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Monotonic revision number of a stored record.
///
/// # Invariants
/// - Starts at 1 for the first revision and increases by one per write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    /// First revision of every record.
    pub const FIRST: Self = Self(1);

    /// Creates a revision identifier from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw revision value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the revision that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Resource version, monotonic per identifier and perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(u64);

impl ResourceVersion {
    /// Creates a resource version from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ResourceVersion {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<u64>().map(Self)
    }
}

/// Representation variant of a resource.
///
/// # Invariants
/// - `source` always maps to [`Perspective::Source`]; any other label is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Perspective {
    /// Original upload of the resource.
    #[default]
    Source,
    /// Named derived representation (for example `local_file`).
    Derived(String),
}

impl Perspective {
    /// Wire label of the source perspective.
    pub const SOURCE_LABEL: &'static str = "source";

    /// Builds a perspective from its wire label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label == Self::SOURCE_LABEL {
            Self::Source
        } else {
            Self::Derived(label.to_string())
        }
    }

    /// Returns the wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Source => Self::SOURCE_LABEL,
            Self::Derived(label) => label,
        }
    }

    /// Returns true for the source perspective.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self, Self::Source)
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Perspective {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<&str> for Perspective {
    fn from(value: &str) -> Self {
        Self::from_label(value)
    }
}

impl From<Perspective> for String {
    fn from(value: Perspective) -> Self {
        match value {
            Perspective::Source => Perspective::SOURCE_LABEL.to_string(),
            Perspective::Derived(label) => label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Perspective;
    use super::ResourceVersion;

    #[test]
    fn perspective_labels_round_trip_through_serde() {
        let source: Perspective = serde_json::from_str("\"source\"").unwrap_or_default();
        assert!(source.is_source());
        let derived: Perspective =
            serde_json::from_str("\"local_file\"").unwrap_or(Perspective::Source);
        assert_eq!(derived.as_str(), "local_file");
        assert_eq!(serde_json::to_string(&derived).ok().as_deref(), Some("\"local_file\""));
    }

    #[test]
    fn resource_version_parses_trimmed_digits() {
        assert_eq!("  7 ".parse::<ResourceVersion>().ok(), Some(ResourceVersion::new(7)));
        assert!("seven".parse::<ResourceVersion>().is_err());
    }
}
