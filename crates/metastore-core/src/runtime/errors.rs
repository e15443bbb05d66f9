// crates/metastore-core/src/runtime/errors.rs
// ============================================================================
// Module: Metastore Runtime Errors
// Description: Domain error taxonomy for metastore operations.
// Purpose: Classify failures into conflict, not-found, invalid-input, and unexpected kinds.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! Every runtime operation fails with [`MetastoreError`]. Each variant maps to
//! one [`ErrorKind`], and each kind carries the transport status a boundary
//! layer should report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::DocumentError;
use crate::core::HashError;
use crate::interfaces::ListenerError;
use crate::interfaces::SchemaError;
use crate::interfaces::StoreError;
use crate::interfaces::TableError;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Error taxonomy for metastore failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something is already registered, already exists, or is unchanged.
    Conflict,
    /// A record, resource, or schema is absent.
    NotFound,
    /// Malformed, missing, or schema-violating input.
    InvalidInput,
    /// Any other failure.
    Unexpected,
}

impl ErrorKind {
    /// Returns the transport status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::InvalidInput => 400,
            Self::Unexpected => 500,
        }
    }
}

// ============================================================================
// SECTION: Metastore Error
// ============================================================================

/// Metastore runtime errors.
///
/// # Invariants
/// - Messages never embed full document payloads.
#[derive(Debug, Error)]
pub enum MetastoreError {
    /// Resource identifier, version, perspective, or file path already registered.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),
    /// Record with the supplied identifier already exists.
    #[error("{0}")]
    ExistingObject(String),
    /// Update is equivalent to the stored record.
    #[error("{0}")]
    UnmodifiedObject(String),
    /// Record or published revision does not exist.
    #[error("{0}")]
    MissingObject(String),
    /// Resource or schema does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Embedded identifier differs from the addressed identifier.
    #[error("{0}")]
    CannotChangeUuid(String),
    /// Request body was empty.
    #[error("{0}")]
    MissingPayload(String),
    /// Request body was not valid JSON.
    #[error("{0}")]
    InvalidJson(String),
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),
    /// A listener aborted the operation.
    #[error("{0}")]
    Listener(String),
    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Store(String),
    /// Any other failure.
    #[error("{0}")]
    Unexpected(String),
}

impl MetastoreError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyRegistered(_) | Self::ExistingObject(_) | Self::UnmodifiedObject(_) => {
                ErrorKind::Conflict
            }
            Self::MissingObject(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::CannotChangeUuid(_)
            | Self::MissingPayload(_)
            | Self::InvalidJson(_)
            | Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Listener(_) | Self::Store(_) | Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the transport status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true for variants that carry their own intended status.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        !matches!(self, Self::Listener(_) | Self::Store(_) | Self::Unexpected(_))
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<DocumentError> for MetastoreError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidJson(_) => Self::InvalidJson(err.to_string()),
            DocumentError::SchemaNotFound(_) => Self::NotFound(err.to_string()),
            DocumentError::Validation {
                ..
            }
            | DocumentError::Path(_) => Self::Validation(err.to_string()),
            DocumentError::Schema {
                ..
            } => Self::Unexpected(err.to_string()),
        }
    }
}

impl From<StoreError> for MetastoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingObject(message) => Self::MissingObject(message),
            StoreError::Invalid(message) => Self::Validation(message),
            StoreError::Store(message) => Self::Store(message),
        }
    }
}

impl From<TableError> for MetastoreError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Invalid(message) => Self::Validation(message),
            TableError::Store(message) => Self::Store(message),
        }
    }
}

impl From<SchemaError> for MetastoreError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::NotFound(id) => Self::NotFound(format!("schema {id}")),
            SchemaError::Invalid(message) | SchemaError::Io(message) => Self::Unexpected(message),
        }
    }
}

impl From<ListenerError> for MetastoreError {
    fn from(err: ListenerError) -> Self {
        Self::Listener(err.to_string())
    }
}

impl From<HashError> for MetastoreError {
    fn from(err: HashError) -> Self {
        Self::Unexpected(err.to_string())
    }
}
