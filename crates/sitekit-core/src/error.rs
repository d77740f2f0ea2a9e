//! Domain errors

use thiserror::Error;
use uuid::Uuid;

use crate::domain::EntityKind;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An entity cannot be its own parent")]
    SelfParent,

    #[error("Moving {entity_id} under {parent_id} would create a circular reference")]
    CircularReference { entity_id: Uuid, parent_id: Uuid },

    #[error("Slug '{slug}' is already in use; try '{suggested}'")]
    SlugConflict { slug: String, suggested: String },

    #[error("'{0}' is a reserved system route")]
    ReservedRoute(String),

    #[error("Invalid slug '{0}': lowercase letters, digits and hyphens only")]
    InvalidSlugFormat(String),

    #[error("Cannot delete this {kind}: {count} child {kind}s exist")]
    ChildrenExist { kind: EntityKind, count: i64 },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("No {kind} found for slug '{slug}'")]
    SlugNotFound { kind: EntityKind, slug: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied: requires '{0}'")]
    PermissionDenied(String),

    #[error("The record was modified by another request; refresh and retry")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine code used in API error envelopes and bulk reports.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::SelfParent => "SELF_PARENT",
            DomainError::CircularReference { .. } => "CIRCULAR_REFERENCE",
            DomainError::SlugConflict { .. } => "SLUG_CONFLICT",
            DomainError::ReservedRoute(_) => "RESERVED_ROUTE",
            DomainError::InvalidSlugFormat(_) => "INVALID_SLUG_FORMAT",
            DomainError::ChildrenExist { .. } => "CHILDREN_EXIST",
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::SlugNotFound { .. } => "NOT_FOUND",
            DomainError::Unauthenticated => "UNAUTHENTICATED",
            DomainError::PermissionDenied(_) => "PERMISSION_DENIED",
            DomainError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            DomainError::Database(_) => "DATABASE_ERROR",
            DomainError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(errors.to_string())
    }
}
