//! Slug redirect repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::EntityKind;
use crate::error::DomainError;

/// Read side of redirect resolution. Writes happen inside the owning
/// entity repository's transactions (slug changes and deletes), keeping
/// bookkeeping and the primary update atomic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectRepository: Send + Sync {
    /// Entity currently reachable through the given historical slug.
    async fn find_target(&self, kind: EntityKind, slug: &str) -> Result<Option<Uuid>, DomainError>;
}
