//! Page repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use sitekit_shared::types::Pagination;

use crate::domain::{Page, PageStatus, Visibility};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub status: Option<PageStatus>,
    pub visibility: Option<Visibility>,
    pub parent_id: Option<Uuid>,
}

/// One entry of an atomic reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortUpdate {
    pub id: Uuid,
    pub sort_order: i32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Page>, DomainError>;
    /// Case-insensitive lookup among live pages.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>, DomainError>;
    async fn list(&self, filter: &PageFilter, pagination: &Pagination) -> Result<Vec<Page>, DomainError>;
    async fn list_all(&self) -> Result<Vec<Page>, DomainError>;
    /// Lowercase slugs of all live pages, for conflict checks.
    async fn live_slugs(&self) -> Result<Vec<String>, DomainError>;
    async fn count_children(&self, id: &Uuid) -> Result<i64, DomainError>;
    async fn count_siblings(&self, parent_id: Option<Uuid>) -> Result<i64, DomainError>;
    /// Also supersedes any redirect row parked on the new slug.
    async fn create(&self, page: &Page) -> Result<Page, DomainError>;
    async fn update(&self, page: &Page) -> Result<Page, DomainError>;
    /// Transactional slug change: updates the slug, records the
    /// `redirect_from` mapping when given, and supersedes redirect rows
    /// parked on the new slug. All or nothing.
    async fn update_slug(
        &self,
        id: &Uuid,
        new_slug: &str,
        redirect_from: Option<String>,
    ) -> Result<Page, DomainError>;
    /// Atomic batch: any unknown id rolls back every order change.
    async fn update_orders(&self, updates: &[SortUpdate]) -> Result<(), DomainError>;
    /// Hard delete; fails with ChildrenExist while children remain, and
    /// removes redirect rows targeting the page in the same transaction.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
