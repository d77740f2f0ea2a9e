//! Menu repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use sitekit_shared::types::Pagination;

use crate::domain::{Menu, MenuStatus};
use crate::error::DomainError;
use crate::repositories::page_repository::SortUpdate;

#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    pub status: Option<MenuStatus>,
    pub parent_id: Option<Uuid>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError>;
    /// Case-insensitive lookup among live menus.
    async fn find_by_key(&self, key: &str) -> Result<Option<Menu>, DomainError>;
    async fn list(&self, filter: &MenuFilter, pagination: &Pagination) -> Result<Vec<Menu>, DomainError>;
    async fn list_all(&self) -> Result<Vec<Menu>, DomainError>;
    /// Lowercase keys of all live menus, for conflict checks.
    async fn live_keys(&self) -> Result<Vec<String>, DomainError>;
    async fn count_children(&self, id: &Uuid) -> Result<i64, DomainError>;
    async fn count_siblings(&self, parent_id: Option<Uuid>) -> Result<i64, DomainError>;
    /// Also supersedes any redirect row parked on the new key.
    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError>;
    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError>;
    /// Transactional key change with redirect bookkeeping; see
    /// `PageRepository::update_slug`.
    async fn update_key(
        &self,
        id: &Uuid,
        new_key: &str,
        redirect_from: Option<String>,
    ) -> Result<Menu, DomainError>;
    /// Atomic batch: any unknown id rolls back every order change.
    async fn update_orders(&self, updates: &[SortUpdate]) -> Result<(), DomainError>;
    /// Hard delete; fails with ChildrenExist while children remain.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
