// ============================================================================
// SiteKit Core - Menu Service
// File: crates/sitekit-core/src/services/menu_service.rs
// ============================================================================
//! Menu orchestration. Mirrors the page flow with menu-specific fields
//! and the activate/deactivate lifecycle.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use sitekit_shared::constants::PERM_MENUS_MANAGE;
use sitekit_shared::types::Pagination;

use crate::domain::hierarchy::{build_forest, TreeNode};
use crate::domain::{access, cycle, slug as slug_rules};
use crate::domain::{CallerContext, EntityKind, FeatureFlags, Menu};
use crate::error::DomainError;
use crate::repositories::{MenuFilter, MenuRepository, RedirectRepository, SortUpdate};
use crate::services::{BulkFailure, BulkReport, SlugValidation};

/// Input for menu creation.
#[derive(Debug, Clone)]
pub struct NewMenu {
    pub parent_id: Option<Uuid>,
    pub menu_key: String,
    pub label: String,
    pub target_url: Option<String>,
    pub icon: Option<String>,
    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,
}

/// Partial update; double options distinguish "unchanged" from "set null".
#[derive(Debug, Clone, Default)]
pub struct MenuChanges {
    pub parent_id: Option<Option<Uuid>>,
    pub menu_key: Option<String>,
    pub label: Option<String>,
    pub target_url: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub required_permissions: Option<Vec<String>>,
    pub required_roles: Option<Vec<String>>,
    pub feature_flag: Option<Option<String>>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuBulkAction {
    Activate,
    Deactivate,
    Delete,
}

pub struct MenuService<M: MenuRepository, R: RedirectRepository> {
    menus: Arc<M>,
    redirects: Arc<R>,
}

impl<M: MenuRepository, R: RedirectRepository> MenuService<M, R> {
    pub fn new(menus: Arc<M>, redirects: Arc<R>) -> Self {
        Self { menus, redirects }
    }

    /// Flat listing, access-filtered for the caller.
    pub async fn list(
        &self,
        filter: &MenuFilter,
        pagination: Pagination,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Vec<Menu>, DomainError> {
        let menus = self.menus.list(filter, &pagination.clamped()).await?;
        Ok(menus
            .into_iter()
            .filter(|menu| access::is_visible(menu, caller, flags))
            .collect())
    }

    /// The caller's navigation tree: access-filtered, then nested.
    pub async fn user_menus(
        &self,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Vec<TreeNode<Menu>>, DomainError> {
        let all = self.menus.list_all().await?;
        let visible: Vec<Menu> = all
            .into_iter()
            .filter(|menu| access::is_visible(menu, caller, flags))
            .collect();
        Ok(build_forest(&visible))
    }

    /// Resolves a menu key, following redirects left by renames.
    pub async fn resolve_key(
        &self,
        key: &str,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Menu, DomainError> {
        let key = key.trim().to_lowercase();
        let not_found = || DomainError::SlugNotFound {
            kind: EntityKind::Menu,
            slug: key.clone(),
        };

        let menu = match self.menus.find_by_key(&key).await? {
            Some(menu) => menu,
            None => {
                let target = self
                    .redirects
                    .find_target(EntityKind::Menu, &key)
                    .await?
                    .ok_or_else(not_found)?;
                self.menus.find_by_id(&target).await?.ok_or_else(not_found)?
            }
        };

        if !access::is_visible(&menu, caller, flags) {
            return Err(not_found());
        }
        Ok(menu)
    }

    pub async fn create(&self, new: NewMenu, caller: &CallerContext) -> Result<Menu, DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;

        // 1. Key format and reserved-route rules
        let key = new.menu_key.trim().to_lowercase();
        slug_rules::validate_slug(&key)?;

        // 2. Parent must exist
        if let Some(parent_id) = new.parent_id {
            self.menus
                .find_by_id(&parent_id)
                .await?
                .ok_or(DomainError::NotFound { kind: EntityKind::Menu, id: parent_id })?;
        }

        // 3. Uniqueness among live menus
        let taken = self.taken_keys(None).await?;
        if taken.contains(&key) {
            let suggested = slug_rules::suggest_alternative(&key, &taken);
            warn!("Menu key conflict: {} (suggesting {})", key, suggested);
            return Err(DomainError::SlugConflict { slug: key, suggested });
        }

        // 4. New menus land at the end of their sibling group
        let sort_order = self.menus.count_siblings(new.parent_id).await? as i32;

        let menu = Menu::new(
            new.parent_id,
            key,
            new.label,
            new.target_url,
            new.icon,
            sort_order,
            new.required_permissions,
            new.required_roles,
            new.feature_flag,
            caller.user_id,
        )?;

        let created = self.menus.create(&menu).await?;
        info!("Menu created: {} ({})", created.menu_key, created.id);
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &Uuid,
        changes: MenuChanges,
        caller: &CallerContext,
    ) -> Result<Menu, DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;

        let mut menu = self
            .menus
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Menu, id: *id })?;
        let old_key = menu.menu_key.clone();

        // 1. Optimistic-concurrency precondition
        if let Some(expected) = changes.expected_updated_at {
            if menu.updated_at != Some(expected) {
                warn!("Concurrent update detected on menu {}", menu.id);
                return Err(DomainError::ConcurrencyConflict);
            }
        }

        // 2. Parent change runs through the cycle guard
        if let Some(new_parent) = changes.parent_id {
            if new_parent != menu.parent_id {
                if let Some(parent_id) = new_parent {
                    self.menus
                        .find_by_id(&parent_id)
                        .await?
                        .ok_or(DomainError::NotFound { kind: EntityKind::Menu, id: parent_id })?;
                }
                let all = self.menus.list_all().await?;
                cycle::validate_parent_assignment(menu.id, new_parent, &all)?;
                menu.parent_id = new_parent;
                menu.sort_order = self.menus.count_siblings(new_parent).await? as i32;
            }
        }

        // 3. Scalar fields
        if let Some(sort_order) = changes.sort_order {
            menu.sort_order = sort_order;
        }
        if let Some(label) = changes.label {
            menu.label = label.trim().to_string();
        }
        if let Some(target_url) = changes.target_url {
            menu.target_url = target_url.map(|u| u.trim().to_string());
        }
        if let Some(icon) = changes.icon {
            menu.icon = icon.map(|i| i.trim().to_string());
        }
        if let Some(permissions) = changes.required_permissions {
            menu.required_permissions = permissions;
        }
        if let Some(roles) = changes.required_roles {
            menu.required_roles = roles;
        }
        if let Some(flag) = changes.feature_flag {
            menu.feature_flag = flag;
        }

        // 4. Key change validated now, persisted transactionally below
        let new_key = match changes.menu_key {
            Some(key) => {
                let key = key.trim().to_lowercase();
                if key == old_key {
                    None
                } else {
                    slug_rules::validate_slug(&key)?;
                    let taken = self.taken_keys(Some(&old_key)).await?;
                    if taken.contains(&key) {
                        let suggested = slug_rules::suggest_alternative(&key, &taken);
                        return Err(DomainError::SlugConflict { slug: key, suggested });
                    }
                    Some(key)
                }
            }
            None => None,
        };

        menu.validate().map_err(DomainError::from)?;
        menu.touch(caller.user_id);
        let mut updated = self.menus.update(&menu).await?;

        if let Some(key) = new_key {
            let redirect_from = menu.is_active().then(|| old_key.clone());
            updated = self.menus.update_key(&menu.id, &key, redirect_from).await?;
            info!("Menu {} key changed: {} -> {}", menu.id, old_key, key);
        }

        Ok(updated)
    }

    pub async fn activate(&self, id: &Uuid, caller: &CallerContext) -> Result<Menu, DomainError> {
        self.transition(id, caller, |menu, by| menu.activate(by)).await
    }

    pub async fn deactivate(&self, id: &Uuid, caller: &CallerContext) -> Result<Menu, DomainError> {
        self.transition(id, caller, |menu, by| menu.deactivate(by)).await
    }

    async fn transition(
        &self,
        id: &Uuid,
        caller: &CallerContext,
        apply: impl FnOnce(&mut Menu, Option<Uuid>),
    ) -> Result<Menu, DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;
        let mut menu = self
            .menus
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Menu, id: *id })?;
        apply(&mut menu, caller.user_id);
        let updated = self.menus.update(&menu).await?;
        info!("Menu {} is now {}", updated.id, updated.status.as_str());
        Ok(updated)
    }

    /// Hard delete, blocked while children exist.
    pub async fn delete(&self, id: &Uuid, caller: &CallerContext) -> Result<(), DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;
        let menu = self
            .menus
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Menu, id: *id })?;

        let children = self.menus.count_children(id).await?;
        if children > 0 {
            return Err(DomainError::ChildrenExist { kind: EntityKind::Menu, count: children });
        }

        self.menus.delete(id).await?;
        info!("Menu deleted: {} ({})", menu.menu_key, menu.id);
        Ok(())
    }

    /// Atomic sibling reorder; see `PageService::reorder`.
    pub async fn reorder(
        &self,
        updates: &[SortUpdate],
        caller: &CallerContext,
    ) -> Result<(), DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;
        if updates.is_empty() {
            return Ok(());
        }

        let known: HashSet<Uuid> = self.menus.list_all().await?.iter().map(|m| m.id).collect();
        for update in updates {
            if !known.contains(&update.id) {
                return Err(DomainError::NotFound { kind: EntityKind::Menu, id: update.id });
            }
        }

        self.menus.update_orders(updates).await?;
        info!("Reordered {} menus", updates.len());
        Ok(())
    }

    /// Convenience batching of independent operations with a per-item
    /// report.
    pub async fn bulk(
        &self,
        ids: &[Uuid],
        action: MenuBulkAction,
        caller: &CallerContext,
    ) -> Result<BulkReport, DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;
        let mut report = BulkReport::default();
        for id in ids {
            let outcome = match action {
                MenuBulkAction::Activate => self.activate(id, caller).await.map(|_| ()),
                MenuBulkAction::Deactivate => self.deactivate(id, caller).await.map(|_| ()),
                MenuBulkAction::Delete => self.delete(id, caller).await,
            };
            match outcome {
                Ok(()) => report.succeeded.push(*id),
                Err(error) => report.failed.push(BulkFailure {
                    id: *id,
                    code: error.code(),
                    reason: error.to_string(),
                }),
            }
        }
        info!(
            "Bulk menu action finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Pre-flight key availability check; never writes.
    pub async fn validate_key(
        &self,
        key: &str,
        exclude_id: Option<Uuid>,
        caller: &CallerContext,
    ) -> Result<SlugValidation, DomainError> {
        caller.require(PERM_MENUS_MANAGE)?;
        let key = key.trim().to_lowercase();
        if let Err(error) = slug_rules::validate_slug(&key) {
            return Ok(SlugValidation::rejected(error.to_string(), None));
        }

        let exclude_key = match exclude_id {
            Some(id) => self.menus.find_by_id(&id).await?.map(|m| m.menu_key),
            None => None,
        };
        let taken = self.taken_keys(exclude_key.as_deref()).await?;
        if taken.contains(&key) {
            let suggested = slug_rules::suggest_alternative(&key, &taken);
            return Ok(SlugValidation::rejected(
                format!("Menu key '{key}' is already in use"),
                Some(suggested),
            ));
        }
        Ok(SlugValidation::ok())
    }

    async fn taken_keys(&self, exclude: Option<&str>) -> Result<HashSet<String>, DomainError> {
        let mut taken: HashSet<String> = self.menus.live_keys().await?.into_iter().collect();
        if let Some(key) = exclude {
            taken.remove(key);
        }
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::menu_repository::MockMenuRepository;
    use crate::repositories::redirect_repository::MockRedirectRepository;

    fn manager() -> CallerContext {
        CallerContext::authenticated(
            Uuid::new_v4(),
            Some("Admin".to_string()),
            vec!["menus:manage".to_string()],
        )
    }

    fn user_with_role(role: &str) -> CallerContext {
        CallerContext::authenticated(Uuid::new_v4(), Some(role.to_string()), Vec::new())
    }

    fn menu_with_key(key: &str) -> Menu {
        Menu::new(
            None,
            key.to_string(),
            "Some Label".to_string(),
            None,
            None,
            0,
            Vec::new(),
            Vec::new(),
            None,
            None,
        )
        .expect("valid menu")
    }

    fn service(
        menus: MockMenuRepository,
        redirects: MockRedirectRepository,
    ) -> MenuService<MockMenuRepository, MockRedirectRepository> {
        MenuService::new(Arc::new(menus), Arc::new(redirects))
    }

    #[tokio::test]
    async fn test_user_menus_excludes_wrong_role() {
        let mut managers_only = menu_with_key("payroll");
        managers_only.required_roles = vec!["Manager".to_string()];
        let open = menu_with_key("home");
        let open_id = open.id;

        let snapshot = vec![managers_only.clone(), open.clone()];
        let mut menus = MockMenuRepository::new();
        menus.expect_list_all().returning(move || Ok(snapshot.clone()));

        let svc = service(menus, MockRedirectRepository::new());
        let flags = FeatureFlags::default();

        let tree = svc.user_menus(&user_with_role("User"), &flags).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].item.id, open_id);

        let tree = svc.user_menus(&user_with_role("Manager"), &flags).await.unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[tokio::test]
    async fn test_user_menus_hides_inactive_from_non_managers() {
        let mut inactive = menu_with_key("retired");
        inactive.deactivate(None);
        let snapshot = vec![inactive];

        let mut menus = MockMenuRepository::new();
        menus.expect_list_all().returning(move || Ok(snapshot.clone()));

        let svc = service(menus, MockRedirectRepository::new());
        let flags = FeatureFlags::default();

        let tree = svc.user_menus(&user_with_role("User"), &flags).await.unwrap();
        assert!(tree.is_empty());

        let tree = svc.user_menus(&manager(), &flags).await.unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[tokio::test]
    async fn test_user_menus_hidden_parent_hides_children() {
        let mut parent = menu_with_key("finance");
        parent.required_roles = vec!["Manager".to_string()];
        let mut child = menu_with_key("invoices");
        child.parent_id = Some(parent.id);

        let snapshot = vec![parent, child];
        let mut menus = MockMenuRepository::new();
        menus.expect_list_all().returning(move || Ok(snapshot.clone()));

        let svc = service(menus, MockRedirectRepository::new());
        let tree = svc
            .user_menus(&user_with_role("User"), &FeatureFlags::default())
            .await
            .unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_key_conflict() {
        let mut menus = MockMenuRepository::new();
        menus
            .expect_live_keys()
            .returning(|| Ok(vec!["reports".to_string()]));

        let svc = service(menus, MockRedirectRepository::new());
        let new = NewMenu {
            parent_id: None,
            menu_key: "Reports".to_string(),
            label: "Reports".to_string(),
            target_url: None,
            icon: None,
            required_permissions: Vec::new(),
            required_roles: Vec::new(),
            feature_flag: None,
        };
        let err = svc.create(new, &manager()).await.unwrap_err();
        match err {
            DomainError::SlugConflict { slug, suggested } => {
                assert_eq!(slug, "reports");
                assert_eq!(suggested, "reports-2");
            }
            other => panic!("expected SlugConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_key_change_of_active_menu_records_redirect() {
        let menu = menu_with_key("old-key");
        let id = menu.id;

        let mut menus = MockMenuRepository::new();
        menus
            .expect_find_by_id()
            .returning(move |_| Ok(Some(menu.clone())));
        menus
            .expect_live_keys()
            .returning(|| Ok(vec!["old-key".to_string()]));
        menus.expect_update().returning(|m| Ok(m.clone()));
        menus
            .expect_update_key()
            .withf(|_, new_key, redirect_from| {
                new_key == "new-key" && redirect_from.as_deref() == Some("old-key")
            })
            .times(1)
            .returning(|_, new_key, _| Ok(menu_for_key(new_key)));

        let svc = service(menus, MockRedirectRepository::new());
        let changes = MenuChanges { menu_key: Some("new-key".to_string()), ..Default::default() };
        let updated = svc.update(&id, changes, &manager()).await.unwrap();
        assert_eq!(updated.menu_key, "new-key");
    }

    fn menu_for_key(key: &str) -> Menu {
        Menu::new(
            None,
            key.to_string(),
            "Some Label".to_string(),
            None,
            None,
            0,
            Vec::new(),
            Vec::new(),
            None,
            None,
        )
        .expect("valid menu")
    }

    #[tokio::test]
    async fn test_bulk_deactivate_reports_missing_items() {
        let present = menu_with_key("present");
        let present_id = present.id;
        let missing_id = Uuid::new_v4();

        let mut menus = MockMenuRepository::new();
        menus.expect_find_by_id().returning(move |id| {
            if *id == present_id {
                Ok(Some(present.clone()))
            } else {
                Ok(None)
            }
        });
        menus.expect_update().returning(|m| Ok(m.clone()));

        let svc = service(menus, MockRedirectRepository::new());
        let report = svc
            .bulk(&[present_id, missing_id], MenuBulkAction::Deactivate, &manager())
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec![present_id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, missing_id);
        assert_eq!(report.failed[0].code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_validate_key_preflight() {
        let mut menus = MockMenuRepository::new();
        menus
            .expect_live_keys()
            .returning(|| Ok(vec!["reports".to_string()]));

        let svc = service(menus, MockRedirectRepository::new());
        let caller = manager();

        let taken = svc.validate_key("reports", None, &caller).await.unwrap();
        assert!(!taken.is_valid);
        assert_eq!(taken.suggested_slug.as_deref(), Some("reports-2"));

        let reserved = svc.validate_key("admin", None, &caller).await.unwrap();
        assert!(!reserved.is_valid);
    }
}
