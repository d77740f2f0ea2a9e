// ============================================================================
// SiteKit Core - Page Service
// File: crates/sitekit-core/src/services/page_service.rs
// ============================================================================
//! Page orchestration: access-filtered reads, guarded mutations, slug and
//! redirect management, reorder and bulk operations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use sitekit_shared::constants::PERM_PAGES_MANAGE;
use sitekit_shared::types::Pagination;

use crate::domain::hierarchy::{build_forest, TreeNode};
use crate::domain::{access, cycle, slug as slug_rules};
use crate::domain::{CallerContext, EntityKind, FeatureFlags, Page, Visibility};
use crate::error::DomainError;
use crate::repositories::{PageFilter, PageRepository, RedirectRepository, SortUpdate};
use crate::services::{BulkFailure, BulkReport, SlugValidation};

/// Input for page creation.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub visibility: Visibility,
    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,
}

/// Partial update. Double options distinguish "leave unchanged" from
/// "set to null".
#[derive(Debug, Clone, Default)]
pub struct PageChanges {
    pub parent_id: Option<Option<Uuid>>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub sort_order: Option<i32>,
    pub required_permissions: Option<Vec<String>>,
    pub required_roles: Option<Vec<String>>,
    pub feature_flag: Option<Option<String>>,
    /// Optimistic-concurrency precondition.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBulkAction {
    Publish,
    Unpublish,
    Delete,
}

pub struct PageService<P: PageRepository, R: RedirectRepository> {
    pages: Arc<P>,
    redirects: Arc<R>,
}

impl<P: PageRepository, R: RedirectRepository> PageService<P, R> {
    pub fn new(pages: Arc<P>, redirects: Arc<R>) -> Self {
        Self { pages, redirects }
    }

    /// Flat listing, access-filtered for the caller.
    pub async fn list(
        &self,
        filter: &PageFilter,
        pagination: Pagination,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Vec<Page>, DomainError> {
        let pages = self.pages.list(filter, &pagination.clamped()).await?;
        Ok(pages
            .into_iter()
            .filter(|page| access::is_visible(page, caller, flags))
            .collect())
    }

    /// Access-filtered nested tree. Children of pruned parents stay
    /// hidden because the filter runs before the forest is built.
    pub async fn tree(
        &self,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Vec<TreeNode<Page>>, DomainError> {
        let all = self.pages.list_all().await?;
        let visible: Vec<Page> = all
            .into_iter()
            .filter(|page| access::is_visible(page, caller, flags))
            .collect();
        Ok(build_forest(&visible))
    }

    /// Resolves a slug, following the redirect table for renamed pages.
    /// Invisible pages resolve to NotFound so their existence is not
    /// leaked on the public read path.
    pub async fn resolve_slug(
        &self,
        slug: &str,
        caller: &CallerContext,
        flags: &FeatureFlags,
    ) -> Result<Page, DomainError> {
        let slug = slug.trim().to_lowercase();
        let not_found = || DomainError::SlugNotFound {
            kind: EntityKind::Page,
            slug: slug.clone(),
        };

        let page = match self.pages.find_by_slug(&slug).await? {
            Some(page) => page,
            None => {
                let target = self
                    .redirects
                    .find_target(EntityKind::Page, &slug)
                    .await?
                    .ok_or_else(not_found)?;
                self.pages.find_by_id(&target).await?.ok_or_else(not_found)?
            }
        };

        if !access::is_visible(&page, caller, flags) {
            return Err(not_found());
        }
        Ok(page)
    }

    pub async fn create(&self, new: NewPage, caller: &CallerContext) -> Result<Page, DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;

        // 1. Slug format and reserved-route rules
        let slug = new.slug.trim().to_lowercase();
        slug_rules::validate_slug(&slug)?;

        // 2. Parent must exist
        if let Some(parent_id) = new.parent_id {
            self.pages
                .find_by_id(&parent_id)
                .await?
                .ok_or(DomainError::NotFound { kind: EntityKind::Page, id: parent_id })?;
        }

        // 3. Uniqueness among live pages, with a suggested alternative
        let taken = self.taken_slugs(None).await?;
        if taken.contains(&slug) {
            let suggested = slug_rules::suggest_alternative(&slug, &taken);
            warn!("Page slug conflict: {} (suggesting {})", slug, suggested);
            return Err(DomainError::SlugConflict { slug, suggested });
        }

        // 4. New pages land at the end of their sibling group
        let sort_order = self.pages.count_siblings(new.parent_id).await? as i32;

        let page = Page::new(
            new.parent_id,
            slug,
            new.title,
            new.excerpt,
            sort_order,
            new.visibility,
            new.required_permissions,
            new.required_roles,
            new.feature_flag,
            caller.user_id,
        )?;

        let created = self.pages.create(&page).await?;
        info!("Page created: {} ({})", created.slug, created.id);
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &Uuid,
        changes: PageChanges,
        caller: &CallerContext,
    ) -> Result<Page, DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;

        let mut page = self
            .pages
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Page, id: *id })?;
        let old_slug = page.slug.clone();

        // 1. Optimistic-concurrency precondition
        if let Some(expected) = changes.expected_updated_at {
            if page.updated_at != Some(expected) {
                warn!("Concurrent update detected on page {}", page.id);
                return Err(DomainError::ConcurrencyConflict);
            }
        }

        // 2. Parent change runs through the cycle guard
        if let Some(new_parent) = changes.parent_id {
            if new_parent != page.parent_id {
                if let Some(parent_id) = new_parent {
                    self.pages
                        .find_by_id(&parent_id)
                        .await?
                        .ok_or(DomainError::NotFound { kind: EntityKind::Page, id: parent_id })?;
                }
                let all = self.pages.list_all().await?;
                cycle::validate_parent_assignment(page.id, new_parent, &all)?;
                page.parent_id = new_parent;
                // Reparented pages land at the end of the new group.
                page.sort_order = self.pages.count_siblings(new_parent).await? as i32;
            }
        }

        // 3. Scalar fields
        if let Some(sort_order) = changes.sort_order {
            page.sort_order = sort_order;
        }
        if let Some(title) = changes.title {
            page.title = title.trim().to_string();
        }
        if let Some(excerpt) = changes.excerpt {
            page.excerpt = excerpt.map(|e| e.trim().to_string());
        }
        if let Some(visibility) = changes.visibility {
            page.visibility = visibility;
        }
        if let Some(permissions) = changes.required_permissions {
            page.required_permissions = permissions;
        }
        if let Some(roles) = changes.required_roles {
            page.required_roles = roles;
        }
        if let Some(flag) = changes.feature_flag {
            page.feature_flag = flag;
        }

        // 4. Slug change is validated now, persisted transactionally below
        let new_slug = match changes.slug {
            Some(slug) => {
                let slug = slug.trim().to_lowercase();
                if slug == old_slug {
                    None
                } else {
                    slug_rules::validate_slug(&slug)?;
                    let taken = self.taken_slugs(Some(&old_slug)).await?;
                    if taken.contains(&slug) {
                        let suggested = slug_rules::suggest_alternative(&slug, &taken);
                        return Err(DomainError::SlugConflict { slug, suggested });
                    }
                    Some(slug)
                }
            }
            None => None,
        };

        page.validate().map_err(DomainError::from)?;
        page.touch(caller.user_id);
        let mut updated = self.pages.update(&page).await?;

        if let Some(slug) = new_slug {
            // Renames of published pages keep old links resolving.
            let redirect_from = page.is_published().then(|| old_slug.clone());
            updated = self.pages.update_slug(&page.id, &slug, redirect_from).await?;
            info!("Page {} slug changed: {} -> {}", page.id, old_slug, slug);
        }

        Ok(updated)
    }

    pub async fn publish(&self, id: &Uuid, caller: &CallerContext) -> Result<Page, DomainError> {
        self.transition(id, caller, |page, by| page.publish(by)).await
    }

    pub async fn unpublish(&self, id: &Uuid, caller: &CallerContext) -> Result<Page, DomainError> {
        self.transition(id, caller, |page, by| page.unpublish(by)).await
    }

    pub async fn archive(&self, id: &Uuid, caller: &CallerContext) -> Result<Page, DomainError> {
        self.transition(id, caller, |page, by| page.archive(by)).await
    }

    async fn transition(
        &self,
        id: &Uuid,
        caller: &CallerContext,
        apply: impl FnOnce(&mut Page, Option<Uuid>),
    ) -> Result<Page, DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;
        let mut page = self
            .pages
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Page, id: *id })?;
        apply(&mut page, caller.user_id);
        let updated = self.pages.update(&page).await?;
        info!("Page {} is now {}", updated.id, updated.status.as_str());
        Ok(updated)
    }

    /// Hard delete, blocked while children exist.
    pub async fn delete(&self, id: &Uuid, caller: &CallerContext) -> Result<(), DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;
        let page = self
            .pages
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound { kind: EntityKind::Page, id: *id })?;

        let children = self.pages.count_children(id).await?;
        if children > 0 {
            return Err(DomainError::ChildrenExist { kind: EntityKind::Page, count: children });
        }

        self.pages.delete(id).await?;
        info!("Page deleted: {} ({})", page.slug, page.id);
        Ok(())
    }

    /// Atomic sibling reorder: every id is checked up front and the
    /// repository applies the batch in a single transaction.
    pub async fn reorder(
        &self,
        updates: &[SortUpdate],
        caller: &CallerContext,
    ) -> Result<(), DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;
        if updates.is_empty() {
            return Ok(());
        }

        let known: HashSet<Uuid> = self.pages.list_all().await?.iter().map(|p| p.id).collect();
        for update in updates {
            if !known.contains(&update.id) {
                return Err(DomainError::NotFound { kind: EntityKind::Page, id: update.id });
            }
        }

        self.pages.update_orders(updates).await?;
        info!("Reordered {} pages", updates.len());
        Ok(())
    }

    /// Convenience batching of independent operations: per-item failures
    /// are collected, never aborting the rest of the batch.
    pub async fn bulk(
        &self,
        ids: &[Uuid],
        action: PageBulkAction,
        caller: &CallerContext,
    ) -> Result<BulkReport, DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;
        let mut report = BulkReport::default();
        for id in ids {
            let outcome = match action {
                PageBulkAction::Publish => self.publish(id, caller).await.map(|_| ()),
                PageBulkAction::Unpublish => self.unpublish(id, caller).await.map(|_| ()),
                PageBulkAction::Delete => self.delete(id, caller).await,
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
            "Bulk page action finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Pre-flight availability check; never writes.
    pub async fn validate_slug(
        &self,
        slug: &str,
        exclude_id: Option<Uuid>,
        caller: &CallerContext,
    ) -> Result<SlugValidation, DomainError> {
        caller.require(PERM_PAGES_MANAGE)?;
        let slug = slug.trim().to_lowercase();
        if let Err(error) = slug_rules::validate_slug(&slug) {
            return Ok(SlugValidation::rejected(error.to_string(), None));
        }

        let exclude_slug = match exclude_id {
            Some(id) => self.pages.find_by_id(&id).await?.map(|p| p.slug),
            None => None,
        };
        let taken = self.taken_slugs(exclude_slug.as_deref()).await?;
        if taken.contains(&slug) {
            let suggested = slug_rules::suggest_alternative(&slug, &taken);
            return Ok(SlugValidation::rejected(
                format!("Slug '{slug}' is already in use"),
                Some(suggested),
            ));
        }
        Ok(SlugValidation::ok())
    }

    async fn taken_slugs(&self, exclude: Option<&str>) -> Result<HashSet<String>, DomainError> {
        let mut taken: HashSet<String> = self.pages.live_slugs().await?.into_iter().collect();
        if let Some(slug) = exclude {
            taken.remove(slug);
        }
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::page_repository::MockPageRepository;
    use crate::repositories::redirect_repository::MockRedirectRepository;
    use std::sync::Mutex;

    fn manager() -> CallerContext {
        CallerContext::authenticated(
            Uuid::new_v4(),
            Some("Admin".to_string()),
            vec!["pages:manage".to_string()],
        )
    }

    fn page_with_slug(slug: &str) -> Page {
        Page::new(
            None,
            slug.to_string(),
            "Some Title".to_string(),
            None,
            0,
            Visibility::Public,
            Vec::new(),
            Vec::new(),
            None,
            None,
        )
        .expect("valid page")
    }

    fn service(
        pages: MockPageRepository,
        redirects: MockRedirectRepository,
    ) -> PageService<MockPageRepository, MockRedirectRepository> {
        PageService::new(Arc::new(pages), Arc::new(redirects))
    }

    fn new_page(slug: &str, parent_id: Option<Uuid>) -> NewPage {
        NewPage {
            parent_id,
            slug: slug.to_string(),
            title: "Some Title".to_string(),
            excerpt: None,
            visibility: Visibility::Public,
            required_permissions: Vec::new(),
            required_roles: Vec::new(),
            feature_flag: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_order_from_sibling_count() {
        let mut pages = MockPageRepository::new();
        pages.expect_live_slugs().returning(|| Ok(Vec::new()));
        pages.expect_count_siblings().returning(|_| Ok(3));
        pages
            .expect_create()
            .withf(|page| page.sort_order == 3 && page.slug == "pricing")
            .returning(|page| Ok(page.clone()));

        let svc = service(pages, MockRedirectRepository::new());
        let created = svc.create(new_page("Pricing", None), &manager()).await.unwrap();
        assert_eq!(created.sort_order, 3);
    }

    #[tokio::test]
    async fn test_create_conflict_suggests_alternative() {
        let mut pages = MockPageRepository::new();
        pages
            .expect_live_slugs()
            .returning(|| Ok(vec!["about".to_string()]));

        let svc = service(pages, MockRedirectRepository::new());
        let err = svc.create(new_page("about", None), &manager()).await.unwrap_err();
        match err {
            DomainError::SlugConflict { slug, suggested } => {
                assert_eq!(slug, "about");
                assert_eq!(suggested, "about-2");
            }
            other => panic!("expected SlugConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_reserved_and_malformed_slugs() {
        let svc = service(MockPageRepository::new(), MockRedirectRepository::new());

        let err = svc.create(new_page("dashboard", None), &manager()).await.unwrap_err();
        assert!(matches!(err, DomainError::ReservedRoute(_)));

        let err = svc.create(new_page("two words", None), &manager()).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidSlugFormat(_)));
    }

    #[tokio::test]
    async fn test_create_requires_existing_parent() {
        let mut pages = MockPageRepository::new();
        pages.expect_find_by_id().returning(|_| Ok(None));

        let svc = service(pages, MockRedirectRepository::new());
        let err = svc
            .create(new_page("child", Some(Uuid::new_v4())), &manager())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mutations_require_manage_permission() {
        let svc = service(MockPageRepository::new(), MockRedirectRepository::new());

        let err = svc
            .create(new_page("about", None), &CallerContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));

        let viewer = CallerContext::authenticated(
            Uuid::new_v4(),
            Some("User".to_string()),
            vec!["reports:read".to_string()],
        );
        let err = svc.create(new_page("about", None), &viewer).await.unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_self_parent() {
        let page = page_with_slug("root");
        let id = page.id;

        let mut pages = MockPageRepository::new();
        let snapshot = vec![page.clone()];
        pages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(page.clone())));
        pages.expect_list_all().returning(move || Ok(snapshot.clone()));

        let svc = service(pages, MockRedirectRepository::new());
        let changes = PageChanges { parent_id: Some(Some(id)), ..Default::default() };
        let err = svc.update(&id, changes, &manager()).await.unwrap_err();
        assert!(matches!(err, DomainError::SelfParent));
    }

    #[tokio::test]
    async fn test_update_rejects_parenting_under_descendant() {
        let parent = page_with_slug("parent");
        let mut child = page_with_slug("child");
        child.parent_id = Some(parent.id);

        let parent_id = parent.id;
        let child_id = child.id;
        let snapshot = vec![parent.clone(), child.clone()];

        let mut pages = MockPageRepository::new();
        pages.expect_find_by_id().returning(move |id| {
            if *id == parent_id {
                Ok(Some(parent.clone()))
            } else {
                Ok(Some(child.clone()))
            }
        });
        pages.expect_list_all().returning(move || Ok(snapshot.clone()));

        let svc = service(pages, MockRedirectRepository::new());
        let changes = PageChanges { parent_id: Some(Some(child_id)), ..Default::default() };
        let err = svc.update(&parent_id, changes, &manager()).await.unwrap_err();
        assert!(err.to_string().contains("circular reference"));
    }

    #[tokio::test]
    async fn test_update_concurrency_conflict() {
        let page = page_with_slug("about");
        let id = page.id;

        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(page.clone())));

        let svc = service(pages, MockRedirectRepository::new());
        let changes = PageChanges {
            title: Some("New Title".to_string()),
            expected_updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let err = svc.update(&id, changes, &manager()).await.unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict));
    }

    #[tokio::test]
    async fn test_slug_change_of_published_page_records_redirect() {
        let mut page = page_with_slug("old-name");
        page.publish(None);
        let id = page.id;

        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(page.clone())));
        pages
            .expect_live_slugs()
            .returning(|| Ok(vec!["old-name".to_string()]));
        pages.expect_update().returning(|p| Ok(p.clone()));
        pages
            .expect_update_slug()
            .withf(|_, new_slug, redirect_from| {
                new_slug == "new-name" && redirect_from.as_deref() == Some("old-name")
            })
            .returning(|_, new_slug, _| {
                let mut updated = Page::new(
                    None,
                    new_slug.to_string(),
                    "Some Title".to_string(),
                    None,
                    0,
                    Visibility::Public,
                    Vec::new(),
                    Vec::new(),
                    None,
                    None,
                )
                .expect("valid page");
                updated.publish(None);
                Ok(updated)
            });

        let svc = service(pages, MockRedirectRepository::new());
        let changes = PageChanges { slug: Some("new-name".to_string()), ..Default::default() };
        let updated = svc.update(&id, changes, &manager()).await.unwrap();
        assert_eq!(updated.slug, "new-name");
    }

    #[tokio::test]
    async fn test_resolve_follows_redirect_chain() {
        // Renamed a -> b -> c: both historical slugs map to the page id,
        // and resolution lands on the current slug.
        let mut current = page_with_slug("c");
        current.publish(None);
        let id = current.id;

        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_slug()
            .returning(move |slug| match slug {
                "c" => Ok(Some(current.clone())),
                _ => Ok(None),
            });
        let lookup = current_clone_for_find(id);
        pages.expect_find_by_id().returning(move |qid| Ok(lookup(qid)));

        let mut redirects = MockRedirectRepository::new();
        redirects
            .expect_find_target()
            .returning(move |_, slug| match slug {
                "a" | "b" => Ok(Some(id)),
                _ => Ok(None),
            });

        let svc = service(pages, redirects);
        let flags = FeatureFlags::default();
        let caller = CallerContext::anonymous();

        for slug in ["a", "b", "c"] {
            let resolved = svc.resolve_slug(slug, &caller, &flags).await.unwrap();
            assert_eq!(resolved.id, id);
            assert_eq!(resolved.slug, "c");
        }

        let err = svc.resolve_slug("ghost", &caller, &flags).await.unwrap_err();
        assert!(matches!(err, DomainError::SlugNotFound { .. }));
    }

    // Builds a find_by_id closure returning a published page with slug "c".
    fn current_clone_for_find(id: Uuid) -> impl Fn(&Uuid) -> Option<Page> {
        move |qid: &Uuid| {
            if *qid == id {
                let mut page = Page::new(
                    None,
                    "c".to_string(),
                    "Some Title".to_string(),
                    None,
                    0,
                    Visibility::Public,
                    Vec::new(),
                    Vec::new(),
                    None,
                    None,
                )
                .expect("valid page");
                page.publish(None);
                page.id = id;
                Some(page)
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_hides_invisible_pages() {
        let draft = page_with_slug("secret");
        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_slug()
            .returning(move |_| Ok(Some(draft.clone())));

        let svc = service(pages, MockRedirectRepository::new());
        let err = svc
            .resolve_slug("secret", &CallerContext::anonymous(), &FeatureFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SlugNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_children() {
        let page = page_with_slug("parent");
        let id = page.id;

        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(page.clone())));
        pages.expect_count_children().returning(|_| Ok(2));
        pages.expect_delete().never();

        let svc = service(pages, MockRedirectRepository::new());
        let err = svc.delete(&id, &manager()).await.unwrap_err();
        match err {
            DomainError::ChildrenExist { count, .. } => assert_eq!(count, 2),
            other => panic!("expected ChildrenExist, got {other:?}"),
        }
        assert!(err.to_string().contains("child page"));
    }

    #[tokio::test]
    async fn test_delete_leaf_succeeds() {
        let page = page_with_slug("leaf");
        let id = page.id;

        let mut pages = MockPageRepository::new();
        pages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(page.clone())));
        pages.expect_count_children().returning(|_| Ok(0));
        pages.expect_delete().times(1).returning(|_| Ok(()));

        let svc = service(pages, MockRedirectRepository::new());
        assert!(svc.delete(&id, &manager()).await.is_ok());
    }

    #[tokio::test]
    async fn test_reorder_unknown_id_persists_nothing() {
        let known = page_with_slug("known");
        let known_id = known.id;
        let snapshot = vec![known];

        let mut pages = MockPageRepository::new();
        pages.expect_list_all().returning(move || Ok(snapshot.clone()));
        pages.expect_update_orders().never();

        let svc = service(pages, MockRedirectRepository::new());
        let updates = vec![
            SortUpdate { id: known_id, sort_order: 1 },
            SortUpdate { id: Uuid::new_v4(), sort_order: 0 },
        ];
        let err = svc.reorder(&updates, &manager()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reorder_valid_batch_applies() {
        let a = page_with_slug("a");
        let b = page_with_slug("b");
        let (a_id, b_id) = (a.id, b.id);
        let snapshot = vec![a, b];

        let mut pages = MockPageRepository::new();
        pages.expect_list_all().returning(move || Ok(snapshot.clone()));
        pages
            .expect_update_orders()
            .withf(move |updates| {
                updates.len() == 2 && updates[0].id == a_id && updates[1].id == b_id
            })
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(pages, MockRedirectRepository::new());
        let updates = vec![
            SortUpdate { id: a_id, sort_order: 2 },
            SortUpdate { id: b_id, sort_order: 1 },
        ];
        assert!(svc.reorder(&updates, &manager()).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_reports_per_item_failures() {
        let deletable = page_with_slug("deletable");
        let blocked = page_with_slug("blocked");
        let (deletable_id, blocked_id) = (deletable.id, blocked.id);
        let missing_id = Uuid::new_v4();

        let mut pages = MockPageRepository::new();
        pages.expect_find_by_id().returning(move |id| {
            if *id == deletable_id {
                Ok(Some(deletable.clone()))
            } else if *id == blocked_id {
                Ok(Some(blocked.clone()))
            } else {
                Ok(None)
            }
        });
        pages.expect_count_children().returning(move |id| {
            if *id == blocked_id {
                Ok(1)
            } else {
                Ok(0)
            }
        });
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let deleted_log = deleted.clone();
        pages.expect_delete().returning(move |id| {
            deleted_log.lock().unwrap().push(*id);
            Ok(())
        });

        let svc = service(pages, MockRedirectRepository::new());
        let report = svc
            .bulk(&[deletable_id, blocked_id, missing_id], PageBulkAction::Delete, &manager())
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec![deletable_id]);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().any(|f| f.id == blocked_id && f.code == "CHILDREN_EXIST"));
        assert!(report.failed.iter().any(|f| f.id == missing_id && f.code == "NOT_FOUND"));
        assert_eq!(*deleted.lock().unwrap(), vec![deletable_id]);
    }

    #[tokio::test]
    async fn test_validate_slug_preflight() {
        let mut pages = MockPageRepository::new();
        pages
            .expect_live_slugs()
            .returning(|| Ok(vec!["about".to_string()]));

        let svc = service(pages, MockRedirectRepository::new());
        let caller = manager();

        let taken = svc.validate_slug("about", None, &caller).await.unwrap();
        assert!(!taken.is_valid);
        assert_eq!(taken.suggested_slug.as_deref(), Some("about-2"));

        let free = svc.validate_slug("contact", None, &caller).await.unwrap();
        assert!(free.is_valid);

        let malformed = svc.validate_slug("Bad Slug", None, &caller).await.unwrap();
        assert!(!malformed.is_valid);
        assert!(malformed.suggested_slug.is_none());
    }
}
