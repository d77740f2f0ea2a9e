// ============================================================================
// SiteKit API - Page Handlers
// File: crates/sitekit-api/src/handlers/pages.rs
// ============================================================================
//! Page HTTP handlers and their request/response DTOs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sitekit_core::domain::hierarchy::TreeNode;
use sitekit_core::domain::{Page, PageStatus, Visibility};
use sitekit_core::error::DomainError;
use sitekit_core::repositories::{PageFilter, SortUpdate};
use sitekit_core::services::{BulkReport, NewPage, PageBulkAction, PageChanges, SlugValidation};
use sitekit_shared::types::Pagination;

use crate::auth::Caller;
use crate::error::ApiFailure;
use crate::handlers::double_option;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Page DTO for responses
#[derive(Debug, Serialize)]
pub struct PageDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub sort_order: i32,
    pub status: PageStatus,
    pub visibility: Visibility,
    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Page> for PageDto {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            parent_id: page.parent_id,
            slug: page.slug,
            title: page.title,
            excerpt: page.excerpt,
            sort_order: page.sort_order,
            status: page.status,
            visibility: page.visibility,
            required_permissions: page.required_permissions,
            required_roles: page.required_roles,
            feature_flag: page.feature_flag,
            published_at: page.published_at,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

/// Nested tree node DTO
#[derive(Debug, Serialize)]
pub struct PageTreeDto {
    #[serde(flatten)]
    pub page: PageDto,
    pub children: Vec<PageTreeDto>,
}

impl From<TreeNode<Page>> for PageTreeDto {
    fn from(node: TreeNode<Page>) -> Self {
        Self {
            page: node.item.into(),
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPagesQuery {
    pub status: Option<PageStatus>,
    pub visibility: Option<Visibility>,
    pub parent_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePageRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    pub slug: String,
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 500, message = "Excerpt too long"))]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePageRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub slug: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub sort_order: Option<i32>,
    pub required_permissions: Option<Vec<String>>,
    pub required_roles: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub feature_flag: Option<Option<String>>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl From<UpdatePageRequest> for PageChanges {
    fn from(req: UpdatePageRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            slug: req.slug,
            title: req.title,
            excerpt: req.excerpt,
            visibility: req.visibility,
            sort_order: req.sort_order,
            required_permissions: req.required_permissions,
            required_roles: req.required_roles,
            feature_flag: req.feature_flag,
            expected_updated_at: req.expected_updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderItem {
    pub id: Uuid,
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub updates: Vec<ReorderItem>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    Publish,
    Unpublish,
    Delete,
}

impl From<PageAction> for PageBulkAction {
    fn from(action: PageAction) -> Self {
        match action {
            PageAction::Publish => PageBulkAction::Publish,
            PageAction::Unpublish => PageBulkAction::Unpublish,
            PageAction::Delete => PageBulkAction::Delete,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkPagesRequest {
    pub ids: Vec<Uuid>,
    pub action: PageAction,
}

#[derive(Debug, Deserialize)]
pub struct ValidateSlugRequest {
    pub slug: String,
    pub exclude_id: Option<Uuid>,
}

/// GET /api/v1/pages
pub async fn list_pages(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<ListPagesQuery>,
) -> Result<Json<ApiResponse<Vec<PageDto>>>, ApiFailure> {
    let filter = PageFilter {
        status: query.status,
        visibility: query.visibility,
        parent_id: query.parent_id,
    };
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or_else(|| Pagination::default().per_page),
    };
    let pages = state
        .pages
        .list(&filter, pagination, &caller, &state.flags)
        .await?;
    Ok(Json(ApiResponse::success(
        pages.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/v1/pages/hierarchy
pub async fn page_tree(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ApiResponse<Vec<PageTreeDto>>>, ApiFailure> {
    let tree = state.pages.tree(&caller, &state.flags).await?;
    Ok(Json(ApiResponse::success(
        tree.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/v1/pages/slug/{slug}
pub async fn resolve_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PageDto>>, ApiFailure> {
    let page = state.pages.resolve_slug(&slug, &caller, &state.flags).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// POST /api/v1/pages
pub async fn create_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PageDto>>), ApiFailure> {
    payload.validate().map_err(DomainError::from)?;
    let new = NewPage {
        parent_id: payload.parent_id,
        slug: payload.slug,
        title: payload.title,
        excerpt: payload.excerpt,
        visibility: payload.visibility,
        required_permissions: payload.required_permissions,
        required_roles: payload.required_roles,
        feature_flag: payload.feature_flag,
    };
    let page = state.pages.create(new, &caller).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(page.into()))))
}

/// PATCH /api/v1/pages/{id}
pub async fn update_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageRequest>,
) -> Result<Json<ApiResponse<PageDto>>, ApiFailure> {
    let page = state.pages.update(&id, payload.into(), &caller).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// PATCH /api/v1/pages/{id}/publish
pub async fn publish_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PageDto>>, ApiFailure> {
    let page = state.pages.publish(&id, &caller).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// PATCH /api/v1/pages/{id}/unpublish
pub async fn unpublish_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PageDto>>, ApiFailure> {
    let page = state.pages.unpublish(&id, &caller).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// PATCH /api/v1/pages/{id}/archive
pub async fn archive_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PageDto>>, ApiFailure> {
    let page = state.pages.archive(&id, &caller).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// DELETE /api/v1/pages/{id}
pub async fn delete_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiFailure> {
    state.pages.delete(&id, &caller).await?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/v1/pages/reorder
pub async fn reorder_pages(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ApiResponse<()>>, ApiFailure> {
    let updates: Vec<SortUpdate> = payload
        .updates
        .into_iter()
        .map(|u| SortUpdate { id: u.id, sort_order: u.sort_order })
        .collect();
    state.pages.reorder(&updates, &caller).await?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/v1/pages/bulk
pub async fn bulk_pages(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<BulkPagesRequest>,
) -> Result<Json<ApiResponse<BulkReport>>, ApiFailure> {
    let report = state
        .pages
        .bulk(&payload.ids, payload.action.into(), &caller)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// POST /api/v1/pages/validate-slug
pub async fn validate_page_slug(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<ValidateSlugRequest>,
) -> Result<Json<ApiResponse<SlugValidation>>, ApiFailure> {
    let validation = state
        .pages
        .validate_slug(&payload.slug, payload.exclude_id, &caller)
        .await?;
    Ok(Json(ApiResponse::success(validation)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let req: UpdatePageRequest = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(req.parent_id, Some(None));
        assert!(req.slug.is_none());

        let req: UpdatePageRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert!(req.parent_id.is_none());
        assert_eq!(req.title.as_deref(), Some("New"));

        let id = Uuid::new_v4();
        let req: UpdatePageRequest =
            serde_json::from_str(&format!(r#"{{"parent_id": "{id}"}}"#)).unwrap();
        assert_eq!(req.parent_id, Some(Some(id)));
    }

    #[test]
    fn test_bulk_action_parses_snake_case() {
        let req: BulkPagesRequest =
            serde_json::from_str(r#"{"ids": [], "action": "unpublish"}"#).unwrap();
        assert!(matches!(req.action, PageAction::Unpublish));
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreatePageRequest =
            serde_json::from_str(r#"{"slug": "about", "title": "x"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CreatePageRequest =
            serde_json::from_str(r#"{"slug": "about", "title": "About"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.visibility, Visibility::Public);
    }
}
