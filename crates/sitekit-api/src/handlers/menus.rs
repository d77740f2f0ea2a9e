// ============================================================================
// SiteKit API - Menu Handlers
// File: crates/sitekit-api/src/handlers/menus.rs
// ============================================================================
//! Menu HTTP handlers and their request/response DTOs.

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
use sitekit_core::domain::{Menu, MenuStatus};
use sitekit_core::error::DomainError;
use sitekit_core::repositories::{MenuFilter, SortUpdate};
use sitekit_core::services::{BulkReport, MenuBulkAction, MenuChanges, NewMenu, SlugValidation};
use sitekit_shared::types::Pagination;

use crate::auth::Caller;
use crate::error::ApiFailure;
use crate::handlers::double_option;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Menu DTO for responses
#[derive(Debug, Serialize)]
pub struct MenuDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub menu_key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sort_order: i32,
    pub status: MenuStatus,
    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_flag: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Menu> for MenuDto {
    fn from(menu: Menu) -> Self {
        Self {
            id: menu.id,
            parent_id: menu.parent_id,
            menu_key: menu.menu_key,
            label: menu.label,
            target_url: menu.target_url,
            icon: menu.icon,
            sort_order: menu.sort_order,
            status: menu.status,
            required_permissions: menu.required_permissions,
            required_roles: menu.required_roles,
            feature_flag: menu.feature_flag,
            created_at: menu.created_at,
            updated_at: menu.updated_at,
        }
    }
}

/// Nested tree node DTO
#[derive(Debug, Serialize)]
pub struct MenuTreeDto {
    #[serde(flatten)]
    pub menu: MenuDto,
    pub children: Vec<MenuTreeDto>,
}

impl From<TreeNode<Menu>> for MenuTreeDto {
    fn from(node: TreeNode<Menu>) -> Self {
        Self {
            menu: node.item.into(),
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListMenusQuery {
    pub status: Option<MenuStatus>,
    pub parent_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "Menu key must be between 1 and 100 characters"))]
    pub menu_key: String,
    #[validate(length(min = 2, max = 100, message = "Label must be between 2 and 100 characters"))]
    pub label: String,
    #[validate(length(max = 255, message = "Target URL too long"))]
    pub target_url: Option<String>,
    #[validate(length(max = 100, message = "Icon name too long"))]
    pub icon: Option<String>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMenuRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub menu_key: Option<String>,
    pub label: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub target_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub required_permissions: Option<Vec<String>>,
    pub required_roles: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub feature_flag: Option<Option<String>>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl From<UpdateMenuRequest> for MenuChanges {
    fn from(req: UpdateMenuRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            menu_key: req.menu_key,
            label: req.label,
            target_url: req.target_url,
            icon: req.icon,
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
pub enum MenuAction {
    Activate,
    Deactivate,
    Delete,
}

impl From<MenuAction> for MenuBulkAction {
    fn from(action: MenuAction) -> Self {
        match action {
            MenuAction::Activate => MenuBulkAction::Activate,
            MenuAction::Deactivate => MenuBulkAction::Deactivate,
            MenuAction::Delete => MenuBulkAction::Delete,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkMenusRequest {
    pub ids: Vec<Uuid>,
    pub action: MenuAction,
}

#[derive(Debug, Deserialize)]
pub struct ValidateKeyRequest {
    pub menu_key: String,
    pub exclude_id: Option<Uuid>,
}

/// GET /api/v1/menus
pub async fn list_menus(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<ListMenusQuery>,
) -> Result<Json<ApiResponse<Vec<MenuDto>>>, ApiFailure> {
    let filter = MenuFilter {
        status: query.status,
        parent_id: query.parent_id,
    };
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or_else(|| Pagination::default().per_page),
    };
    let menus = state
        .menus
        .list(&filter, pagination, &caller, &state.flags)
        .await?;
    Ok(Json(ApiResponse::success(
        menus.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/v1/menus/user-menus
pub async fn user_menus(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ApiResponse<Vec<MenuTreeDto>>>, ApiFailure> {
    let tree = state.menus.user_menus(&caller, &state.flags).await?;
    Ok(Json(ApiResponse::success(
        tree.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/v1/menus/slug/{key}
pub async fn resolve_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<MenuDto>>, ApiFailure> {
    let menu = state.menus.resolve_key(&key, &caller, &state.flags).await?;
    Ok(Json(ApiResponse::success(menu.into())))
}

/// POST /api/v1/menus
pub async fn create_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<CreateMenuRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MenuDto>>), ApiFailure> {
    payload.validate().map_err(DomainError::from)?;
    let new = NewMenu {
        parent_id: payload.parent_id,
        menu_key: payload.menu_key,
        label: payload.label,
        target_url: payload.target_url,
        icon: payload.icon,
        required_permissions: payload.required_permissions,
        required_roles: payload.required_roles,
        feature_flag: payload.feature_flag,
    };
    let menu = state.menus.create(new, &caller).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(menu.into()))))
}

/// PATCH /api/v1/menus/{id}
pub async fn update_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuRequest>,
) -> Result<Json<ApiResponse<MenuDto>>, ApiFailure> {
    let menu = state.menus.update(&id, payload.into(), &caller).await?;
    Ok(Json(ApiResponse::success(menu.into())))
}

/// PATCH /api/v1/menus/{id}/activate
pub async fn activate_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MenuDto>>, ApiFailure> {
    let menu = state.menus.activate(&id, &caller).await?;
    Ok(Json(ApiResponse::success(menu.into())))
}

/// PATCH /api/v1/menus/{id}/deactivate
pub async fn deactivate_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MenuDto>>, ApiFailure> {
    let menu = state.menus.deactivate(&id, &caller).await?;
    Ok(Json(ApiResponse::success(menu.into())))
}

/// DELETE /api/v1/menus/{id}
pub async fn delete_menu(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiFailure> {
    state.menus.delete(&id, &caller).await?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/v1/menus/reorder
pub async fn reorder_menus(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ApiResponse<()>>, ApiFailure> {
    let updates: Vec<SortUpdate> = payload
        .updates
        .into_iter()
        .map(|u| SortUpdate { id: u.id, sort_order: u.sort_order })
        .collect();
    state.menus.reorder(&updates, &caller).await?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/v1/menus/bulk
pub async fn bulk_menus(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<BulkMenusRequest>,
) -> Result<Json<ApiResponse<BulkReport>>, ApiFailure> {
    let report = state
        .menus
        .bulk(&payload.ids, payload.action.into(), &caller)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// POST /api/v1/menus/validate-slug
pub async fn validate_menu_key(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<ValidateKeyRequest>,
) -> Result<Json<ApiResponse<SlugValidation>>, ApiFailure> {
    let validation = state
        .menus
        .validate_key(&payload.menu_key, payload.exclude_id, &caller)
        .await?;
    Ok(Json(ApiResponse::success(validation)))
}
