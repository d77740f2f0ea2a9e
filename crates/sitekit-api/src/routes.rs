//! Router construction

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{health, menus, pages};
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/pages", page_routes())
        .nest("/api/v1/menus", menu_routes())
        .with_state(state)
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list_pages).post(pages::create_page))
        .route("/hierarchy", get(pages::page_tree))
        .route("/slug/{slug}", get(pages::resolve_page))
        .route("/reorder", post(pages::reorder_pages))
        .route("/bulk", post(pages::bulk_pages))
        .route("/validate-slug", post(pages::validate_page_slug))
        .route("/{id}", patch(pages::update_page).delete(pages::delete_page))
        .route("/{id}/publish", patch(pages::publish_page))
        .route("/{id}/unpublish", patch(pages::unpublish_page))
        .route("/{id}/archive", patch(pages::archive_page))
}

fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menus::list_menus).post(menus::create_menu))
        .route("/user-menus", get(menus::user_menus))
        .route("/slug/{key}", get(menus::resolve_menu))
        .route("/reorder", post(menus::reorder_menus))
        .route("/bulk", post(menus::bulk_menus))
        .route("/validate-slug", post(menus::validate_menu_key))
        .route("/{id}", patch(menus::update_menu).delete(menus::delete_menu))
        .route("/{id}/activate", patch(menus::activate_menu))
        .route("/{id}/deactivate", patch(menus::deactivate_menu))
}
