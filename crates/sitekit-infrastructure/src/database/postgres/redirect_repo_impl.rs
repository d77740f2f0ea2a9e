// ============================================================================
// SiteKit Infrastructure - PostgreSQL Redirect Repository
// File: crates/sitekit-infrastructure/src/database/postgres/redirect_repo_impl.rs
// ============================================================================
//! Read side of slug redirects. Writes happen inside the page and menu
//! repositories' transactions so bookkeeping stays atomic with renames.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use sitekit_core::domain::EntityKind;
use sitekit_core::error::DomainError;
use sitekit_core::repositories::RedirectRepository;

pub struct PgRedirectRepository {
    pool: PgPool,
}

impl PgRedirectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedirectRepository for PgRedirectRepository {
    async fn find_target(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<Uuid>, DomainError> {
        sqlx::query_scalar(
            "SELECT entity_id FROM slug_redirects WHERE kind = $1 AND old_slug = LOWER($2)",
        )
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error resolving redirect: {}", e);
            DomainError::Database(e.to_string())
        })
    }
}
