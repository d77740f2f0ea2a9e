// ============================================================================
// SiteKit Infrastructure - PostgreSQL Page Repository
// File: crates/sitekit-infrastructure/src/database/postgres/page_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use sitekit_shared::types::Pagination;

use sitekit_core::domain::{EntityKind, Page, PageStatus, Visibility};
use sitekit_core::error::DomainError;
use sitekit_core::repositories::{PageFilter, PageRepository, SortUpdate};

const PAGE_COLUMNS: &str = r#"
    id, parent_id, slug, title, excerpt, sort_order,
    status, visibility, required_permissions, required_roles, feature_flag,
    published_at, created_at, created_by, updated_at, updated_by
"#;

pub struct PgPageRepository {
    pool: PgPool,
}

impl PgPageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct PageRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub sort_order: i32,
    pub status: String,
    pub visibility: String,
    pub required_permissions: Json<Vec<String>>,
    pub required_roles: Json<Vec<String>>,
    pub feature_flag: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            id: row.id,
            parent_id: row.parent_id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            sort_order: row.sort_order,
            status: PageStatus::from_str(&row.status).unwrap_or_default(),
            visibility: Visibility::from_str(&row.visibility).unwrap_or_default(),
            required_permissions: row.required_permissions.0,
            required_roles: row.required_roles.0,
            feature_flag: row.feature_flag,
            published_at: row.published_at,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

fn conflict_from_unique_violation(slug: &str, message: String) -> DomainError {
    if message.contains("unique") || message.contains("duplicate") {
        // A racing writer claimed the slug between the service check and
        // this insert; the suggested fallback may itself need retrying.
        DomainError::SlugConflict {
            slug: slug.to_string(),
            suggested: format!("{slug}-2"),
        }
    } else {
        DomainError::Database(message)
    }
}

#[async_trait]
impl PageRepository for PgPageRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Page>, DomainError> {
        let row: Option<PageRow> = sqlx::query_as(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding page by id: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>, DomainError> {
        let row: Option<PageRow> = sqlx::query_as(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE slug = LOWER($1)"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding page by slug: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        filter: &PageFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Page>, DomainError> {
        let rows: Vec<PageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PAGE_COLUMNS} FROM pages
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR visibility = $2)
              AND ($3::uuid IS NULL OR parent_id = $3)
            ORDER BY sort_order, created_at
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.visibility.map(|v| v.as_str()))
        .bind(filter.parent_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing pages: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_all(&self) -> Result<Vec<Page>, DomainError> {
        let rows: Vec<PageRow> = sqlx::query_as(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages ORDER BY sort_order, created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing all pages: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn live_slugs(&self) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar("SELECT slug FROM pages")
            .fetch_all(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error loading page slugs: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn count_children(&self, id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error counting page children: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn count_siblings(&self, parent_id: Option<Uuid>) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE parent_id IS NOT DISTINCT FROM $1")
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error counting page siblings: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn create(&self, page: &Page) -> Result<Page, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        // The new slug supersedes any redirect parked on it.
        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND old_slug = $2")
            .bind(EntityKind::Page.as_str())
            .bind(&page.slug)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing stale redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;

        let row: PageRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO pages (
                id, parent_id, slug, title, excerpt, sort_order,
                status, visibility, required_permissions, required_roles, feature_flag,
                published_at, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PAGE_COLUMNS}
            "#
        ))
        .bind(page.id)
        .bind(page.parent_id)
        .bind(&page.slug)
        .bind(&page.title)
        .bind(&page.excerpt)
        .bind(page.sort_order)
        .bind(page.status.as_str())
        .bind(page.visibility.as_str())
        .bind(Json(&page.required_permissions))
        .bind(Json(&page.required_roles))
        .bind(&page.feature_flag)
        .bind(page.published_at)
        .bind(page.created_at)
        .bind(page.created_by)
        .bind(page.updated_at)
        .bind(page.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating page: {}", e);
            conflict_from_unique_violation(&page.slug, e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Database error committing page create: {}", e);
            DomainError::Database(e.to_string())
        })?;

        info!("Page persisted: {}", row.id);
        Ok(row.into())
    }

    async fn update(&self, page: &Page) -> Result<Page, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        // The service validated the parent assignment against its own
        // snapshot; serializable isolation plus the re-check below keeps
        // two concurrent reparentings from jointly forming a cycle.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error setting isolation level: {}", e);
                DomainError::Database(e.to_string())
            })?;

        if let Some(parent_id) = page.parent_id {
            let cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors AS (
                    SELECT id, parent_id FROM pages WHERE id = $2
                    UNION ALL
                    SELECT p.id, p.parent_id FROM pages p
                    JOIN ancestors a ON p.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $1)
                "#,
            )
            .bind(page.id)
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error re-checking ancestor chain: {}", e);
                DomainError::Database(e.to_string())
            })?;

            if cycle {
                return Err(DomainError::CircularReference {
                    entity_id: page.id,
                    parent_id,
                });
            }
        }

        let row: PageRow = sqlx::query_as(&format!(
            r#"
            UPDATE pages
            SET
                parent_id = $2,
                title = $3,
                excerpt = $4,
                sort_order = $5,
                status = $6,
                visibility = $7,
                required_permissions = $8,
                required_roles = $9,
                feature_flag = $10,
                published_at = $11,
                updated_at = $12,
                updated_by = $13
            WHERE id = $1
            RETURNING {PAGE_COLUMNS}
            "#
        ))
        .bind(page.id)
        .bind(page.parent_id)
        .bind(&page.title)
        .bind(&page.excerpt)
        .bind(page.sort_order)
        .bind(page.status.as_str())
        .bind(page.visibility.as_str())
        .bind(Json(&page.required_permissions))
        .bind(Json(&page.required_roles))
        .bind(&page.feature_flag)
        .bind(page.published_at)
        .bind(page.updated_at)
        .bind(page.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating page: {}", e);
            DomainError::Database(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Database error committing page update: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn update_slug(
        &self,
        id: &Uuid,
        new_slug: &str,
        redirect_from: Option<String>,
    ) -> Result<Page, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        let row: PageRow = sqlx::query_as(&format!(
            "UPDATE pages SET slug = $2 WHERE id = $1 RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(new_slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error changing page slug: {}", e);
            conflict_from_unique_violation(new_slug, e.to_string())
        })?;

        // The new slug supersedes any redirect parked on it.
        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND old_slug = $2")
            .bind(EntityKind::Page.as_str())
            .bind(new_slug)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing stale redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;

        // Bookkeeping shares the rename's transaction: a lost redirect
        // would silently break published links, so a failure here rolls
        // the rename back.
        if let Some(old_slug) = redirect_from {
            sqlx::query(
                r#"
                INSERT INTO slug_redirects (id, kind, old_slug, entity_id, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (kind, old_slug)
                DO UPDATE SET entity_id = EXCLUDED.entity_id, created_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(EntityKind::Page.as_str())
            .bind(&old_slug)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error recording slug redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing slug change: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn update_orders(&self, updates: &[SortUpdate]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        for update in updates {
            let result = sqlx::query("UPDATE pages SET sort_order = $2 WHERE id = $1")
                .bind(update.id)
                .bind(update.sort_order)
                .execute(&mut *tx)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error reordering pages: {}", e);
                    DomainError::Database(e.to_string())
                })?;

            // Unknown id aborts the whole batch; the dropped transaction
            // rolls every prior order change back.
            if result.rows_affected() == 0 {
                return Err(DomainError::NotFound {
                    kind: EntityKind::Page,
                    id: update.id,
                });
            }
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing page reorder: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE parent_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error counting page children: {}", e);
                    DomainError::Database(e.to_string())
                })?;

        if children > 0 {
            return Err(DomainError::ChildrenExist {
                kind: EntityKind::Page,
                count: children,
            });
        }

        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND entity_id = $2")
            .bind(EntityKind::Page.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing page redirects: {}", e);
                DomainError::Database(e.to_string())
            })?;

        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting page: {}", e);
                DomainError::Database(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound {
                kind: EntityKind::Page,
                id: *id,
            });
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing page delete: {}", e);
            DomainError::Database(e.to_string())
        })?;

        info!("Page deleted: {}", id);
        Ok(())
    }
}
