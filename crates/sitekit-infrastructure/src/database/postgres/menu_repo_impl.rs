// ============================================================================
// SiteKit Infrastructure - PostgreSQL Menu Repository
// File: crates/sitekit-infrastructure/src/database/postgres/menu_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use sitekit_shared::types::Pagination;

use sitekit_core::domain::{EntityKind, Menu, MenuStatus};
use sitekit_core::error::DomainError;
use sitekit_core::repositories::{MenuFilter, MenuRepository, SortUpdate};

const MENU_COLUMNS: &str = r#"
    id, parent_id, menu_key, label, target_url, icon, sort_order,
    status, required_permissions, required_roles, feature_flag,
    created_at, created_by, updated_at, updated_by
"#;

pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct MenuRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub menu_key: String,
    pub label: String,
    pub target_url: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub status: String,
    pub required_permissions: Json<Vec<String>>,
    pub required_roles: Json<Vec<String>>,
    pub feature_flag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            id: row.id,
            parent_id: row.parent_id,
            menu_key: row.menu_key,
            label: row.label,
            target_url: row.target_url,
            icon: row.icon,
            sort_order: row.sort_order,
            status: MenuStatus::from_str(&row.status).unwrap_or_default(),
            required_permissions: row.required_permissions.0,
            required_roles: row.required_roles.0,
            feature_flag: row.feature_flag,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

fn conflict_from_unique_violation(key: &str, message: String) -> DomainError {
    if message.contains("unique") || message.contains("duplicate") {
        DomainError::SlugConflict {
            slug: key.to_string(),
            suggested: format!("{key}-2"),
        }
    } else {
        DomainError::Database(message)
    }
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        let row: Option<MenuRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding menu by id: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Menu>, DomainError> {
        let row: Option<MenuRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE menu_key = LOWER($1)"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding menu by key: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        filter: &MenuFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Menu>, DomainError> {
        let rows: Vec<MenuRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MENU_COLUMNS} FROM menus
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR parent_id = $2)
            ORDER BY sort_order, created_at
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.parent_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing menus: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_all(&self) -> Result<Vec<Menu>, DomainError> {
        let rows: Vec<MenuRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus ORDER BY sort_order, created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing all menus: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn live_keys(&self) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar("SELECT menu_key FROM menus")
            .fetch_all(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error loading menu keys: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn count_children(&self, id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error counting menu children: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn count_siblings(&self, parent_id: Option<Uuid>) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE parent_id IS NOT DISTINCT FROM $1")
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error counting menu siblings: {}", e);
                DomainError::Database(e.to_string())
            })
    }

    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        // The new key supersedes any redirect parked on it.
        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND old_slug = $2")
            .bind(EntityKind::Menu.as_str())
            .bind(&menu.menu_key)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing stale redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;

        let row: MenuRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO menus (
                id, parent_id, menu_key, label, target_url, icon, sort_order,
                status, required_permissions, required_roles, feature_flag,
                created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(menu.id)
        .bind(menu.parent_id)
        .bind(&menu.menu_key)
        .bind(&menu.label)
        .bind(&menu.target_url)
        .bind(&menu.icon)
        .bind(menu.sort_order)
        .bind(menu.status.as_str())
        .bind(Json(&menu.required_permissions))
        .bind(Json(&menu.required_roles))
        .bind(&menu.feature_flag)
        .bind(menu.created_at)
        .bind(menu.created_by)
        .bind(menu.updated_at)
        .bind(menu.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating menu: {}", e);
            conflict_from_unique_violation(&menu.menu_key, e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Database error committing menu create: {}", e);
            DomainError::Database(e.to_string())
        })?;

        info!("Menu persisted: {}", row.id);
        Ok(row.into())
    }

    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        // Same transactional cycle re-check as the page repository.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error setting isolation level: {}", e);
                DomainError::Database(e.to_string())
            })?;

        if let Some(parent_id) = menu.parent_id {
            let cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors AS (
                    SELECT id, parent_id FROM menus WHERE id = $2
                    UNION ALL
                    SELECT m.id, m.parent_id FROM menus m
                    JOIN ancestors a ON m.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $1)
                "#,
            )
            .bind(menu.id)
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error re-checking ancestor chain: {}", e);
                DomainError::Database(e.to_string())
            })?;

            if cycle {
                return Err(DomainError::CircularReference {
                    entity_id: menu.id,
                    parent_id,
                });
            }
        }

        let row: MenuRow = sqlx::query_as(&format!(
            r#"
            UPDATE menus
            SET
                parent_id = $2,
                label = $3,
                target_url = $4,
                icon = $5,
                sort_order = $6,
                status = $7,
                required_permissions = $8,
                required_roles = $9,
                feature_flag = $10,
                updated_at = $11,
                updated_by = $12
            WHERE id = $1
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(menu.id)
        .bind(menu.parent_id)
        .bind(&menu.label)
        .bind(&menu.target_url)
        .bind(&menu.icon)
        .bind(menu.sort_order)
        .bind(menu.status.as_str())
        .bind(Json(&menu.required_permissions))
        .bind(Json(&menu.required_roles))
        .bind(&menu.feature_flag)
        .bind(menu.updated_at)
        .bind(menu.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating menu: {}", e);
            DomainError::Database(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Database error committing menu update: {}", e);
            DomainError::Database(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn update_key(
        &self,
        id: &Uuid,
        new_key: &str,
        redirect_from: Option<String>,
    ) -> Result<Menu, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::Database(e.to_string())
        })?;

        let row: MenuRow = sqlx::query_as(&format!(
            "UPDATE menus SET menu_key = $2 WHERE id = $1 RETURNING {MENU_COLUMNS}"
        ))
        .bind(id)
        .bind(new_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error changing menu key: {}", e);
            conflict_from_unique_violation(new_key, e.to_string())
        })?;

        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND old_slug = $2")
            .bind(EntityKind::Menu.as_str())
            .bind(new_key)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing stale redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;

        if let Some(old_key) = redirect_from {
            sqlx::query(
                r#"
                INSERT INTO slug_redirects (id, kind, old_slug, entity_id, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (kind, old_slug)
                DO UPDATE SET entity_id = EXCLUDED.entity_id, created_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(EntityKind::Menu.as_str())
            .bind(&old_key)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error recording key redirect: {}", e);
                DomainError::Database(e.to_string())
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing key change: {}", e);
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
            let result = sqlx::query("UPDATE menus SET sort_order = $2 WHERE id = $1")
                .bind(update.id)
                .bind(update.sort_order)
                .execute(&mut *tx)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error reordering menus: {}", e);
                    DomainError::Database(e.to_string())
                })?;

            if result.rows_affected() == 0 {
                return Err(DomainError::NotFound {
                    kind: EntityKind::Menu,
                    id: update.id,
                });
            }
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing menu reorder: {}", e);
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
            sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE parent_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error counting menu children: {}", e);
                    DomainError::Database(e.to_string())
                })?;

        if children > 0 {
            return Err(DomainError::ChildrenExist {
                kind: EntityKind::Menu,
                count: children,
            });
        }

        sqlx::query("DELETE FROM slug_redirects WHERE kind = $1 AND entity_id = $2")
            .bind(EntityKind::Menu.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error clearing menu redirects: {}", e);
                DomainError::Database(e.to_string())
            })?;

        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting menu: {}", e);
                DomainError::Database(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound {
                kind: EntityKind::Menu,
                id: *id,
            });
        }

        tx.commit().await.map_err(|e| {
            error!("Database error committing menu delete: {}", e);
            DomainError::Database(e.to_string())
        })?;

        info!("Menu deleted: {}", id);
        Ok(())
    }
}
