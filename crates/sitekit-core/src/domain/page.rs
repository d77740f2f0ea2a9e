// ============================================================================
// SiteKit Core - Page Entity
// File: crates/sitekit-core/src/domain/page.rs
// Description: Hierarchical site page with publish workflow and access gating
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sitekit_shared::constants::PERM_PAGES_MANAGE;

use crate::domain::access::{AccessRule, Guarded};
use crate::domain::hierarchy::TreeItem;

/// Page lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
            PageStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PageStatus::Draft),
            "published" => Some(PageStatus::Published),
            "archived" => Some(PageStatus::Archived),
            _ => None,
        }
    }
}

/// Anonymous-access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Page entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Page {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    pub slug: String,

    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Excerpt too long"))]
    pub excerpt: Option<String>,

    pub sort_order: i32,
    pub status: PageStatus,
    pub visibility: Visibility,

    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,

    pub published_at: Option<DateTime<Utc>>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl Page {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent_id: Option<Uuid>,
        slug: String,
        title: String,
        excerpt: Option<String>,
        sort_order: i32,
        visibility: Visibility,
        required_permissions: Vec<String>,
        required_roles: Vec<String>,
        feature_flag: Option<String>,
        created_by: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        let page = Self {
            id: Uuid::new_v4(),
            parent_id,
            slug: slug.trim().to_lowercase(),
            title: title.trim().to_string(),
            excerpt: excerpt.map(|e| e.trim().to_string()),
            sort_order,
            status: PageStatus::Draft,
            visibility,
            required_permissions,
            required_roles,
            feature_flag,
            published_at: None,
            created_at: Utc::now(),
            created_by,
            updated_at: None,
            updated_by: None,
        };

        page.validate()?;
        Ok(page)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }

    pub fn publish(&mut self, published_by: Option<Uuid>) {
        self.status = PageStatus::Published;
        if self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
        self.touch(published_by);
    }

    pub fn unpublish(&mut self, unpublished_by: Option<Uuid>) {
        self.status = PageStatus::Draft;
        self.published_at = None;
        self.touch(unpublished_by);
    }

    pub fn archive(&mut self, archived_by: Option<Uuid>) {
        self.status = PageStatus::Archived;
        self.touch(archived_by);
    }

    pub fn touch(&mut self, updated_by: Option<Uuid>) {
        self.updated_at = Some(Utc::now());
        self.updated_by = updated_by;
    }
}

impl TreeItem for Page {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Guarded for Page {
    fn access_rule(&self) -> AccessRule<'_> {
        AccessRule {
            permissions: &self.required_permissions,
            roles: &self.required_roles,
            feature_flag: self.feature_flag.as_deref(),
        }
    }

    fn is_live(&self) -> bool {
        self.is_published()
    }

    fn requires_auth(&self) -> bool {
        self.visibility == Visibility::Private
    }

    fn manage_permission(&self) -> &'static str {
        PERM_PAGES_MANAGE
    }
}
