// ============================================================================
// SiteKit Core - Menu Entity
// File: crates/sitekit-core/src/domain/menu.rs
// Description: Dashboard navigation item with hierarchy and access gating
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sitekit_shared::constants::PERM_MENUS_MANAGE;

use crate::domain::access::{AccessRule, Guarded};
use crate::domain::hierarchy::TreeItem;

/// Menu activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MenuStatus {
    #[default]
    Active,
    Inactive,
}

impl MenuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuStatus::Active => "active",
            MenuStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MenuStatus::Active),
            "inactive" => Some(MenuStatus::Inactive),
            _ => None,
        }
    }
}

/// Menu entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Menu {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Menu key must be between 1 and 100 characters"))]
    pub menu_key: String,

    #[validate(length(min = 2, max = 100, message = "Label must be between 2 and 100 characters"))]
    pub label: String,

    #[validate(length(max = 255, message = "Target URL too long"))]
    pub target_url: Option<String>,

    #[validate(length(max = 100, message = "Icon name too long"))]
    pub icon: Option<String>,

    pub sort_order: i32,
    pub status: MenuStatus,

    pub required_permissions: Vec<String>,
    pub required_roles: Vec<String>,
    pub feature_flag: Option<String>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl Menu {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent_id: Option<Uuid>,
        menu_key: String,
        label: String,
        target_url: Option<String>,
        icon: Option<String>,
        sort_order: i32,
        required_permissions: Vec<String>,
        required_roles: Vec<String>,
        feature_flag: Option<String>,
        created_by: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        let menu = Self {
            id: Uuid::new_v4(),
            parent_id,
            menu_key: menu_key.trim().to_lowercase(),
            label: label.trim().to_string(),
            target_url: target_url.map(|u| u.trim().to_string()),
            icon: icon.map(|i| i.trim().to_string()),
            sort_order,
            status: MenuStatus::Active,
            required_permissions,
            required_roles,
            feature_flag,
            created_at: Utc::now(),
            created_by,
            updated_at: None,
            updated_by: None,
        };

        menu.validate()?;
        Ok(menu)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.status == MenuStatus::Active
    }

    pub fn activate(&mut self, activated_by: Option<Uuid>) {
        self.status = MenuStatus::Active;
        self.touch(activated_by);
    }

    pub fn deactivate(&mut self, deactivated_by: Option<Uuid>) {
        self.status = MenuStatus::Inactive;
        self.touch(deactivated_by);
    }

    pub fn touch(&mut self, updated_by: Option<Uuid>) {
        self.updated_at = Some(Utc::now());
        self.updated_by = updated_by;
    }
}

impl TreeItem for Menu {
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

impl Guarded for Menu {
    fn access_rule(&self) -> AccessRule<'_> {
        AccessRule {
            permissions: &self.required_permissions,
            roles: &self.required_roles,
            feature_flag: self.feature_flag.as_deref(),
        }
    }

    fn is_live(&self) -> bool {
        self.is_active()
    }

    // Menus are admin-facing; anonymous callers never see them.
    fn requires_auth(&self) -> bool {
        true
    }

    fn manage_permission(&self) -> &'static str {
        PERM_MENUS_MANAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_menu() {
        let menu = Menu::new(
            None,
            "Dashboard".to_string(),
            "Dashboard".to_string(),
            Some("/dashboard".to_string()),
            Some("home".to_string()),
            0,
            Vec::new(),
            Vec::new(),
            None,
            None,
        );
        let menu = menu.expect("valid menu");
        assert!(menu.is_root());
        assert!(menu.is_active());
        assert_eq!(menu.menu_key, "dashboard");
    }

    #[test]
    fn test_create_menu_rejects_short_label() {
        let menu = Menu::new(
            None,
            "reports".to_string(),
            "r".to_string(),
            None,
            None,
            0,
            Vec::new(),
            Vec::new(),
            None,
            None,
        );
        assert!(menu.is_err());
    }

    #[test]
    fn test_activate_deactivate() {
        let mut menu = Menu::new(
            None,
            "reports".to_string(),
            "Reports".to_string(),
            None,
            None,
            0,
            Vec::new(),
            Vec::new(),
            None,
            None,
        )
        .expect("valid menu");

        menu.deactivate(None);
        assert!(!menu.is_active());
        assert!(menu.updated_at.is_some());

        menu.activate(None);
        assert!(menu.is_active());
    }
}
