// ============================================================================
// SiteKit Core - Slug Redirect Entity
// File: crates/sitekit-core/src/domain/redirect.rs
// Description: Old-slug to entity mapping kept across renames
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two kinds of navigable entities sharing the tree/slug machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Page,
    Menu,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Menu => "menu",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "page" => Some(EntityKind::Page),
            "menu" => Some(EntityKind::Menu),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redirect record: every historical slug of an entity maps directly to its
/// id, so chains of renames resolve in a single lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugRedirect {
    pub id: Uuid,
    pub kind: EntityKind,
    pub old_slug: String,
    pub entity_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl SlugRedirect {
    pub fn new(kind: EntityKind, old_slug: String, entity_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            old_slug: old_slug.trim().to_lowercase(),
            entity_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(EntityKind::from_str("page"), Some(EntityKind::Page));
        assert_eq!(EntityKind::from_str("menu"), Some(EntityKind::Menu));
        assert_eq!(EntityKind::from_str("post"), None);
        assert_eq!(EntityKind::Page.as_str(), "page");
    }

    #[test]
    fn test_redirect_normalizes_slug() {
        let r = SlugRedirect::new(EntityKind::Page, "  Old-Slug ".to_string(), Uuid::new_v4());
        assert_eq!(r.old_slug, "old-slug");
    }
}
