//! Services

pub mod menu_service;
pub mod page_service;

pub use menu_service::{MenuBulkAction, MenuChanges, MenuService, NewMenu};
pub use page_service::{NewPage, PageBulkAction, PageChanges, PageService};

use uuid::Uuid;

/// Outcome of a bulk action: per-item results, never an aborted batch.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BulkReport {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub code: &'static str,
    pub reason: String,
}

/// Pre-flight slug availability result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SlugValidation {
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_slug: Option<String>,
}

impl SlugValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            message: "Slug is available".to_string(),
            suggested_slug: None,
        }
    }

    pub fn rejected(message: String, suggested_slug: Option<String>) -> Self {
        Self {
            is_valid: false,
            message,
            suggested_slug,
        }
    }
}
