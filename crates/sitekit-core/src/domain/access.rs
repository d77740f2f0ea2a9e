// ============================================================================
// SiteKit Core - Access Rules
// File: crates/sitekit-core/src/domain/access.rs
// Description: Caller context and the visibility predicate
// ============================================================================
//! Visibility is a pure conjunction of independent gates: status,
//! authentication, permissions (OR semantics with wildcards), role
//! membership, and feature flag. The caller is always an explicit value
//! threaded through call sites, never ambient state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// The authenticated (or anonymous) caller of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: Option<Uuid>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: None,
            permissions: Vec::new(),
        }
    }

    pub fn authenticated(user_id: Uuid, role: Option<String>, permissions: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id),
            role,
            permissions,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// True if any held permission satisfies `required`, including the
    /// `*:*` and `resource:*` wildcard forms.
    pub fn has_permission(&self, required: &str) -> bool {
        self.permissions
            .iter()
            .any(|held| permission_matches(held, required))
    }

    pub fn has_any_permission(&self, required: &[String]) -> bool {
        required.iter().any(|r| self.has_permission(r))
    }

    pub fn has_role(&self, roles: &[String]) -> bool {
        match &self.role {
            Some(role) => roles.iter().any(|r| r == role),
            None => false,
        }
    }

    /// Gate for mutating operations: 401 before 403.
    pub fn require(&self, permission: &str) -> Result<(), DomainError> {
        if !self.is_authenticated() {
            return Err(DomainError::Unauthenticated);
        }
        if !self.has_permission(permission) {
            return Err(DomainError::PermissionDenied(permission.to_string()));
        }
        Ok(())
    }
}

fn permission_matches(held: &str, required: &str) -> bool {
    if held == "*:*" || held == required {
        return true;
    }
    match (held.split_once(':'), required.split_once(':')) {
        (Some((held_resource, "*")), Some((required_resource, _))) => {
            held_resource == required_resource
        }
        _ => false,
    }
}

/// Feature-flag lookup supplied by configuration; unknown flags are off.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlags(HashMap<String, bool>);

impl FeatureFlags {
    pub fn new(flags: HashMap<String, bool>) -> Self {
        Self(flags)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

impl From<HashMap<String, bool>> for FeatureFlags {
    fn from(flags: HashMap<String, bool>) -> Self {
        Self(flags)
    }
}

/// The gating attributes an entity exposes to the visibility predicate.
#[derive(Debug, Clone, Copy)]
pub struct AccessRule<'a> {
    pub permissions: &'a [String],
    pub roles: &'a [String],
    pub feature_flag: Option<&'a str>,
}

/// Implemented by entities subject to access filtering.
pub trait Guarded {
    fn access_rule(&self) -> AccessRule<'_>;
    /// Published/active for the anonymous viewing context.
    fn is_live(&self) -> bool;
    /// Whether any authenticated caller is required at all.
    fn requires_auth(&self) -> bool;
    /// Permission that grants admin reads (drafts, inactive entries).
    fn manage_permission(&self) -> &'static str;
}

/// Pure visibility predicate; all gates must pass.
pub fn is_visible<E: Guarded>(entity: &E, caller: &CallerContext, flags: &FeatureFlags) -> bool {
    if !entity.is_live() && !caller.has_permission(entity.manage_permission()) {
        return false;
    }
    if entity.requires_auth() && !caller.is_authenticated() {
        return false;
    }
    let rule = entity.access_rule();
    if !rule.permissions.is_empty() && !caller.has_any_permission(rule.permissions) {
        return false;
    }
    if !rule.roles.is_empty() && !caller.has_role(rule.roles) {
        return false;
    }
    if let Some(flag) = rule.feature_flag {
        if !flags.is_enabled(flag) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::page::{Page, Visibility};

    fn caller_with(role: &str, permissions: &[&str]) -> CallerContext {
        CallerContext::authenticated(
            Uuid::new_v4(),
            Some(role.to_string()),
            permissions.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn published_page() -> Page {
        let mut page = Page::new(
            None,
            "about".to_string(),
            "About".to_string(),
            None,
            0,
            Visibility::Public,
            Vec::new(),
            Vec::new(),
            None,
            None,
        )
        .expect("valid page");
        page.publish(None);
        page
    }

    #[test]
    fn test_wildcard_permission_matching() {
        assert!(permission_matches("*:*", "pages:manage"));
        assert!(permission_matches("pages:*", "pages:manage"));
        assert!(permission_matches("pages:manage", "pages:manage"));
        assert!(!permission_matches("menus:*", "pages:manage"));
        assert!(!permission_matches("pages:read", "pages:manage"));
    }

    #[test]
    fn test_anonymous_sees_public_published_only() {
        let caller = CallerContext::anonymous();
        let flags = FeatureFlags::default();

        let page = published_page();
        assert!(is_visible(&page, &caller, &flags));

        let mut draft = published_page();
        draft.unpublish(None);
        assert!(!is_visible(&draft, &caller, &flags));

        let mut private = published_page();
        private.visibility = Visibility::Private;
        assert!(!is_visible(&private, &caller, &flags));
    }

    #[test]
    fn test_manage_permission_unlocks_drafts() {
        let admin = caller_with("Admin", &["pages:manage"]);
        let flags = FeatureFlags::default();
        let mut draft = published_page();
        draft.unpublish(None);
        assert!(is_visible(&draft, &admin, &flags));
    }

    #[test]
    fn test_role_gate_excludes_wrong_role() {
        let flags = FeatureFlags::default();
        let mut page = published_page();
        page.required_roles = vec!["Manager".to_string()];

        assert!(!is_visible(&page, &caller_with("User", &[]), &flags));
        assert!(is_visible(&page, &caller_with("Manager", &[]), &flags));
    }

    #[test]
    fn test_permission_gate_is_any_of() {
        let flags = FeatureFlags::default();
        let mut page = published_page();
        page.required_permissions =
            vec!["reports:read".to_string(), "billing:read".to_string()];

        assert!(is_visible(&page, &caller_with("User", &["billing:read"]), &flags));
        assert!(is_visible(&page, &caller_with("User", &["reports:*"]), &flags));
        assert!(!is_visible(&page, &caller_with("User", &["orders:read"]), &flags));
    }

    #[test]
    fn test_feature_flag_gate() {
        let caller = CallerContext::anonymous();
        let mut page = published_page();
        page.feature_flag = Some("beta_pages".to_string());

        assert!(!is_visible(&page, &caller, &FeatureFlags::default()));

        let flags = FeatureFlags::new(
            [("beta_pages".to_string(), true)].into_iter().collect(),
        );
        assert!(is_visible(&page, &caller, &flags));
    }

    #[test]
    fn test_is_visible_is_pure() {
        let caller = caller_with("User", &["pages:manage"]);
        let flags = FeatureFlags::default();
        let page = published_page();
        let first = is_visible(&page, &caller, &flags);
        let second = is_visible(&page, &caller, &flags);
        assert_eq!(first, second);
    }

    #[test]
    fn test_require_distinguishes_401_from_403() {
        let anonymous = CallerContext::anonymous();
        assert!(matches!(
            anonymous.require("pages:manage"),
            Err(DomainError::Unauthenticated)
        ));

        let user = caller_with("User", &["orders:read"]);
        assert!(matches!(
            user.require("pages:manage"),
            Err(DomainError::PermissionDenied(_))
        ));

        let admin = caller_with("Admin", &["*:*"]);
        assert!(admin.require("pages:manage").is_ok());
    }
}
