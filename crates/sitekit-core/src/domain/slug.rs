// ============================================================================
// SiteKit Core - Slug Rules
// File: crates/sitekit-core/src/domain/slug.rs
// Description: Slug format, reserved routes, and alternative suggestions
// ============================================================================

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use sitekit_shared::constants::{
    MAX_SLUG_LENGTH, MAX_SLUG_SUGGESTION_ATTEMPTS, RESERVED_ROUTES,
};

use crate::error::DomainError;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern compiles"));

/// Checks URL-safety and length only.
pub fn validate_slug_format(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH || !SLUG_PATTERN.is_match(slug) {
        return Err(DomainError::InvalidSlugFormat(slug.to_string()));
    }
    Ok(())
}

/// Format check plus the reserved system-route list.
pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    validate_slug_format(slug)?;
    if RESERVED_ROUTES.contains(&slug) {
        return Err(DomainError::ReservedRoute(slug.to_string()));
    }
    Ok(())
}

/// First free `base-2`, `base-3`, ... candidate. `taken` must hold
/// lowercase slugs. Falls back to a uuid suffix if the numbered space is
/// exhausted.
pub fn suggest_alternative(base: &str, taken: &HashSet<String>) -> String {
    for n in 2..=MAX_SLUG_SUGGESTION_ATTEMPTS {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) && !RESERVED_ROUTES.contains(&candidate.as_str()) {
            return candidate;
        }
    }
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_formats() {
        for slug in ["about", "about-us", "q1-2025", "a", "123"] {
            assert!(validate_slug(slug).is_ok(), "expected '{slug}' to be valid");
        }
    }

    #[test]
    fn test_invalid_formats() {
        for slug in ["", "About", "two words", "trailing-", "-leading", "a--b", "café", "a_b"] {
            assert!(
                matches!(validate_slug(slug), Err(DomainError::InvalidSlugFormat(_))),
                "expected '{slug}' to be rejected"
            );
        }
    }

    #[test]
    fn test_reserved_routes_rejected() {
        for slug in ["api", "dashboard", "login"] {
            assert!(matches!(
                validate_slug(slug),
                Err(DomainError::ReservedRoute(_))
            ));
        }
    }

    #[test]
    fn test_suggestion_starts_at_two() {
        let taken: HashSet<String> = ["about".to_string()].into_iter().collect();
        assert_eq!(suggest_alternative("about", &taken), "about-2");
    }

    #[test]
    fn test_suggestion_skips_taken_candidates() {
        let taken: HashSet<String> =
            ["about".to_string(), "about-2".to_string(), "about-3".to_string()]
                .into_iter()
                .collect();
        assert_eq!(suggest_alternative("about", &taken), "about-4");
    }
}
