//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Permission required to manage (and preview non-published) pages.
pub const PERM_PAGES_MANAGE: &str = "pages:manage";
/// Permission required to manage (and preview inactive) menus.
pub const PERM_MENUS_MANAGE: &str = "menus:manage";

/// Slugs and menu keys that would shadow system routes.
pub const RESERVED_ROUTES: &[&str] = &[
    "api",
    "admin",
    "dashboard",
    "login",
    "logout",
    "register",
    "settings",
    "assets",
    "static",
    "health",
];

/// Upper bound for the `-2`, `-3`, ... suggestion search before giving up.
pub const MAX_SLUG_SUGGESTION_ATTEMPTS: u32 = 200;

pub const MIN_SLUG_LENGTH: usize = 1;
pub const MAX_SLUG_LENGTH: usize = 100;
