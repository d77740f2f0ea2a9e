//! Utility functions

use uuid::Uuid;

pub fn is_valid_uuid(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

/// Turns free text into a URL-safe slug candidate: lowercase, runs of
/// non-alphanumerics collapsed into single hyphens, trimmed at both ends.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_hyphen = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  About / Us  "), "about-us");
        assert_eq!(slugify("Q1 2025 Report!"), "q1-2025-report");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("--a---b--"), "a-b");
        assert_eq!(slugify("***"), "");
    }
}
