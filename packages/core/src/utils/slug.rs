//! Slug derivation for slug-deriving field resolvers

use regex::Regex;
use std::sync::LazyLock;

/// Apostrophes are dropped rather than turned into separators
static APOSTROPHE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"['’`]").unwrap());

/// Any run of characters outside lower-case ASCII words
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lower-case ASCII words joined by `-`
///
/// ```text
/// "My category's title"  -> "my-categorys-title"
/// "  Rust & WebAssembly " -> "rust-webassembly"
/// ```
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let without_apostrophes = APOSTROPHE_RE.replace_all(&lowered, "");
    SEPARATOR_RE
        .replace_all(&without_apostrophes, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_drops_apostrophes() {
        assert_eq!(slugify("My category's title"), "my-categorys-title");
        assert_eq!(slugify("Don’t panic"), "dont-panic");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Rust & WebAssembly "), "rust-webassembly");
        assert_eq!(slugify("2024 -- Year in review!"), "2024-year-in-review");
    }

    #[test]
    fn test_slugify_empty_input() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
