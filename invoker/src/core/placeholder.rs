//! Placeholder substitution for per-item configuration values.
//!
//! Substitution is literal: neither the placeholder nor the item is treated as
//! a pattern, so items like `1.0.*` or `a$b` are inserted verbatim.

use std::path::{Path, PathBuf};

/// Default placeholder token.
pub const DEFAULT_PLACEHOLDER: &str = "@item@";

/// Replace every occurrence of `placeholder` in `value` with `item`.
///
/// An empty placeholder leaves `value` unchanged.
pub fn replace_placeholder(value: &str, placeholder: &str, item: &str) -> String {
    if placeholder.is_empty() {
        return value.to_string();
    }
    value.replace(placeholder, item)
}

/// Resolve the working directory for `item`.
///
/// Returns `None` when no base directory is configured, the base unchanged
/// when it does not mention the placeholder, and a fresh path with every
/// occurrence replaced otherwise.
pub fn resolve_working_directory(
    base: Option<&Path>,
    placeholder: &str,
    item: &str,
) -> Option<PathBuf> {
    let base = base?;
    let raw = base.to_string_lossy();
    if placeholder.is_empty() || !raw.contains(placeholder) {
        return Some(base.to_path_buf());
    }
    Some(PathBuf::from(replace_placeholder(&raw, placeholder, item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_placeholder_in_working_directory() {
        let resolved = resolve_working_directory(Some(Path::new("/build/{item}")), "{item}", "v1");
        assert_eq!(resolved, Some(PathBuf::from("/build/v1")));
    }

    #[test]
    fn working_directory_without_placeholder_is_unchanged() {
        let resolved = resolve_working_directory(Some(Path::new("/build/fixed")), "{item}", "v1");
        assert_eq!(resolved, Some(PathBuf::from("/build/fixed")));
    }

    #[test]
    fn missing_working_directory_passes_through() {
        assert_eq!(resolve_working_directory(None, "{item}", "v1"), None);
    }

    #[test]
    fn replaces_every_occurrence() {
        let resolved = resolve_working_directory(
            Some(Path::new("/build/@item@/target-@item@")),
            DEFAULT_PLACEHOLDER,
            "core",
        );
        assert_eq!(resolved, Some(PathBuf::from("/build/core/target-core")));
    }

    #[test]
    fn item_with_pattern_characters_is_inserted_verbatim() {
        assert_eq!(
            replace_placeholder("-Dversion=@item@", DEFAULT_PLACEHOLDER, "1.0.$1.*"),
            "-Dversion=1.0.$1.*"
        );
        assert_eq!(replace_placeholder("a.b", ".", "x"), "axb");
    }

    #[test]
    fn empty_placeholder_is_a_no_op() {
        assert_eq!(replace_placeholder("clean", "", "v1"), "clean");
    }
}
