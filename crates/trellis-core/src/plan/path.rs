//! Canonicalization of plan-declared paths.
//!
//! Every path that appears in a plan is untrusted text from a generator.
//! [`normalize_path`] turns it into a project-relative, `/`-separated path or
//! rejects it outright. Rejections carry no path information.

use thiserror::Error;

/// A path that cannot be mapped safely into a project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("path rejected")]
pub struct PathRejected;

/// Normalize a raw plan path into its canonical relative form.
///
/// Steps, failing on the first violation:
/// 1. Trim, convert `\` to `/`, strip a single leading `./`.
/// 2. Reject empty input, a leading `/`, or a NUL byte.
/// 3. Reject any `..` segment.
/// 4. Collapse repeated slashes and strip a trailing slash.
/// 5. With `as_directory`, reject a final segment containing a `.` anywhere
///    but position 0 (a dotted basename almost always names a file).
///
/// The trailing slash is stripped the same way for files and directories.
pub fn normalize_path(raw: &str, as_directory: bool) -> Result<String, PathRejected> {
    let converted = raw.trim().replace('\\', "/");
    let path = converted.strip_prefix("./").unwrap_or(&converted);

    if path.is_empty() || path.starts_with('/') || path.contains('\0') {
        return Err(PathRejected);
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(PathRejected);
    }

    let canonical = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if as_directory {
        let basename = canonical.rsplit('/').next().unwrap_or(&canonical);
        if basename.char_indices().any(|(i, c)| c == '.' && i > 0) {
            return Err(PathRejected);
        }
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_relative_paths() {
        assert_eq!(normalize_path("src/main.rs", false).unwrap(), "src/main.rs");
        assert_eq!(normalize_path("src", true).unwrap(), "src");
    }

    #[test]
    fn trims_and_converts_backslashes() {
        assert_eq!(
            normalize_path("  src\\lib\\mod.rs \n", false).unwrap(),
            "src/lib/mod.rs"
        );
    }

    #[test]
    fn strips_single_leading_dot_slash() {
        assert_eq!(normalize_path("./src/app.ts", false).unwrap(), "src/app.ts");
        assert_eq!(normalize_path("./src", true).unwrap(), "src");
    }

    #[test]
    fn collapses_repeated_slashes() {
        assert_eq!(normalize_path("src//utils///x.ts", false).unwrap(), "src/utils/x.ts");
    }

    #[test]
    fn strips_trailing_slash_for_both_kinds() {
        assert_eq!(normalize_path("src/components/", true).unwrap(), "src/components");
        assert_eq!(normalize_path("src/components/", false).unwrap(), "src/components");
    }

    #[test]
    fn rejects_parent_segments_for_both_kinds() {
        for as_directory in [false, true] {
            assert_eq!(normalize_path("../etc", as_directory), Err(PathRejected));
            assert_eq!(normalize_path("src/../../x", as_directory), Err(PathRejected));
            assert_eq!(normalize_path("a\\..\\b", as_directory), Err(PathRejected));
        }
    }

    #[test]
    fn rejects_absolute_paths_for_both_kinds() {
        for as_directory in [false, true] {
            assert_eq!(normalize_path("/etc/passwd", as_directory), Err(PathRejected));
            assert_eq!(normalize_path("\\windows", as_directory), Err(PathRejected));
        }
    }

    #[test]
    fn rejects_nul_bytes_for_both_kinds() {
        for as_directory in [false, true] {
            assert_eq!(normalize_path("src/a\0b", as_directory), Err(PathRejected));
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(normalize_path("", false), Err(PathRejected));
        assert_eq!(normalize_path("   ", true), Err(PathRejected));
        assert_eq!(normalize_path("./", false), Err(PathRejected));
    }

    #[test]
    fn dotted_basename_is_not_a_directory() {
        assert_eq!(normalize_path("src/index.ts", true), Err(PathRejected));
        assert_eq!(normalize_path("src/index.ts", false).unwrap(), "src/index.ts");
    }

    #[test]
    fn hidden_directories_are_allowed() {
        assert_eq!(normalize_path(".github/workflows", true).unwrap(), ".github/workflows");
        assert_eq!(normalize_path(".vscode/", true).unwrap(), ".vscode");
    }

    #[test]
    fn dotted_parent_does_not_affect_directory_check() {
        assert_eq!(normalize_path("pkg.v2/src", true).unwrap(), "pkg.v2/src");
    }

    #[test]
    fn double_dot_inside_a_name_is_not_a_parent_segment() {
        assert_eq!(normalize_path("notes..md", false).unwrap(), "notes..md");
    }
}
