//! Lexical containment checks against the project root.
//!
//! Resolution never touches the filesystem, so a target that does not exist
//! yet can still be checked before anything is written.

use std::path::{Component, Path, PathBuf};

use super::MaterializeError;

/// Make `root` absolute and lexically normalized.
pub fn absolute_root(root: &Path) -> Result<PathBuf, MaterializeError> {
    let absolute = std::path::absolute(root).map_err(|source| MaterializeError::ProjectRoot {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(lexical_normalize(&absolute))
}

/// Resolve `relative` against an absolute, normalized `root`.
///
/// Returns `None` when the result is not `root` itself or a descendant of it.
/// An absolute `relative` replaces `root` entirely and is rejected unless it
/// happens to point inside.
pub fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = lexical_normalize(&root.join(relative));
    candidate.starts_with(root).then_some(candidate)
}

/// Fold `.` and `..` components without consulting the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/work/project")
    }

    #[test]
    fn plain_relative_path_is_inside() {
        assert_eq!(
            resolve_within(&root(), "src/main.rs"),
            Some(PathBuf::from("/work/project/src/main.rs"))
        );
    }

    #[test]
    fn dot_segments_fold() {
        assert_eq!(
            resolve_within(&root(), "./src/../lib/x.rs"),
            Some(PathBuf::from("/work/project/lib/x.rs"))
        );
    }

    #[test]
    fn escaping_paths_are_rejected() {
        assert_eq!(resolve_within(&root(), "../../etc/passwd"), None);
        assert_eq!(resolve_within(&root(), "src/../../sibling"), None);
        assert_eq!(resolve_within(&root(), "/etc/passwd"), None);
    }

    #[test]
    fn sibling_with_shared_prefix_is_rejected() {
        // Component-wise comparison: "/work/project-evil" is not under "/work/project".
        assert_eq!(resolve_within(&root(), "../project-evil/x"), None);
    }

    #[test]
    fn root_itself_is_inside() {
        assert_eq!(resolve_within(&root(), "."), Some(root()));
    }

    #[test]
    fn absolute_root_normalizes() {
        let resolved = absolute_root(Path::new("/work/./project/sub/..")).unwrap();
        assert_eq!(resolved, root());
    }

    #[test]
    fn relative_root_becomes_absolute() {
        let resolved = absolute_root(Path::new("some/dir")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/dir"));
    }
}
