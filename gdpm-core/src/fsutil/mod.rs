//! Filesystem helpers with containment guarantees
//!
//! Everything that copies, extracts, links or deletes goes through this
//! module so that symlinks are never traversed and no path escapes the
//! root it was resolved against.

mod atomic;
mod copy;
mod home;
mod link;

pub use atomic::write_atomic;
pub use copy::copy_tree;
pub use home::{abbreviate_home, expand_home};
pub use link::{is_link, remove_path, resolve_link, symlink_dir};

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Lexically normalize a path, dropping `.` and folding `..` where possible.
///
/// Leading `..` components that cannot be folded are preserved so callers
/// can detect an escape.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Join a relative path onto `root`, failing if the result leaves `root`.
///
/// Absolute inputs, `..` escapes and prefixes are rejected.
pub fn join_within(root: &Path, relative: &Path) -> Result<PathBuf> {
    let escape = || Error::PathEscape {
        path: relative.to_path_buf(),
        root: root.to_path_buf(),
    };

    if relative.is_absolute() || relative.has_root() {
        return Err(escape());
    }

    let rel = normalize(relative);
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return Err(escape());
    }

    let root = normalize(root);
    let joined = root.join(rel);
    if !joined.starts_with(&root) {
        return Err(escape());
    }
    Ok(joined)
}

/// Resolve the content root of a plugin nested at `subdir` inside `tree_root`.
///
/// An empty subdir (or one that normalizes to `.`) selects the tree root.
pub fn resolve_subdir(tree_root: &Path, subdir: &str) -> Result<PathBuf> {
    let trimmed = subdir.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(tree_root.to_path_buf());
    }

    let invalid = |reason: &str| Error::InvalidSubdir {
        subdir: subdir.to_string(),
        reason: reason.to_string(),
    };

    let rel = normalize(Path::new(trimmed));
    if rel.as_os_str().is_empty() {
        return Ok(tree_root.to_path_buf());
    }

    let candidate = join_within(tree_root, &rel).map_err(|_| invalid("escapes the source tree"))?;

    let meta = match std::fs::symlink_metadata(&candidate) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(invalid("not found in the source tree"))
        }
        Err(err) => return Err(Error::io("stat", &candidate, err)),
    };
    if meta.file_type().is_symlink() {
        return Err(invalid("is a symlink"));
    }
    if !meta.is_dir() {
        return Err(invalid("is not a directory"));
    }
    Ok(candidate)
}

/// Whether anything (file, directory or dangling link) exists at `path`.
pub fn entry_exists(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::io("stat", path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_join_within_rejects_escapes() {
        let root = Path::new("/project/addons");
        assert!(join_within(root, Path::new("@acme_widget")).is_ok());
        assert!(join_within(root, Path::new("a/../b")).is_ok());
        assert!(join_within(root, Path::new("../outside")).is_err());
        assert!(join_within(root, Path::new("a/../../outside")).is_err());
        assert!(join_within(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_resolve_subdir() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path();
        std::fs::create_dir_all(tree.join("addons/widget")).unwrap();
        std::fs::write(tree.join("README.md"), "x").unwrap();

        assert_eq!(resolve_subdir(tree, "").unwrap(), tree.to_path_buf());
        assert_eq!(resolve_subdir(tree, "/").unwrap(), tree.to_path_buf());
        assert_eq!(
            resolve_subdir(tree, "addons/widget/").unwrap(),
            normalize(&tree.join("addons/widget"))
        );

        let err = resolve_subdir(tree, "../elsewhere").unwrap_err();
        assert!(matches!(err, Error::InvalidSubdir { .. }));
        let err = resolve_subdir(tree, "missing").unwrap_err();
        assert!(err.to_string().contains("not found"));
        let err = resolve_subdir(tree, "README.md").unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
