use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Recursively copy `src` into `dst`, refusing symlinks anywhere in the tree.
///
/// Files are created exclusively, so copying over existing content fails
/// instead of silently merging.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let root_meta =
        std::fs::symlink_metadata(src).map_err(|e| Error::io("stat", src, e))?;
    if root_meta.file_type().is_symlink() {
        return Err(Error::SymlinkRefused {
            path: src.to_path_buf(),
        });
    }
    if !root_meta.is_dir() {
        return copy_file(src, dst);
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            Error::io("walk", path, io)
        })?;

        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::PathEscape {
                path: entry.path().to_path_buf(),
                root: src.to_path_buf(),
            })?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            return Err(Error::SymlinkRefused {
                path: entry.path().to_path_buf(),
            });
        }
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io("create", &target, e))?;
            continue;
        }
        copy_file(entry.path(), &target)?;
    }
    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
    }

    let mut input = std::fs::File::open(src).map_err(|e| Error::io("open", src, e))?;
    let perm = input
        .metadata()
        .map_err(|e| Error::io("stat", src, e))?
        .permissions();

    let mut output = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| Error::io("create", dst, e))?;

    std::io::copy(&mut input, &mut output).map_err(|e| Error::io("copy to", dst, e))?;
    std::fs::set_permissions(dst, perm).map_err(|e| Error::io("set permissions on", dst, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("scripts/nested")).unwrap();
        std::fs::write(src.join("plugin.cfg"), "[plugin]\n").unwrap();
        std::fs::write(src.join("scripts/nested/main.gd"), "extends Node\n").unwrap();

        let dst = temp.path().join("addons/@acme_widget");
        copy_tree(&src, &dst).unwrap();

        assert!(dst.join("plugin.cfg").is_file());
        assert_eq!(
            std::fs::read_to_string(dst.join("scripts/nested/main.gd")).unwrap(),
            "extends Node\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_refuses_symlinks() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(temp.path().join("secret"), "x").unwrap();
        std::os::unix::fs::symlink(temp.path().join("secret"), src.join("leak")).unwrap();

        let err = copy_tree(&src, &temp.path().join("dst")).unwrap_err();
        assert!(matches!(err, Error::SymlinkRefused { .. }));
    }
}
