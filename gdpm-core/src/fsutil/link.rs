use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Create a directory link at `link` pointing at `target`.
///
/// Windows falls back to a directory junction when the user lacks the
/// symlink privilege.
pub fn symlink_dir(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| Error::io("symlink", link, e))
    }

    #[cfg(windows)]
    {
        match std::os::windows::fs::symlink_dir(target, link) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!("symlink failed ({err}), creating junction instead");
                let output = std::process::Command::new("cmd")
                    .arg("/c")
                    .arg("mklink")
                    .arg("/J")
                    .arg(link)
                    .arg(target)
                    .output()
                    .map_err(|e| Error::io("run mklink for", link, e))?;
                if output.status.success() {
                    return Ok(());
                }
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::io(
                    "create junction",
                    link,
                    std::io::Error::other(stderr.trim().to_string()),
                ))
            }
        }
    }
}

/// Whether `path` is a symlink (or junction).
pub fn is_link(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink() || is_junction(&m))
        .unwrap_or(false)
}

#[cfg(windows)]
fn is_junction(meta: &std::fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
    meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_junction(_meta: &std::fs::Metadata) -> bool {
    false
}

/// Follow every link in `path` and return the physical location, if any.
pub fn resolve_link(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

/// Remove whatever occupies `path` without ever following a link.
///
/// Links are unlinked (their targets stay untouched), directories are
/// removed recursively, and a missing path is not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(Error::io("stat", path, err)),
    };

    let result = if meta.file_type().is_symlink() || is_junction(&meta) {
        // Directory links on Windows are removed like directories
        std::fs::remove_file(path).or_else(|_| std::fs::remove_dir(path))
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| Error::io("remove", path, e))?;

    tracing::debug!("removed {}", path.display());
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_path_keeps_link_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("work");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("plugin.cfg"), "[plugin]\n").unwrap();

        let link = temp.path().join("addons_link");
        symlink_dir(&target, &link).unwrap();
        assert!(is_link(&link));
        assert_eq!(
            resolve_link(&link).unwrap(),
            std::fs::canonicalize(&target).unwrap()
        );

        remove_path(&link).unwrap();
        assert!(!link.exists());
        assert!(target.join("plugin.cfg").exists());
    }

    #[test]
    fn test_remove_path_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_path(&temp.path().join("nothing")).unwrap();
    }

    #[test]
    fn test_remove_path_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("addons/@acme_widget");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/file.gd"), "x").unwrap();

        remove_path(&dir).unwrap();
        assert!(!dir.exists());
    }
}
