use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Write `contents` to `path` through a temp file in the same directory.
///
/// Readers observe either the old or the new document, never a partial one.
/// The existing file's permissions are carried over. Where rename cannot
/// replace an existing file, the destination is removed and the rename is
/// retried once.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let permissions = std::fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp = tempfile::Builder::new()
        .prefix(".gdpm-")
        .tempfile_in(parent)
        .map_err(|e| Error::io("create temp file in", parent, e))?;

    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| Error::io("write", temp.path().to_path_buf(), e))?;

    if let Some(perm) = permissions {
        std::fs::set_permissions(temp.path(), perm)
            .map_err(|e| Error::io("set permissions on", temp.path().to_path_buf(), e))?;
    }

    match temp.persist(path) {
        Ok(_) => Ok(()),
        Err(err) if cfg!(windows) => {
            tracing::debug!("rename onto {} failed, retrying after removal", path.display());
            let _ = std::fs::remove_file(path);
            err.file
                .persist(path)
                .map(|_| ())
                .map_err(|e| Error::io("rename onto", path, e.error))
        }
        Err(err) => Err(Error::io("rename onto", path, err.error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gdpm.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        // No temp files are left behind
        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".gdpm-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("project.godot");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        write_atomic(&path, b"new").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
