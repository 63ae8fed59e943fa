//! Safe `.tar.gz` extraction
//!
//! Only regular files and directories are unpacked. Links, absolute paths
//! and `..` components are refused, and the archive must hold exactly one
//! top-level directory, which becomes the materialized tree root.

use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::fsutil;

/// Extract `bytes` into `dest` and return the single root directory
pub fn extract_tar_gz(bytes: &[u8], dest: &Path, label: &str) -> Result<PathBuf> {
    let fail = |reason: String| Error::Materialize {
        locator: label.to_string(),
        reason,
    };

    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| fail(format!("unreadable archive: {e}")))?;

    let mut roots: BTreeSet<OsString> = BTreeSet::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| fail(format!("unreadable archive entry: {e}")))?;
        let kind = entry.header().entry_type();
        if kind.is_pax_global_extensions() || kind.is_pax_local_extensions() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| fail(format!("invalid entry path: {e}")))?
            .into_owned();
        if kind.is_symlink() || kind.is_hard_link() {
            return Err(Error::SymlinkRefused { path });
        }
        let target = fsutil::join_within(dest, &path)?;

        if let Some(Component::Normal(root)) = path.components().next() {
            roots.insert(root.to_os_string());
        }

        if kind.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io("create", &target, e))?;
        } else if kind.is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
            }
            entry
                .unpack(&target)
                .map_err(|e| Error::io("extract", &target, e))?;
        } else {
            tracing::debug!("skipping archive entry {} ({kind:?})", path.display());
        }
    }

    let mut roots = roots.into_iter();
    let (Some(root), None) = (roots.next(), roots.next()) else {
        return Err(fail("archive must contain a single root directory".to_string()));
    };
    let root = dest.join(root);
    if !root.is_dir() {
        return Err(fail("archive root is not a directory".to_string()));
    }
    Ok(root)
}
