use std::path::Path;

use super::{Change, Report};
use crate::error::Result;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::project::{find_godot_root, find_manifest_root};

/// Create an empty manifest for the project containing `start`.
///
/// Does nothing when a manifest already exists at or above `start`. The new
/// file goes next to the nearest `project.godot`, or into `start` itself.
pub fn init_project(start: &Path) -> Result<Report> {
    let mut report = Report::default();
    if let Some(root) = find_manifest_root(start) {
        tracing::info!("gdpm.json already exists in {}", root.display());
        return Ok(report);
    }

    let root = find_godot_root(start).unwrap_or_else(|| start.to_path_buf());
    let path = root.join(MANIFEST_FILE);
    Manifest::default().save_to_path(&path)?;
    report.push(Change::ManifestCreated { path });
    Ok(report)
}
