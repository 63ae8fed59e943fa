//! Reconciliation orchestrator
//!
//! Each operation loads the manifest, mutates the filesystem, persists the
//! manifest and finally edits `project.godot`, always in that order. The
//! manifest is only saved once the filesystem state it describes has been
//! validated, so a crash mid-way can be fixed by re-running the command.

mod add;
mod alias;
mod init;
mod install;
mod link;
mod list;
mod remove;
mod unlink;

pub use init::init_project;
pub use link::LinkRequest;
pub use list::{PluginState, PluginStatus};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::addon::{self, AddonDirName};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::manifest::Manifest;
use crate::project::ProjectLayout;
use crate::source::{Materializer, Resolver, SourceLocator};
use crate::spec::PluginKey;

/// One user-visible effect of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Installed { key: PluginKey, dir: String },
    Removed { dir: String },
    Linked { dir: String, target: String },
    Unlinked { dir: String },
    Enabled { resource: String },
    Disabled { resource: String },
    AutoloadRewritten { from: String, to: String },
    ManifestUpdated { key: PluginKey, version: String },
    ManifestCreated { path: PathBuf },
    Forgotten { key: PluginKey },
    Skipped { key: PluginKey, reason: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Installed { key, dir } => write!(f, "installed {key} into {dir}"),
            Change::Removed { dir } => write!(f, "removed {dir}"),
            Change::Linked { dir, target } => write!(f, "linked {dir} -> {target}"),
            Change::Unlinked { dir } => write!(f, "unlinked {dir}"),
            Change::Enabled { resource } => write!(f, "enabled {resource}"),
            Change::Disabled { resource } => write!(f, "disabled {resource}"),
            Change::AutoloadRewritten { from, to } => {
                write!(f, "rewrote autoload paths {from} -> {to}")
            }
            Change::ManifestUpdated { key, version } if version.is_empty() => {
                write!(f, "updated {key} in gdpm.json")
            }
            Change::ManifestUpdated { key, version } => {
                write!(f, "updated {key}@{version} in gdpm.json")
            }
            Change::ManifestCreated { path } => write!(f, "created {}", path.display()),
            Change::Forgotten { key } => write!(f, "removed {key} from gdpm.json"),
            Change::Skipped { key, reason } => write!(f, "skipped {key} ({reason})"),
        }
    }
}

/// Ordered list of the effects of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub changes: Vec<Change>,
}

impl Report {
    pub fn push(&mut self, change: Change) {
        tracing::debug!("{change}");
        self.changes.push(change);
    }

    pub fn extend(&mut self, other: Report) {
        self.changes.extend(other.changes);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Drives every state transition of one project
pub struct Reconciler {
    layout: ProjectLayout,
    resolver: Box<dyn Resolver>,
    materializer: Box<dyn Materializer>,
}

impl Reconciler {
    pub fn new(
        layout: ProjectLayout,
        resolver: impl Resolver + 'static,
        materializer: impl Materializer + 'static,
    ) -> Self {
        Self {
            layout,
            resolver: Box::new(resolver),
            materializer: Box::new(materializer),
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    fn load_manifest(&self) -> Result<Manifest> {
        Manifest::load_from_path(&self.layout.manifest_path())
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        manifest.save_to_path(&self.layout.manifest_path())
    }

    /// Enable `name`'s descriptor and record it when something changed
    fn enable(&self, name: &AddonDirName, report: &mut Report) -> Result<()> {
        let resource = name.descriptor_resource();
        if self.layout.set_editor_plugin_enabled(&resource, true)? {
            report.push(Change::Enabled { resource });
        }
        Ok(())
    }

    fn disable(&self, name: &AddonDirName, report: &mut Report) -> Result<()> {
        let resource = name.descriptor_resource();
        if self.layout.set_editor_plugin_enabled(&resource, false)? {
            report.push(Change::Disabled { resource });
        }
        Ok(())
    }

    /// Materialize `locator` and copy its content root into `addons/<name>`.
    ///
    /// Nothing under `addons/` is touched until the source tree is known to
    /// hold a descriptor. The temp directory is dropped on every path.
    async fn place_copy(&self, locator: &SourceLocator, name: &AddonDirName) -> Result<()> {
        let temp = tempfile::Builder::new()
            .prefix("gdpm-")
            .tempdir()
            .map_err(|e| Error::io("create temp dir in", std::env::temp_dir(), e))?;

        let tree = self.materializer.materialize(locator, temp.path()).await?;
        let content = fsutil::resolve_subdir(&tree, locator.subdir())?;
        addon::require_descriptor(
            &content,
            "the source must contain plugin.cfg at its root or declared subdir",
        )?;

        let addons = self.layout.addons_dir();
        std::fs::create_dir_all(&addons).map_err(|e| Error::io("create", &addons, e))?;

        let dest = self.layout.addon_path(name);
        fsutil::remove_path(&dest)?;

        if let Err(err) = fsutil::copy_tree(&content, &dest) {
            rollback(&dest);
            return Err(err);
        }
        if let Err(err) = addon::require_descriptor(&dest, "copy did not produce a plugin root") {
            rollback(&dest);
            return Err(err);
        }

        tracing::debug!("copied {} into {}", content.display(), dest.display());
        Ok(())
    }

    /// Turn a user- or manifest-supplied local path into an absolute one.
    ///
    /// `~` expands to the home directory; relative paths are taken from the
    /// project root.
    fn absolute_local_path(&self, raw: &str) -> Result<PathBuf> {
        let expanded = fsutil::expand_home(raw)?;
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.layout.root().join(expanded)
        };
        Ok(fsutil::normalize(&absolute))
    }
}

/// Delete a just-created destination after a failed validation
fn rollback(dest: &Path) {
    tracing::warn!("rolling back {}", dest.display());
    if let Err(err) = fsutil::remove_path(dest) {
        tracing::warn!("rollback of {} failed: {err}", dest.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_display() {
        let key = PluginKey::from_manifest("@acme/widget");
        assert_eq!(
            Change::Installed {
                key: key.clone(),
                dir: "addons/@acme_widget".to_string()
            }
            .to_string(),
            "installed @acme/widget into addons/@acme_widget"
        );
        assert_eq!(
            Change::ManifestUpdated {
                key: key.clone(),
                version: "1.2.0".to_string()
            }
            .to_string(),
            "updated @acme/widget@1.2.0 in gdpm.json"
        );
        assert_eq!(
            Change::ManifestUpdated {
                key,
                version: String::new()
            }
            .to_string(),
            "updated @acme/widget in gdpm.json"
        );
    }
}
