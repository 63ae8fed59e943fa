//! Project layout and the `project.godot` editor
//!
//! [`ProjectLayout`] is the explicit project root threaded through every
//! operation. The config editor itself is split by concern: the line model
//! and section cursor live in [`config`], the two mutations in
//! `editor_plugins` and `autoload`.

mod autoload;
pub mod config;
mod editor_plugins;

pub use config::ProjectConfig;

use std::path::{Path, PathBuf};

use crate::addon::{AddonDirName, ADDONS_DIR};
use crate::error::Result;
use crate::manifest::{link_file_path, MANIFEST_FILE};

/// Engine project configuration file name
pub const PROJECT_FILE: &str = "project.godot";

/// Paths of every artifact the engine manages, relative to one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn link_path(&self) -> PathBuf {
        link_file_path(&self.manifest_path())
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.root.join(ADDONS_DIR)
    }

    pub fn addon_path(&self, name: &AddonDirName) -> PathBuf {
        name.path_in(&self.root)
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    /// Enable or disable an editor plugin in `project.godot`.
    ///
    /// A project without a config file is left alone.
    pub fn set_editor_plugin_enabled(&self, resource: &str, enable: bool) -> Result<bool> {
        let path = self.project_file();
        let Some(mut doc) = ProjectConfig::read_optional(&path)? else {
            return Ok(false);
        };
        let changed = doc.set_editor_plugin_enabled(resource, enable)?;
        if changed {
            doc.write(&path)?;
            tracing::debug!(
                "{} {resource} in {}",
                if enable { "enabled" } else { "disabled" },
                path.display()
            );
        }
        Ok(changed)
    }

    /// Rewrite autoload paths from one addon directory to another
    pub fn replace_autoload_addon_dir(&self, from: &AddonDirName, to: &AddonDirName) -> Result<bool> {
        let path = self.project_file();
        let Some(mut doc) = ProjectConfig::read_optional(&path)? else {
            return Ok(false);
        };
        let changed = doc.replace_autoload_prefix(from.as_str(), to.as_str());
        if changed {
            doc.write(&path)?;
        }
        Ok(changed)
    }
}

/// Nearest ancestor of `start` (inclusive) holding a manifest
pub fn find_manifest_root(start: &Path) -> Option<PathBuf> {
    find_upward(start, MANIFEST_FILE)
}

/// Nearest ancestor of `start` (inclusive) holding `project.godot`
pub fn find_godot_root(start: &Path) -> Option<PathBuf> {
    find_upward(start, PROJECT_FILE)
}

fn find_upward(start: &Path, file: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(file).is_file())
        .map(Path::to_path_buf)
}
