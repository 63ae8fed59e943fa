//! Addon directory naming and collision detection
//!
//! Every managed plugin lives in `addons/<name>/` where `<name>` is derived
//! from its key by replacing `/` with `_`. The mapping is pure and fails
//! closed: a key that would produce anything outside the allow-list is
//! rejected rather than rewritten.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::spec::PluginKey;

/// Directory under the project root that holds every addon
pub const ADDONS_DIR: &str = "addons";

/// Fixed-name descriptor that marks the root of a valid plugin
pub const DESCRIPTOR_FILE: &str = "plugin.cfg";

static DIR_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@[A-Za-z0-9][A-Za-z0-9._-]*$").expect("addon dir name pattern is valid")
});

/// Validated directory name under `addons/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddonDirName(String);

impl AddonDirName {
    /// Validate an existing directory name against the allow-list
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || name == "." || name == ".." || !DIR_NAME_RE.is_match(name) {
            return Err(Error::InvalidDirName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Derive the directory name for a plugin key
    pub fn for_key(key: &PluginKey) -> Result<Self> {
        let key = key.as_str().trim();
        let bad_segment = key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        if key.is_empty() || bad_segment || key.matches('/').count() > 1 {
            return Err(Error::InvalidDirName {
                name: key.to_string(),
            });
        }
        Self::parse(&key.replace('/', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `addons/<name>` relative to the project root, always with `/`
    pub fn relative(&self) -> String {
        format!("{ADDONS_DIR}/{}", self.0)
    }

    /// Absolute path of the addon directory inside `project_root`
    pub fn path_in(&self, project_root: &Path) -> PathBuf {
        project_root.join(ADDONS_DIR).join(&self.0)
    }

    /// `res://` path of this addon's descriptor as the editor references it
    pub fn descriptor_resource(&self) -> String {
        format!("res://{ADDONS_DIR}/{}/{DESCRIPTOR_FILE}", self.0)
    }
}

impl fmt::Display for AddonDirName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fail if any other manifest key maps onto the same directory as `key`.
///
/// A manifest key that cannot be mapped at all is reported as invalid, since
/// a hand-edited manifest must not be able to sneak past the check.
pub fn check_no_collision(manifest: &Manifest, key: &PluginKey, name: &AddonDirName) -> Result<()> {
    for other in manifest.keys() {
        if other == key {
            continue;
        }
        let other_name = AddonDirName::for_key(other)?;
        if &other_name == name {
            return Err(Error::DirCollision {
                path: name.relative(),
                owner: other.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether `dir` holds the plugin descriptor at its root.
///
/// The check follows links, so it validates linked working copies too.
pub fn descriptor_exists(dir: &Path) -> Result<bool> {
    let path = dir.join(DESCRIPTOR_FILE);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Err(Error::DescriptorIsDir { path }),
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::io("stat", path, err)),
    }
}

/// Require the descriptor at `dir`, reporting `hint` when it is missing
pub fn require_descriptor(dir: &Path, hint: impl Into<String>) -> Result<()> {
    if descriptor_exists(dir)? {
        return Ok(());
    }
    Err(Error::DescriptorMissing {
        path: dir.join(DESCRIPTOR_FILE),
        hint: hint.into(),
    })
}
