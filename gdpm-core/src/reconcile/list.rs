use serde::Serialize;
use std::fmt;

use super::Reconciler;
use crate::addon::AddonDirName;
use crate::error::Result;
use crate::fsutil;

/// Filesystem state of a declared plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Installed,
    Linked,
    /// The addon directory is absent
    Missing,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginState::Installed => "installed",
            PluginState::Linked => "linked",
            PluginState::Missing => "missing",
        })
    }
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub key: String,
    pub state: PluginState,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Reconciler {
    /// Every manifest record with its current state, in key order
    pub async fn list(&self) -> Result<Vec<PluginStatus>> {
        let manifest = self.load_manifest()?;
        let mut rows = Vec::with_capacity(manifest.len());

        for (key, record) in manifest.iter() {
            let name = AddonDirName::for_key(key)?;
            let state = if !fsutil::entry_exists(&self.layout.addon_path(&name))? {
                PluginState::Missing
            } else if record.is_linked() {
                PluginState::Linked
            } else {
                PluginState::Installed
            };
            rows.push(PluginStatus {
                key: key.to_string(),
                state,
                version: record.version.clone(),
                dir: name.relative(),
                link: record.link_path().map(str::to_string),
            });
        }
        Ok(rows)
    }
}
