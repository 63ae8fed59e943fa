//! Plugin manifest (`gdpm.json` + `gdpm.link.json`)
//!
//! The manifest declares which plugins the project wants. In memory every
//! plugin is a single [`PluginRecord`] with an optional [`LinkState`]; on
//! disk the link state lives in a separate, developer-local file so that
//! local paths never reach the shareable manifest. The split and merge
//! happen only in [`store`].

mod store;

pub use store::{link_file_path, CURRENT_SCHEMA_VERSION, LINK_FILE, MANIFEST_FILE};

use std::collections::BTreeMap;

use crate::spec::PluginKey;

/// Link mode of a plugin: its addon directory points at a local working copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    pub enabled: bool,
    /// Local path, possibly home-relative (`~/...`) or project-relative
    pub path: String,
}

impl LinkState {
    /// A link state worth persisting: enabled, or remembering a path
    pub fn is_empty(&self) -> bool {
        !self.enabled && self.path.trim().is_empty()
    }
}

/// One declared plugin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRecord {
    /// Content-addressed source locator; empty for link-only plugins
    pub repo: String,
    /// Free-form display version
    pub version: String,
    pub link: Option<LinkState>,
}

impl PluginRecord {
    /// Linked plugins have an enabled link with a path
    pub fn is_linked(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|l| l.enabled && !l.path.trim().is_empty())
    }

    /// The remembered link path, whether or not the link is enabled
    pub fn link_path(&self) -> Option<&str> {
        self.link
            .as_ref()
            .map(|l| l.path.trim())
            .filter(|p| !p.is_empty())
    }

    /// Whether the record carries an installable source
    pub fn has_source(&self) -> bool {
        !self.repo.trim().is_empty()
    }
}

/// In-memory manifest: every declared plugin keyed by [`PluginKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Schema marker the document was read with
    pub schema_version: String,
    plugins: BTreeMap<PluginKey, PluginRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            plugins: BTreeMap::new(),
        }
    }
}

impl Manifest {
    pub fn get(&self, key: &PluginKey) -> Option<&PluginRecord> {
        self.plugins.get(key)
    }

    pub fn contains(&self, key: &PluginKey) -> bool {
        self.plugins.contains_key(key)
    }

    /// Insert or replace a record
    pub fn upsert(&mut self, key: PluginKey, record: PluginRecord) {
        self.plugins.insert(key, record);
    }

    pub fn remove(&mut self, key: &PluginKey) -> Option<PluginRecord> {
        self.plugins.remove(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &PluginKey> {
        self.plugins.keys()
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&PluginKey, &PluginRecord)> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Keys of every currently linked plugin, sorted
    pub fn linked_keys(&self) -> Vec<PluginKey> {
        self.plugins
            .iter()
            .filter(|(_, record)| record.is_linked())
            .map(|(key, _)| key.clone())
            .collect()
    }
}
