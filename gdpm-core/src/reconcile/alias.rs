//! Stale alias cleanup after a link is (re)pointed
//!
//! An alias is any other addon directory, tracked or not, that resolves to
//! the same physical working copy as the link just created. Its editor entry
//! is disabled and its autoload paths are moved to the new directory name.
//! `unlink` runs the same cleanup, since `project.godot` is shared and can
//! bring a stale alias entry back.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::link::key_for_path;
use super::{Change, Reconciler, Report};
use crate::addon::AddonDirName;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::manifest::Manifest;
use crate::spec::PluginKey;

impl Reconciler {
    /// Disable aliases of `target` and move their autoload paths to `name`
    pub(super) fn reconcile_aliases(
        &self,
        manifest: &Manifest,
        key: &PluginKey,
        name: &AddonDirName,
        target: &Path,
    ) -> Result<Report> {
        self.clean_aliases(manifest, key, name, target, true)
    }

    /// Disable aliases of `target` only; used when `name` itself goes away
    pub(super) fn disable_aliases(
        &self,
        manifest: &Manifest,
        key: &PluginKey,
        name: &AddonDirName,
        target: &Path,
    ) -> Result<Report> {
        self.clean_aliases(manifest, key, name, target, false)
    }

    fn clean_aliases(
        &self,
        manifest: &Manifest,
        key: &PluginKey,
        name: &AddonDirName,
        target: &Path,
        rewrite_autoload: bool,
    ) -> Result<Report> {
        let mut report = Report::default();
        let Some(physical) = fsutil::resolve_link(target) else {
            return Ok(report);
        };

        for alias in self.find_aliases(manifest, key, name, target, &physical)? {
            tracing::info!("{} is an alias of {}", alias, name);
            let resource = alias.descriptor_resource();
            if self.layout.set_editor_plugin_enabled(&resource, false)? {
                report.push(Change::Disabled { resource });
            }
            if rewrite_autoload && self.layout.replace_autoload_addon_dir(&alias, name)? {
                report.push(Change::AutoloadRewritten {
                    from: alias.relative(),
                    to: name.relative(),
                });
            }
        }
        Ok(report)
    }

    fn find_aliases(
        &self,
        manifest: &Manifest,
        key: &PluginKey,
        name: &AddonDirName,
        target: &Path,
        physical: &Path,
    ) -> Result<BTreeSet<AddonDirName>> {
        let resolves_here = |path: &Path| fsutil::resolve_link(path).is_some_and(|p| p == physical);
        let mut aliases = BTreeSet::new();
        let mut tracked = BTreeSet::new();

        for (other, record) in manifest.iter() {
            let Ok(other_name) = AddonDirName::for_key(other) else {
                continue;
            };
            tracked.insert(other_name.clone());
            if other == key || &other_name == name {
                continue;
            }

            let by_link_path = record
                .link_path()
                .and_then(|raw| self.absolute_local_path(raw).ok())
                .is_some_and(|path| resolves_here(&path));
            let other_dir = self.layout.addon_path(&other_name);
            let by_addon_link = fsutil::is_link(&other_dir) && resolves_here(&other_dir);

            if by_link_path || by_addon_link {
                aliases.insert(other_name);
            }
        }

        for (entry_name, path) in untracked_links(&self.layout.addons_dir())? {
            let Ok(entry_name) = AddonDirName::parse(&entry_name) else {
                continue;
            };
            if &entry_name == name || tracked.contains(&entry_name) {
                continue;
            }
            if resolves_here(&path) {
                aliases.insert(entry_name);
            }
        }

        // Name a path-only link of the same working copy would have used
        let legacy = key_for_path(physical)
            .or_else(|| key_for_path(target))
            .and_then(|k| AddonDirName::for_key(&k).ok());
        if let Some(legacy) = legacy.filter(|l| l != name && !tracked.contains(l)) {
            let path = self.layout.addon_path(&legacy);
            if !fsutil::entry_exists(&path)? || resolves_here(&path) {
                aliases.insert(legacy);
            }
        }

        Ok(aliases)
    }
}

/// Every symlink directly under `addons/`
fn untracked_links(addons: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match std::fs::read_dir(addons) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(Error::io("read", addons, err)),
    };

    let mut links = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read", addons, e))?;
        let path = entry.path();
        if !fsutil::is_link(&path) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            links.push((name.to_string(), path));
        }
    }
    Ok(links)
}
