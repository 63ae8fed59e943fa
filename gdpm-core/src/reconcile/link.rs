use std::path::{Path, PathBuf};

use super::{rollback, Change, Reconciler, Report};
use crate::addon::{self, check_no_collision, AddonDirName};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::manifest::{LinkState, Manifest};
use crate::spec::PluginKey;

/// The accepted forms of `link`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRequest {
    /// Link `key` to `path`
    KeyAndPath { key: PluginKey, path: String },
    /// Re-link `key` to its remembered path
    Key(PluginKey),
    /// Link `path` under a key derived from its directory name
    Path(String),
}

const DESCRIPTOR_HINT: &str = "pass the addon directory that contains plugin.cfg";

impl Reconciler {
    /// Point `addons/<name>` at a local working copy
    pub async fn link(&self, request: &LinkRequest) -> Result<Report> {
        let mut manifest = self.load_manifest()?;
        let (key, target) = self.link_target(&manifest, request)?;

        let meta = match std::fs::metadata(&target) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotADirectory { path: target })
            }
            Err(err) => return Err(Error::io("stat", &target, err)),
        };
        if !meta.is_dir() {
            return Err(Error::NotADirectory { path: target });
        }
        addon::require_descriptor(&target, DESCRIPTOR_HINT)?;

        let name = AddonDirName::for_key(&key)?;
        check_no_collision(&manifest, &key, &name)?;

        let dest = self.layout.addon_path(&name);
        // a derived key never owns what already sits at its directory
        if matches!(request, LinkRequest::Path(_)) && fsutil::entry_exists(&dest)? {
            return Err(Error::DestinationExists { path: dest });
        }

        let addons = self.layout.addons_dir();
        std::fs::create_dir_all(&addons).map_err(|e| Error::io("create", &addons, e))?;

        fsutil::remove_path(&dest)?;
        fsutil::symlink_dir(&target, &dest)?;
        if let Err(err) = addon::require_descriptor(&dest, DESCRIPTOR_HINT) {
            rollback(&dest);
            return Err(err);
        }

        let stored = fsutil::abbreviate_home(&target);
        let mut report = Report::default();
        report.push(Change::Linked {
            dir: name.relative(),
            target: stored.clone(),
        });

        let mut record = manifest.get(&key).cloned().unwrap_or_default();
        record.link = Some(LinkState {
            enabled: true,
            path: stored,
        });
        manifest.upsert(key.clone(), record);
        self.save_manifest(&manifest)?;

        report.extend(self.reconcile_aliases(&manifest, &key, &name, &target)?);
        self.enable(&name, &mut report)?;

        tracing::info!("linked {key} to {}", target.display());
        Ok(report)
    }

    /// Key and absolute local path for a link request
    fn link_target(
        &self,
        manifest: &Manifest,
        request: &LinkRequest,
    ) -> Result<(PluginKey, PathBuf)> {
        match request {
            LinkRequest::KeyAndPath { key, path } => Ok((key.clone(), self.absolute_local_path(path)?)),
            LinkRequest::Key(key) => {
                let stored = manifest
                    .get(key)
                    .and_then(|record| record.link_path())
                    .ok_or_else(|| Error::LinkPathMissing {
                        key: key.to_string(),
                    })?;
                Ok((key.clone(), self.absolute_local_path(stored)?))
            }
            LinkRequest::Path(path) => {
                let target = self.absolute_local_path(path)?;
                let key = key_for_path(&target).ok_or_else(|| Error::InvalidSpec {
                    spec: path.clone(),
                    reason: "cannot derive a plugin name from this path".to_string(),
                })?;
                if manifest.contains(&key) {
                    return Err(Error::PluginExists {
                        key: key.to_string(),
                    });
                }
                Ok((key, target))
            }
        }
    }
}

/// `@<basename>` key a path-only link of `path` uses
pub(super) fn key_for_path(path: &Path) -> Option<PluginKey> {
    let base = path.file_name()?.to_str()?;
    PluginKey::from_dir_name(base)
}
