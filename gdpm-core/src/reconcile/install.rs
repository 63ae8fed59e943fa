use super::{Change, Reconciler, Report};
use crate::addon::{check_no_collision, AddonDirName};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::source::SourceLocator;
use crate::spec::PluginKey;

impl Reconciler {
    /// Install every declared plugin whose addon directory is missing.
    ///
    /// Existing directories are never touched, whatever their content, and
    /// linked plugins are skipped. All candidates are checked before the
    /// first download, so a bad entry fails the run with `addons/` untouched.
    pub async fn install_all(&self) -> Result<Report> {
        let manifest = self.load_manifest()?;
        let mut report = Report::default();
        let mut pending: Vec<(PluginKey, AddonDirName, SourceLocator)> = Vec::new();

        for (key, record) in manifest.iter() {
            let name = AddonDirName::for_key(key)?;
            check_no_collision(&manifest, key, &name)?;

            if record.is_linked() {
                report.push(Change::Skipped {
                    key: key.clone(),
                    reason: "linked".to_string(),
                });
                continue;
            }

            let dest = self.layout.addon_path(&name);
            match std::fs::symlink_metadata(&dest) {
                Ok(meta) if meta.is_dir() || meta.file_type().is_symlink() => {
                    report.push(Change::Skipped {
                        key: key.clone(),
                        reason: "already present".to_string(),
                    });
                    continue;
                }
                Ok(_) => return Err(Error::AddonNotDirectory { path: dest }),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Error::io("stat", dest, err)),
            }

            if !record.has_source() {
                return Err(Error::NoSource {
                    key: key.to_string(),
                });
            }
            let locator: SourceLocator = record.repo.parse()?;
            pending.push((key.clone(), name, locator));
        }

        for (key, name, locator) in pending {
            // downloads take time; something may have appeared meanwhile
            if fsutil::entry_exists(&self.layout.addon_path(&name))? {
                report.push(Change::Skipped {
                    key,
                    reason: "already present".to_string(),
                });
                continue;
            }
            self.place_copy(&locator, &name).await?;
            report.push(Change::Installed {
                key: key.clone(),
                dir: name.relative(),
            });
            self.enable(&name, &mut report)?;
        }

        tracing::info!("install finished: {} change(s)", report.changes.len());
        Ok(report)
    }
}
