use super::{Change, Reconciler, Report};
use crate::addon::AddonDirName;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::source::SourceLocator;
use crate::spec::PluginKey;

impl Reconciler {
    /// Turn a linked plugin back into an installed one, or drop the link.
    ///
    /// With a source locator the content is materialized and copied over the
    /// link. Without one the link is removed; `forget` then deletes the
    /// record instead of remembering the path for a later `link`.
    pub async fn unlink(&self, key: &PluginKey, forget: bool) -> Result<Report> {
        let mut manifest = self.load_manifest()?;
        let mut record = manifest
            .get(key)
            .cloned()
            .ok_or_else(|| Error::PluginNotFound {
                key: key.to_string(),
            })?;
        if !record.is_linked() {
            return Err(Error::NotLinked {
                key: key.to_string(),
            });
        }

        let name = AddonDirName::for_key(key)?;
        let dest = self.layout.addon_path(&name);
        let linked_path = match record.link_path() {
            Some(raw) => Some(self.absolute_local_path(raw)?),
            None => None,
        };
        let mut report = Report::default();

        if record.has_source() {
            let locator: SourceLocator = record.repo.parse()?;
            // the link stays in place until the copy is ready
            self.place_copy(&locator, &name).await?;
            report.push(Change::Unlinked {
                dir: name.relative(),
            });
            report.push(Change::Installed {
                key: key.clone(),
                dir: name.relative(),
            });

            if forget {
                record.link = None;
            } else if let Some(link) = record.link.as_mut() {
                link.enabled = false;
            }
            manifest.upsert(key.clone(), record);
            self.save_manifest(&manifest)?;

            if let Some(path) = &linked_path {
                report.extend(self.reconcile_aliases(&manifest, key, &name, path)?);
            }
            self.enable(&name, &mut report)?;
            tracing::info!("unlinked {key}, reinstalled from {locator}");
            return Ok(report);
        }

        if let Some(path) = &linked_path {
            report.extend(self.disable_aliases(&manifest, key, &name, path)?);
        }
        self.disable(&name, &mut report)?;
        fsutil::remove_path(&dest)?;
        report.push(Change::Unlinked {
            dir: name.relative(),
        });

        if forget {
            manifest.remove(key);
            report.push(Change::Forgotten { key: key.clone() });
        } else {
            if let Some(link) = record.link.as_mut() {
                link.enabled = false;
            }
            manifest.upsert(key.clone(), record);
        }
        self.save_manifest(&manifest)?;

        tracing::info!("unlinked {key}");
        Ok(report)
    }

    /// Unlink every linked plugin in key order
    pub async fn unlink_all(&self, forget: bool) -> Result<Report> {
        let linked = self.load_manifest()?.linked_keys();
        let mut report = Report::default();
        for key in linked {
            report.extend(self.unlink(&key, forget).await?);
        }
        Ok(report)
    }
}
