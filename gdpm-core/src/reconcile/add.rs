use super::{Change, Reconciler, Report};
use crate::addon::{check_no_collision, AddonDirName};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::manifest::PluginRecord;
use crate::spec::PluginSpec;

impl Reconciler {
    /// Install (or update) a plugin from its source.
    ///
    /// A linked plugin only gets its manifest locator/version refreshed; the
    /// working copy behind the link is left alone.
    pub async fn add(&self, spec: &PluginSpec) -> Result<Report> {
        let mut manifest = self.load_manifest()?;
        let key = spec.key();
        let name = AddonDirName::for_key(&key)?;
        check_no_collision(&manifest, &key, &name)?;

        let resolution = self
            .resolver
            .resolve(&spec.owner, &spec.repo, spec.version.as_deref())
            .await?;
        tracing::debug!("resolved {key} to {} ({})", resolution.locator, resolution.version);

        let mut report = Report::default();
        let existing = manifest.get(&key).cloned();

        if let Some(mut record) = existing.clone().filter(|r| r.is_linked()) {
            record.repo = resolution.locator.to_string();
            record.version = resolution.version.clone();
            manifest.upsert(key.clone(), record);
            self.save_manifest(&manifest)?;
            report.push(Change::ManifestUpdated {
                key,
                version: resolution.version,
            });
            return Ok(report);
        }

        let dest = self.layout.addon_path(&name);
        if existing.is_none() && fsutil::entry_exists(&dest)? {
            return Err(Error::DestinationExists { path: dest });
        }

        self.place_copy(&resolution.locator, &name).await?;
        report.push(Change::Installed {
            key: key.clone(),
            dir: name.relative(),
        });

        let record = PluginRecord {
            repo: resolution.locator.to_string(),
            version: resolution.version.clone(),
            // keep a remembered (disabled) link path for a later re-link
            link: existing.and_then(|r| r.link),
        };
        manifest.upsert(key.clone(), record);
        self.save_manifest(&manifest)?;
        report.push(Change::ManifestUpdated {
            key: key.clone(),
            version: resolution.version,
        });

        self.enable(&name, &mut report)?;
        tracing::info!("added {key}");
        Ok(report)
    }
}
