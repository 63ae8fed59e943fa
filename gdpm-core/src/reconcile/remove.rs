use super::{Change, Reconciler, Report};
use crate::addon::AddonDirName;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::spec::PluginKey;

impl Reconciler {
    /// Remove a plugin: disable it, delete its addon directory (or link) and
    /// drop its manifest record.
    pub async fn remove(&self, key: &PluginKey) -> Result<Report> {
        let mut manifest = self.load_manifest()?;
        if !manifest.contains(key) {
            return Err(Error::PluginNotFound {
                key: key.to_string(),
            });
        }
        let name = AddonDirName::for_key(key)?;
        let mut report = Report::default();

        self.disable(&name, &mut report)?;

        let dest = self.layout.addon_path(&name);
        if fsutil::entry_exists(&dest)? {
            fsutil::remove_path(&dest)?;
            report.push(Change::Removed {
                dir: name.relative(),
            });
        }

        manifest.remove(key);
        self.save_manifest(&manifest)?;
        report.push(Change::Forgotten { key: key.clone() });

        tracing::info!("removed {key}");
        Ok(report)
    }
}
