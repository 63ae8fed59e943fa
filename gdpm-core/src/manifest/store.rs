//! On-disk persistence for the manifest
//!
//! `gdpm.json` holds `schemaVersion` and each plugin's `repo`/`version`.
//! `gdpm.link.json`, next to it, holds `{enabled, path}` per linked plugin.
//! Both documents are strict: unknown fields are errors.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{LinkState, Manifest, PluginRecord};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::spec::PluginKey;

/// Primary manifest file name
pub const MANIFEST_FILE: &str = "gdpm.json";

/// Secondary link-state file name
pub const LINK_FILE: &str = "gdpm.link.json";

/// Schema marker written on every save
pub const CURRENT_SCHEMA_VERSION: &str = "0.0.2";

/// Older marker that is still readable
const LEGACY_SCHEMA_VERSION: &str = "0.0.1";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PrimaryDocument {
    #[serde(default)]
    schema_version: Option<String>,
    #[serde(default)]
    plugins: BTreeMap<String, PrimaryRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrimaryRecord {
    #[serde(default)]
    repo: String,
    #[serde(default)]
    version: String,
    /// Never valid here; captured only to report a precise error
    #[serde(default, deserialize_with = "present")]
    link: Option<serde_json::Value>,
}

fn present<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(d).map(Some)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryOut {
    schema_version: &'static str,
    plugins: BTreeMap<String, PrimaryRecordOut>,
}

#[derive(Debug, Serialize)]
struct PrimaryRecordOut {
    #[serde(skip_serializing_if = "String::is_empty")]
    repo: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    version: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkDocument {
    #[serde(default)]
    plugins: BTreeMap<String, LinkEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkEntry {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    path: String,
}

/// Location of the link file that belongs to `manifest_path`
pub fn link_file_path(manifest_path: &Path) -> PathBuf {
    manifest_path.with_file_name(LINK_FILE)
}

impl Manifest {
    /// Load the manifest at `path` and merge the link file next to it.
    ///
    /// A missing link file means nothing is linked.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestMissing {
                    root: path.parent().unwrap_or(Path::new(".")).to_path_buf(),
                })
            }
            Err(err) => return Err(Error::io("read", path, err)),
        };

        let doc: PrimaryDocument = serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let schema_version = doc
            .schema_version
            .unwrap_or_else(|| CURRENT_SCHEMA_VERSION.to_string());
        if schema_version != CURRENT_SCHEMA_VERSION && schema_version != LEGACY_SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                found: schema_version,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }

        let mut plugins = BTreeMap::new();
        for (key, record) in doc.plugins {
            if record.link.is_some() {
                return Err(Error::LinkInPrimary { key });
            }
            plugins.insert(
                PluginKey::from_manifest(key),
                PluginRecord {
                    repo: record.repo,
                    version: record.version,
                    link: None,
                },
            );
        }

        let mut manifest = Manifest {
            schema_version,
            plugins,
        };
        manifest.merge_links(&link_file_path(path))?;

        tracing::debug!(
            "loaded {} plugin(s) from {}",
            manifest.len(),
            path.display()
        );
        Ok(manifest)
    }

    fn merge_links(&mut self, link_path: &Path) -> Result<()> {
        let content = match std::fs::read_to_string(link_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(Error::io("read", link_path, err)),
        };

        let doc: LinkDocument = serde_json::from_str(&content).map_err(|source| Error::Json {
            path: link_path.to_path_buf(),
            source,
        })?;

        for (key, entry) in doc.plugins {
            if entry.enabled && entry.path.trim().is_empty() {
                return Err(Error::LinkWithoutPath { key });
            }
            let state = LinkState {
                enabled: entry.enabled,
                path: entry.path,
            };
            if state.is_empty() {
                continue;
            }
            match self.plugins.get_mut(&PluginKey::from_manifest(key.clone())) {
                Some(record) => record.link = Some(state),
                None => tracing::warn!(
                    "ignoring {} entry for {} (not declared in {})",
                    LINK_FILE,
                    key,
                    MANIFEST_FILE
                ),
            }
        }
        Ok(())
    }

    /// Save the manifest to `path` and rewrite (or delete) the link file.
    ///
    /// The primary document never contains link data and is always written
    /// with the current schema marker.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let primary = PrimaryOut {
            schema_version: CURRENT_SCHEMA_VERSION,
            plugins: self
                .plugins
                .iter()
                .map(|(key, record)| {
                    (
                        key.to_string(),
                        PrimaryRecordOut {
                            repo: record.repo.trim().to_string(),
                            version: record.version.trim().to_string(),
                        },
                    )
                })
                .collect(),
        };
        write_json(path, &primary)?;

        let links = LinkDocument {
            plugins: self
                .plugins
                .iter()
                .filter_map(|(key, record)| {
                    let link = record.link.as_ref().filter(|l| !l.is_empty())?;
                    Some((
                        key.to_string(),
                        LinkEntry {
                            enabled: link.enabled,
                            path: link.path.trim().to_string(),
                        },
                    ))
                })
                .collect(),
        };

        let link_path = link_file_path(path);
        if links.plugins.is_empty() {
            fsutil::remove_path(&link_path)?;
        } else {
            write_json(&link_path, &links)?;
        }

        tracing::debug!("saved {} plugin(s) to {}", self.len(), path.display());
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = serde_json::to_string_pretty(value).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    out.push('\n');
    fsutil::write_atomic(path, out.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn key(s: &str) -> PluginKey {
        PluginKey::from_manifest(s)
    }

    #[test]
    fn test_load_legacy_schema_version_upgrades_on_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            r#"{"schemaVersion":"0.0.1","plugins":{"@user/plugin":{"repo":"https://example.com","version":"1.2.3"}}}"#,
        )
        .unwrap();

        let manifest = Manifest::load_from_path(&path).unwrap();
        assert_eq!(manifest.schema_version, "0.0.1");
        assert_eq!(manifest.get(&key("@user/plugin")).unwrap().version, "1.2.3");

        manifest.save_to_path(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains(r#""schemaVersion": "0.0.2""#), "{saved}");
    }

    #[test]
    fn test_load_unsupported_schema_version() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        std::fs::write(&path, r#"{"schemaVersion":"9.9.9","plugins":{}}"#).unwrap();

        let err = Manifest::load_from_path(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSchema { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);

        std::fs::write(&path, r#"{"schemaVersion":"0.0.2","plugins":{},"extra":1}"#).unwrap();
        assert!(matches!(
            Manifest::load_from_path(&path),
            Err(Error::Json { .. })
        ));

        std::fs::write(
            &path,
            r#"{"plugins":{"@a/b":{"repo":"r","version":"v","sha":"abc"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            Manifest::load_from_path(&path),
            Err(Error::Json { .. })
        ));
    }

    #[test]
    fn test_load_rejects_link_in_primary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            r#"{"plugins":{"@a/b":{"repo":"r","link":{"enabled":true,"path":"/x"}}}}"#,
        )
        .unwrap();

        let err = Manifest::load_from_path(&path).unwrap_err();
        assert!(matches!(err, Error::LinkInPrimary { .. }));
        assert!(err.to_string().contains(LINK_FILE));
    }

    #[test]
    fn test_missing_manifest_is_user_error() {
        let temp = TempDir::new().unwrap();
        let err = Manifest::load_from_path(&temp.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(err.is_user_input());
    }

    #[test]
    fn test_save_load_roundtrip_splits_link_state() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);

        let mut manifest = Manifest::default();
        manifest.upsert(
            key("@acme/widget"),
            PluginRecord {
                repo: "https://github.com/acme/widget/tree/abc1234".to_string(),
                version: "1.0.0".to_string(),
                link: None,
            },
        );
        manifest.upsert(
            key("@acme/gizmo"),
            PluginRecord {
                repo: "https://github.com/acme/gizmo/tree/def5678".to_string(),
                version: "2.0.0".to_string(),
                link: Some(LinkState {
                    enabled: true,
                    path: "~/dev/gizmo".to_string(),
                }),
            },
        );
        manifest.upsert(
            key("@local"),
            PluginRecord {
                link: Some(LinkState {
                    enabled: false,
                    path: "/abs/local".to_string(),
                }),
                ..Default::default()
            },
        );

        manifest.save_to_path(&path).unwrap();

        let primary = std::fs::read_to_string(&path).unwrap();
        assert!(!primary.contains("link"), "{primary}");
        assert!(!primary.contains("~/dev/gizmo"));
        // Sorted keys keep diffs minimal
        let gizmo = primary.find("@acme/gizmo").unwrap();
        let widget = primary.find("@acme/widget").unwrap();
        assert!(gizmo < widget);

        let loaded = Manifest::load_from_path(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_link_file_removed_when_no_links() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        let link_path = link_file_path(&path);

        let mut manifest = Manifest::default();
        manifest.upsert(
            key("@acme/widget"),
            PluginRecord {
                link: Some(LinkState {
                    enabled: true,
                    path: "/abs".to_string(),
                }),
                ..Default::default()
            },
        );
        manifest.save_to_path(&path).unwrap();
        assert!(link_path.exists());

        manifest.remove(&key("@acme/widget"));
        manifest.save_to_path(&path).unwrap();
        assert!(!link_path.exists());
    }

    #[test]
    fn test_link_file_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        std::fs::write(&path, r#"{"plugins":{"@a/b":{},"@c/d":{}}}"#).unwrap();

        // Unknown keys are ignored, disabled entries keep their path
        std::fs::write(
            link_file_path(&path),
            r#"{"plugins":{"@a/b":{"enabled":false,"path":"/keep"},"@x/y":{"enabled":true,"path":"/p"},"@c/d":{"enabled":false}}}"#,
        )
        .unwrap();
        let manifest = Manifest::load_from_path(&path).unwrap();
        let ab = manifest.get(&key("@a/b")).unwrap();
        assert_eq!(ab.link_path(), Some("/keep"));
        assert!(!ab.is_linked());
        assert_eq!(manifest.get(&key("@c/d")).unwrap().link, None);
        assert!(!manifest.contains(&key("@x/y")));

        std::fs::write(
            link_file_path(&path),
            r#"{"plugins":{"@a/b":{"enabled":true,"path":""}}}"#,
        )
        .unwrap();
        assert!(matches!(
            Manifest::load_from_path(&path),
            Err(Error::LinkWithoutPath { .. })
        ));
    }
}
