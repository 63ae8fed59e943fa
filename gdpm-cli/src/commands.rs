//! Command execution: project discovery, collaborators and deadlines

use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};

use gdpm_core::project::find_manifest_root;
use gdpm_core::reconcile::init_project;
use gdpm_core::remote::{GitHubArchive, GitHubResolver};
use gdpm_core::{
    LinkRequest, PluginKey, PluginSpec, PluginStatus, ProjectLayout, Reconciler, Report, Settings,
};

use crate::Command;

pub async fn execute(command: Command, project: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load()?;
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let metadata = settings.metadata_timeout();
    let download = settings.download_timeout();

    let root = project_root(project.clone(), &cwd);
    debug!("project root: {}", root.display());
    let reconciler = build_reconciler(&root, &settings)?;

    match command {
        Command::Init => {
            // No manifest to discover yet: start from the given directory
            let start = if project.is_some() { root } else { cwd };
            let report = with_deadline(metadata, async { Ok(init_project(&start)?) }).await?;
            if report.is_empty() {
                println!("gdpm.json already exists");
            }
            print_report(&report);
        }
        Command::Add { spec } => {
            let spec = PluginSpec::parse(&spec)?;
            let report = with_deadline(download, async { Ok(reconciler.add(&spec).await?) }).await?;
            print_report(&report);
        }
        Command::Remove { plugin } => {
            let key = PluginKey::parse_bare(&plugin, "remove")?;
            let report = with_deadline(metadata, async { Ok(reconciler.remove(&key).await?) }).await?;
            print_report(&report);
        }
        Command::Link { target, path } => {
            let request = link_request(&target, path)?;
            let report =
                with_deadline(metadata, async { Ok(reconciler.link(&request).await?) }).await?;
            print_report(&report);
        }
        Command::Unlink {
            plugin,
            forget,
            all,
        } => {
            let report = match (all, plugin) {
                (true, _) => {
                    with_deadline(download, async { Ok(reconciler.unlink_all(forget).await?) })
                        .await?
                }
                (false, Some(plugin)) => {
                    let key = PluginKey::parse_bare(&plugin, "unlink")?;
                    with_deadline(download, async { Ok(reconciler.unlink(&key, forget).await?) })
                        .await?
                }
                (false, None) => return Err(anyhow!("pass a plugin or --all")),
            };
            if report.is_empty() {
                println!("No linked plugins");
            }
            print_report(&report);
        }
        Command::Install => {
            let report =
                with_deadline(download, async { Ok(reconciler.install_all().await?) }).await?;
            if report.is_empty() {
                println!("No plugins declared in gdpm.json");
            }
            print_report(&report);
        }
        Command::List { json } => {
            let rows = with_deadline(metadata, async { Ok(reconciler.list().await?) }).await?;
            print_list(&rows, json)?;
        }
    }
    Ok(())
}

/// `--project` when given, else the nearest ancestor holding a manifest, else the
/// working directory (where the missing manifest gets reported)
fn project_root(project: Option<PathBuf>, cwd: &Path) -> PathBuf {
    match project {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => cwd.join(dir),
        None => find_manifest_root(cwd).unwrap_or_else(|| cwd.to_path_buf()),
    }
}

fn build_reconciler(root: &Path, settings: &Settings) -> Result<Reconciler> {
    let config = settings.github_config();
    Ok(Reconciler::new(
        ProjectLayout::new(root),
        GitHubResolver::new(config.clone())?,
        GitHubArchive::new(config)?,
    ))
}

/// A second argument makes the first a key; on its own an `@` prefix marks a key
fn link_request(target: &str, path: Option<String>) -> Result<LinkRequest> {
    Ok(match path {
        Some(path) => LinkRequest::KeyAndPath {
            key: PluginKey::parse_bare(target, "link")?,
            path,
        },
        None if target.starts_with('@') => LinkRequest::Key(PluginKey::parse_bare(target, "link")?),
        None => LinkRequest::Path(target.to_string()),
    })
}

/// Run `operation` under `limit`; expiry is a retryable failure
async fn with_deadline<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "operation timed out after {limit:?}; re-run the command"
        )),
    }
}

fn print_report(report: &Report) {
    for change in &report.changes {
        println!("{change}");
    }
    info!("{} change(s) applied", report.changes.len());
}

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Plugin")]
    key: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Directory")]
    dir: String,
    #[tabled(rename = "Link")]
    link: String,
}

impl From<&PluginStatus> for PluginRow {
    fn from(status: &PluginStatus) -> Self {
        Self {
            key: status.key.clone(),
            state: status.state.to_string(),
            version: if status.version.is_empty() {
                "-".to_string()
            } else {
                status.version.clone()
            },
            dir: status.dir.clone(),
            link: status.link.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn print_list(rows: &[PluginStatus], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No plugins declared in gdpm.json");
        return Ok(());
    }

    let table_rows: Vec<PluginRow> = rows.iter().map(PluginRow::from).collect();
    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdpm_core::PluginState;
    use tempfile::TempDir;

    #[test]
    fn test_link_request_forms() {
        let request = link_request("@acme/widget", Some("../widget".to_string())).unwrap();
        assert_eq!(
            request,
            LinkRequest::KeyAndPath {
                key: PluginKey::from_manifest("@acme/widget"),
                path: "../widget".to_string()
            }
        );

        let request = link_request("@acme/widget", None).unwrap();
        assert_eq!(
            request,
            LinkRequest::Key(PluginKey::from_manifest("@acme/widget"))
        );

        let request = link_request("../widget", None).unwrap();
        assert_eq!(request, LinkRequest::Path("../widget".to_string()));

        assert!(link_request("@acme/widget@1.0.0", None).is_err());
    }

    #[test]
    fn test_project_root_discovery() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("game");
        let nested = root.join("scenes").join("levels");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("gdpm.json"), "{\"plugins\": {}}\n").unwrap();

        assert_eq!(project_root(None, &nested), root);
        assert_eq!(
            project_root(Some(PathBuf::from("other")), temp.path()),
            temp.path().join("other")
        );

        let bare = temp.path().join("bare");
        std::fs::create_dir_all(&bare).unwrap();
        assert_eq!(project_root(None, &bare), bare);
    }

    #[test]
    fn test_plugin_row_placeholders() {
        let row = PluginRow::from(&PluginStatus {
            key: "@acme/widget".to_string(),
            state: PluginState::Missing,
            version: String::new(),
            dir: "addons/@acme_widget".to_string(),
            link: None,
        });
        assert_eq!(row.state, "missing");
        assert_eq!(row.version, "-");
        assert_eq!(row.link, "-");
    }

    #[tokio::test]
    async fn test_deadline_expiry_message() {
        let err = with_deadline(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "operation timed out after 5ms; re-run the command"
        );
    }
}
