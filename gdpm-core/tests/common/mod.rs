//! Shared fixtures for the reconciliation integration tests
//!
//! Collaborators are replaced by in-memory fakes: the resolver pins every
//! request to a fixed ref, and the materializer copies a fixture directory
//! registered per `owner/repo`. Both count their calls.

#![allow(dead_code)]

use async_trait::async_trait;
use gdpm_core::fsutil::copy_tree;
use gdpm_core::project::PROJECT_FILE;
use gdpm_core::{
    Error, Manifest, Materializer, ProjectLayout, Reconciler, Resolution, Resolver, Result,
    SourceLocator,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tempfile::TempDir;

pub const REF: &str = "0123456789abcdef0123456789abcdef01234567";

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Call counter shared between a fake and the test body
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeResolver {
    pub version: String,
    pub subdirs: HashMap<String, String>,
    pub calls: Calls,
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, owner: &str, repo: &str, constraint: Option<&str>) -> Result<Resolution> {
        self.calls.hit();
        let mut locator = SourceLocator::new(owner, repo, REF);
        if let Some(subdir) = self.subdirs.get(&format!("{owner}/{repo}")) {
            locator = locator.with_subdir(subdir.as_str());
        }
        Ok(Resolution {
            locator,
            version: constraint.unwrap_or(&self.version).to_string(),
        })
    }
}

pub struct FakeMaterializer {
    pub trees: HashMap<String, PathBuf>,
    /// Sources whose materialized tree gains a symlink next to the descriptor
    pub symlinked: HashSet<String>,
    /// Directories that appear on disk while a source is being fetched
    pub appearing: HashMap<String, PathBuf>,
    pub calls: Calls,
}

#[async_trait]
impl Materializer for FakeMaterializer {
    async fn materialize(&self, locator: &SourceLocator, dest: &Path) -> Result<PathBuf> {
        self.calls.hit();
        let owner_repo = format!("{}/{}", locator.owner, locator.repo);
        let fixture = self
            .trees
            .get(&owner_repo)
            .ok_or_else(|| Error::Materialize {
                locator: locator.to_string(),
                reason: "no fixture".to_string(),
            })?;
        let root = dest.join(format!("{}-{}", locator.repo, &locator.reference[..7]));
        copy_tree(fixture, &root)?;
        if self.symlinked.contains(&owner_repo) {
            add_shortcut(&root);
        }
        if let Some(dir) = self.appearing.get(&owner_repo) {
            std::fs::create_dir_all(dir).expect("appearing dir");
        }
        Ok(root)
    }
}

#[cfg(unix)]
fn add_shortcut(root: &Path) {
    std::os::unix::fs::symlink("plugin.gd", root.join("shortcut.gd")).expect("symlink");
}

#[cfg(not(unix))]
fn add_shortcut(_root: &Path) {}

/// A throwaway Godot project plus fixture source trees
pub struct TestProject {
    pub temp: TempDir,
    pub layout: ProjectLayout,
    pub fixtures: PathBuf,
    trees: HashMap<String, PathBuf>,
    subdirs: HashMap<String, String>,
    symlinked: HashSet<String>,
    appearing: HashMap<String, PathBuf>,
    pub resolver_calls: Calls,
    pub materializer_calls: Calls,
}

impl TestProject {
    /// Project with an empty manifest and a `project.godot`
    pub fn new() -> Self {
        Self::with_project_file("config_version=5\n\n[application]\n\nconfig/name=\"Game\"\n")
    }

    pub fn with_project_file(content: &str) -> Self {
        init_test_logging();
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().join("game");
        std::fs::create_dir_all(&root).expect("project root");
        std::fs::write(root.join(PROJECT_FILE), content).expect("project file");

        let layout = ProjectLayout::new(&root);
        Manifest::default()
            .save_to_path(&layout.manifest_path())
            .expect("manifest");

        let fixtures = temp.path().join("fixtures");
        std::fs::create_dir_all(&fixtures).expect("fixtures");
        Self {
            temp,
            layout,
            fixtures,
            trees: HashMap::new(),
            subdirs: HashMap::new(),
            symlinked: HashSet::new(),
            appearing: HashMap::new(),
            resolver_calls: Calls::default(),
            materializer_calls: Calls::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Register a source tree for `owner/repo` holding a valid plugin
    pub fn source(&mut self, owner_repo: &str) -> PathBuf {
        let dir = self.fixtures.join(owner_repo.replace('/', "-"));
        write_plugin(&dir, owner_repo);
        self.trees.insert(owner_repo.to_string(), dir.clone());
        dir
    }

    /// Register a source tree for `owner/repo` with no descriptor
    pub fn broken_source(&mut self, owner_repo: &str) -> PathBuf {
        let dir = self.fixtures.join(owner_repo.replace('/', "-"));
        std::fs::create_dir_all(&dir).expect("fixture");
        std::fs::write(dir.join("README.md"), "not a plugin\n").expect("readme");
        self.trees.insert(owner_repo.to_string(), dir.clone());
        dir
    }

    /// Register a source tree whose plugin sits at `subdir`
    pub fn nested_source(&mut self, owner_repo: &str, subdir: &str) -> PathBuf {
        let dir = self.fixtures.join(owner_repo.replace('/', "-"));
        write_plugin(&dir.join(subdir), owner_repo);
        self.trees.insert(owner_repo.to_string(), dir.clone());
        self.subdirs.insert(owner_repo.to_string(), subdir.to_string());
        dir
    }

    /// Register a valid plugin whose downloaded tree also carries a symlink
    pub fn symlinked_source(&mut self, owner_repo: &str) -> PathBuf {
        let dir = self.source(owner_repo);
        self.symlinked.insert(owner_repo.to_string());
        dir
    }

    /// Create `addons/<dir>` as a side effect of fetching `owner_repo`
    pub fn appears_while_fetching(&mut self, owner_repo: &str, dir: &str) {
        let path = self.addon(dir);
        self.appearing.insert(owner_repo.to_string(), path);
    }

    /// A local working copy outside the project
    pub fn working_copy(&self, name: &str) -> PathBuf {
        let dir = self.temp.path().join("work").join(name);
        write_plugin(&dir, name);
        dir
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.layout.clone(),
            FakeResolver {
                version: "1.0.0".to_string(),
                subdirs: self.subdirs.clone(),
                calls: self.resolver_calls.clone(),
            },
            FakeMaterializer {
                trees: self.trees.clone(),
                symlinked: self.symlinked.clone(),
                appearing: self.appearing.clone(),
                calls: self.materializer_calls.clone(),
            },
        )
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::load_from_path(&self.layout.manifest_path()).expect("load manifest")
    }

    pub fn project_file(&self) -> String {
        std::fs::read_to_string(self.layout.project_file()).expect("project file")
    }

    pub fn addon(&self, dir: &str) -> PathBuf {
        self.root().join("addons").join(dir)
    }
}

/// Write a minimal plugin (descriptor plus one script) into `dir`
pub fn write_plugin(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir).expect("plugin dir");
    std::fs::write(
        dir.join("plugin.cfg"),
        format!("[plugin]\n\nname=\"{name}\"\nscript=\"plugin.gd\"\n"),
    )
    .expect("plugin.cfg");
    std::fs::write(dir.join("plugin.gd"), "@tool\nextends EditorPlugin\n").expect("plugin.gd");
}
