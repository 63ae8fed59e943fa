//! Error types with clear, actionable messages
//!
//! Errors fall into three groups: user-input errors (reported with a
//! remediation hint and never retried), environment errors (I/O and
//! missing home directory, propagated unchanged) and collaborator errors
//! (resolution and download failures).

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the reconciliation engine can surface
#[derive(Error, Debug)]
pub enum Error {
    /// No manifest was found for the project
    #[error("no gdpm.json found in {root} (run `gdpm init`)")]
    ManifestMissing { root: PathBuf },

    /// The plugin spec string could not be parsed
    #[error("invalid plugin spec {spec:?}: {reason}")]
    InvalidSpec { spec: String, reason: String },

    /// The command does not accept a version qualifier
    #[error("{command} does not take a version (use @username/plugin)")]
    UnexpectedVersion { command: &'static str },

    /// The plugin key cannot be mapped onto an addon directory
    #[error("invalid addon dir name: {name:?}")]
    InvalidDirName { name: String },

    /// Two manifest keys map onto the same addon directory
    #[error("path {path} is already managed by {owner}")]
    DirCollision { path: String, owner: String },

    /// The plugin is not declared in the manifest
    #[error("plugin not found in gdpm.json: {key}")]
    PluginNotFound { key: String },

    /// The plugin is already declared in the manifest
    #[error("plugin already exists in gdpm.json: {key} (run `gdpm unlink {key}` first)")]
    PluginExists { key: String },

    /// Unlink was requested for a plugin that is not linked
    #[error("plugin is not linked: {key}")]
    NotLinked { key: String },

    /// Link was requested without a path and none is remembered
    #[error("missing local path for {key} (pass the addon directory that contains plugin.cfg)")]
    LinkPathMissing { key: String },

    /// The plugin has no source to install from
    #[error("plugin is not installed and has no repo: {key}")]
    NoSource { key: String },

    /// The plugin descriptor is missing from a content root
    #[error("plugin.cfg not found at {path} ({hint})")]
    DescriptorMissing { path: PathBuf, hint: String },

    /// The descriptor path exists but is a directory
    #[error("plugin.cfg is a directory: {path}")]
    DescriptorIsDir { path: PathBuf },

    /// A local path handed to `link` is not usable
    #[error("local path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// An untracked entry already occupies the addon directory
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// An addon path exists but is neither a directory nor a link
    #[error("addon path exists and is not a directory: {path}")]
    AddonNotDirectory { path: PathBuf },

    /// A declared subdirectory escapes or is absent from the source tree
    #[error("invalid repo subdir {subdir:?}: {reason}")]
    InvalidSubdir { subdir: String, reason: String },

    /// A path would land outside of its allowed root
    #[error("path {path} escapes {root}")]
    PathEscape { path: PathBuf, root: PathBuf },

    /// Copy and extraction refuse to follow symlinks
    #[error("refusing to copy symlink: {path}")]
    SymlinkRefused { path: PathBuf },

    /// The source locator is not a supported tree URL
    #[error("invalid source locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// The requested version is not a three-component numeric version
    #[error("invalid version {requested:?} (expected MAJOR.MINOR.PATCH, e.g. 1.2.0)")]
    InvalidVersion { requested: String },

    /// The manifest declares a schema marker this build cannot read
    #[error("unsupported gdpm.json schemaVersion {found:?} (expected {expected:?})\n\nUpgrade gdpm to read this manifest.")]
    UnsupportedSchema { found: String, expected: &'static str },

    /// Link data was found in the shareable manifest
    #[error("plugin {key} has a \"link\" field in gdpm.json; link state belongs in gdpm.link.json")]
    LinkInPrimary { key: String },

    /// A link entry is enabled without a path
    #[error("gdpm.link.json entry {key} is enabled but has no path")]
    LinkWithoutPath { key: String },

    /// The project configuration file holds an unexpected value
    #[error("invalid project.godot: {reason}")]
    ProjectConfig { reason: String },

    /// The home directory could not be determined
    #[error("could not determine the home directory")]
    HomeDirUnavailable,

    /// Version resolution failed
    #[error("failed to resolve {owner}/{repo}: {reason}")]
    Resolve {
        owner: String,
        repo: String,
        reason: String,
    },

    /// Fetching or extracting a source tree failed
    #[error("failed to materialize {locator}: {reason}")]
    Materialize { locator: String, reason: String },

    /// The HTTP client could not be constructed
    #[error("failed to create HTTP client: {reason}")]
    HttpClient { reason: String },

    /// Filesystem failure tied to a path
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure tied to a file
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Settings file failure
    #[error("failed to parse settings {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the action and path that produced it
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by user input rather than the environment.
    ///
    /// The CLI maps these onto exit code 2.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Error::ManifestMissing { .. }
                | Error::InvalidSpec { .. }
                | Error::UnexpectedVersion { .. }
                | Error::InvalidDirName { .. }
                | Error::DirCollision { .. }
                | Error::PluginNotFound { .. }
                | Error::PluginExists { .. }
                | Error::NotLinked { .. }
                | Error::LinkPathMissing { .. }
                | Error::NoSource { .. }
                | Error::DescriptorMissing { .. }
                | Error::DescriptorIsDir { .. }
                | Error::NotADirectory { .. }
                | Error::DestinationExists { .. }
                | Error::AddonNotDirectory { .. }
                | Error::InvalidSubdir { .. }
                | Error::InvalidLocator { .. }
                | Error::InvalidVersion { .. }
        )
    }
}
