//! Source locators and the external collaborator seam
//!
//! Resolution (`owner/repo/version -> locator`) and materialization
//! (`locator -> local tree`) are consumed through the [`Resolver`] and
//! [`Materializer`] traits so the orchestrator never talks to the network
//! directly.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::error::{Error, Result};

static COMMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("commit pattern is valid"));

/// Where a plugin's content comes from: a ref of a GitHub repository,
/// optionally narrowed to a subdirectory.
///
/// Serialized as `https://github.com/<owner>/<repo>/tree/<ref>[/<subdir>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub subdir: Option<String>,
}

impl SourceLocator {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            reference: reference.into(),
            subdir: None,
        }
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        let subdir = subdir.into();
        let trimmed = subdir.trim_matches('/');
        self.subdir = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Subdirectory inside the materialized tree, empty for the root
    pub fn subdir(&self) -> &str {
        self.subdir.as_deref().unwrap_or("")
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://github.com/{}/{}/tree/{}",
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            urlencoding::encode(&self.reference)
        )?;
        if let Some(subdir) = &self.subdir {
            for segment in subdir.split('/') {
                write!(f, "/{}", urlencoding::encode(segment))?;
            }
        }
        Ok(())
    }
}

impl FromStr for SourceLocator {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidLocator {
            locator: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
        if url.host_str() != Some("github.com") {
            return Err(invalid("expected a github.com tree URL"));
        }

        let segments: Vec<String> = url
            .path_segments()
            .ok_or_else(|| invalid("missing path"))?
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .map_err(|_| invalid("path is not valid UTF-8"))
            })
            .collect::<Result<_>>()?;

        let [owner, repo, tree, rest @ ..] = segments.as_slice() else {
            return Err(invalid("expected /<owner>/<repo>/tree/<ref>"));
        };
        if tree != "tree" || rest.is_empty() {
            return Err(invalid("expected /<owner>/<repo>/tree/<ref>"));
        }

        // A subdirectory is only unambiguous after a commit id
        let locator = if COMMIT_RE.is_match(&rest[0]) {
            Self::new(owner, repo, &rest[0]).with_subdir(rest[1..].join("/"))
        } else {
            Self::new(owner, repo, rest.join("/"))
        };
        Ok(locator)
    }
}

/// Output of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub locator: SourceLocator,
    /// Display version recorded in the manifest
    pub version: String,
}

/// Resolves an owner/repo and optional version constraint to a locator
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, owner: &str, repo: &str, constraint: Option<&str>) -> Result<Resolution>;
}

/// Fetches a locator's tree into a caller-owned directory
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Materialize `locator` somewhere under `dest` and return the tree root.
    ///
    /// `dest` exists and is owned by the caller, which removes it afterwards.
    async fn materialize(&self, locator: &SourceLocator, dest: &Path) -> Result<PathBuf>;
}
