//! Plugin spec parsing (`@owner/repo[@version]`)

use std::fmt;

use crate::error::{Error, Result};

/// Canonical `@owner/name` (or owner-less `@name`) identity of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginKey(String);

impl PluginKey {
    /// Wrap a key read from a trusted source (the manifest) without validation
    pub fn from_manifest(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parse a bare key: `@owner/repo`, `@name` or `name`.
    ///
    /// Version qualifiers are rejected with the name of `command`.
    pub fn parse_bare(input: &str, command: &'static str) -> Result<Self> {
        let trimmed = input.trim();
        let with_at = if trimmed.starts_with('@') {
            trimmed.to_string()
        } else {
            format!("@{trimmed}")
        };

        if with_at.contains('/') {
            let spec = PluginSpec::parse(&with_at)?;
            if spec.version.is_some() {
                return Err(Error::UnexpectedVersion { command });
            }
            return Ok(spec.key());
        }

        let name = &with_at[1..];
        if name.is_empty() {
            return Err(Error::InvalidSpec {
                spec: input.to_string(),
                reason: "missing plugin name".to_string(),
            });
        }
        if name.contains('@') {
            return Err(Error::UnexpectedVersion { command });
        }
        Ok(Self(with_at))
    }

    /// Key derived from a local directory name for path-only links.
    ///
    /// A leading `@` is dropped and spaces become underscores.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let base = name.trim().trim_start_matches('@').replace(' ', "_");
        if base.is_empty() {
            return None;
        }
        Some(Self(format!("@{base}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed `@owner/repo[@version]` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    pub owner: String,
    pub repo: String,
    pub version: Option<String>,
}

impl PluginSpec {
    /// Parse a spec string
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let invalid = |reason: &str| Error::InvalidSpec {
            spec: input.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty spec"));
        }
        let Some(rest) = s.strip_prefix('@') else {
            return Err(invalid("spec must start with @"));
        };

        let mut parts = rest.split('@');
        let repo_part = parts.next().unwrap_or_default();
        let version = parts.next();
        if parts.next().is_some() {
            return Err(invalid("expected @owner/repo[@version]"));
        }
        if repo_part.is_empty() {
            return Err(invalid("missing owner/repo"));
        }

        let bits: Vec<&str> = repo_part.split('/').collect();
        if bits.len() != 2 || bits[0].is_empty() || bits[1].is_empty() {
            return Err(invalid("expected owner/repo"));
        }

        let version = match version {
            Some(v) if v.trim().is_empty() => return Err(invalid("empty version")),
            Some(v) => Some(v.trim().to_string()),
            None => None,
        };

        Ok(Self {
            owner: bits[0].to_string(),
            repo: bits[1].to_string(),
            version,
        })
    }

    /// The manifest key for this spec
    pub fn key(&self) -> PluginKey {
        PluginKey(format!("@{}/{}", self.owner, self.repo))
    }

    /// Reject a version qualifier for commands that do not take one
    pub fn require_unversioned(&self, command: &'static str) -> Result<()> {
        match self.version {
            Some(_) => Err(Error::UnexpectedVersion { command }),
            None => Ok(()),
        }
    }
}
