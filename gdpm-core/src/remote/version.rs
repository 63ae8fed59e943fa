//! Tag selection for version requests

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

static REQUEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?\d+\.\d+\.\d+$").expect("version request pattern is valid"));

/// A repository tag and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit: String,
}

/// Parse a requested version; only `MAJOR.MINOR.PATCH` (optionally `v`-prefixed)
pub fn parse_request(requested: &str) -> Result<Version> {
    let trimmed = requested.trim();
    let invalid = || Error::InvalidVersion {
        requested: requested.to_string(),
    };
    if !REQUEST_RE.is_match(trimmed) {
        return Err(invalid());
    }
    Version::parse(trimmed.trim_start_matches('v')).map_err(|_| invalid())
}

/// Semver of a tag name, if it has one
pub fn tag_version(name: &str) -> Option<Version> {
    Version::parse(name.trim().trim_start_matches('v')).ok()
}

/// Pick the tag matching `requested`, or the highest stable semver tag.
///
/// Tags without a semver name are ignored.
pub fn select_tag<'a>(tags: &'a [Tag], requested: Option<&Version>) -> Option<(&'a Tag, Version)> {
    let mut versioned = tags
        .iter()
        .filter_map(|tag| tag_version(&tag.name).map(|v| (tag, v)));
    match requested {
        Some(req) => versioned.find(|(_, v)| v == req),
        None => versioned
            .filter(|(_, v)| v.pre.is_empty())
            .max_by(|(_, a), (_, b)| a.cmp(b)),
    }
}
