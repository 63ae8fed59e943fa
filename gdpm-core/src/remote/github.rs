//! GitHub-backed resolver and materializer

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::archive::extract_tar_gz;
use super::version::{parse_request, select_tag, Tag};
use crate::error::{Error, Result};
use crate::source::{Materializer, Resolution, Resolver, SourceLocator};

/// Default REST API base
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default tarball host
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://codeload.github.com";

/// Tags fetched per page
const TAGS_PER_PAGE: usize = 100;

/// Upper bound on tag pages walked for one resolution
const MAX_TAG_PAGES: usize = 10;

/// Endpoints and credentials for the GitHub collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub api_base_url: String,
    pub archive_base_url: String,
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            token: None,
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("gdpm/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::HttpClient {
            reason: e.to_string(),
        })
}

fn authorized(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

#[derive(Debug, Deserialize)]
struct TagDto {
    name: String,
    commit: CommitDto,
}

#[derive(Debug, Deserialize)]
struct CommitDto {
    sha: String,
}

/// Resolves versions from a repository's tags
pub struct GitHubResolver {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubResolver {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>> {
        let fail = |reason: String| Error::Resolve {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reason,
        };
        let base = format!(
            "{}/repos/{}/{}/tags",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );

        let mut tags = Vec::new();
        for page in 1..=MAX_TAG_PAGES {
            let url = format!("{base}?per_page={TAGS_PER_PAGE}&page={page}");
            tracing::debug!("GET {url}");
            let response = authorized(self.client.get(&url), self.config.token.as_deref())
                .header("Accept", "application/vnd.github+json")
                .send()
                .await
                .map_err(|e| fail(format!("request failed: {e}")))?;

            match response.status() {
                StatusCode::NOT_FOUND => return Err(fail("repository not found".to_string())),
                status if !status.is_success() => {
                    return Err(fail(format!("GitHub API returned HTTP {status}")))
                }
                _ => {}
            }

            let batch: Vec<TagDto> = response
                .json()
                .await
                .map_err(|e| fail(format!("unexpected tags response: {e}")))?;
            let done = batch.len() < TAGS_PER_PAGE;
            tags.extend(batch.into_iter().map(|dto| Tag {
                name: dto.name,
                commit: dto.commit.sha,
            }));
            if done {
                break;
            }
        }
        Ok(tags)
    }
}

#[async_trait]
impl Resolver for GitHubResolver {
    async fn resolve(&self, owner: &str, repo: &str, constraint: Option<&str>) -> Result<Resolution> {
        let requested = constraint.map(parse_request).transpose()?;
        let tags = self.list_tags(owner, repo).await?;

        let Some((tag, version)) = select_tag(&tags, requested.as_ref()) else {
            let reason = match &requested {
                Some(v) => format!("no tag for version {v}"),
                None => "no semver tags found".to_string(),
            };
            return Err(Error::Resolve {
                owner: owner.to_string(),
                repo: repo.to_string(),
                reason,
            });
        };

        tracing::info!("resolved {owner}/{repo} {} -> {}", tag.name, tag.commit);
        Ok(Resolution {
            locator: SourceLocator::new(owner, repo, &tag.commit),
            version: version.to_string(),
        })
    }
}

/// Downloads and extracts a repository tarball at a ref
pub struct GitHubArchive {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubArchive {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn tarball_url(&self, locator: &SourceLocator) -> String {
        format!(
            "{}/{}/{}/tar.gz/{}",
            self.config.archive_base_url.trim_end_matches('/'),
            urlencoding::encode(&locator.owner),
            urlencoding::encode(&locator.repo),
            urlencoding::encode(&locator.reference)
        )
    }
}

#[async_trait]
impl Materializer for GitHubArchive {
    async fn materialize(&self, locator: &SourceLocator, dest: &Path) -> Result<PathBuf> {
        let label = locator.to_string();
        let fail = |reason: String| Error::Materialize {
            locator: label.clone(),
            reason,
        };

        let url = self.tarball_url(locator);
        tracing::info!("downloading {url}");
        let response = authorized(self.client.get(&url), self.config.token.as_deref())
            .send()
            .await
            .map_err(|e| fail(format!("download failed: {e}")))?;
        if !response.status().is_success() {
            return Err(fail(format!("download returned HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(format!("download interrupted: {e}")))?;

        tracing::debug!("extracting {} bytes into {}", bytes.len(), dest.display());
        extract_tar_gz(&bytes, dest, &label)
    }
}
