//! Reference collaborators backed by GitHub
//!
//! [`GitHubResolver`] turns `owner/repo[@version]` into a commit-pinned tree
//! URL using the repository's tags; [`GitHubArchive`] downloads and safely
//! extracts that tree.

mod archive;
mod github;
pub mod version;

pub use archive::extract_tar_gz;
pub use github::{
    GitHubArchive, GitHubConfig, GitHubResolver, DEFAULT_API_BASE_URL, DEFAULT_ARCHIVE_BASE_URL,
};
