//! Git access: resolving build contexts to commits and reading files from them.
//!
//! [`GitSource`] is the seam the resolver talks to; [`GixSource`] implements it
//! on top of a single bare repository in the cache directory.

mod gix_source;

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::consts::GIT_CACHE_REF_PREFIX;

pub use gix_source::GixSource;

/// Errors that can occur while talking to git.
#[derive(Debug, Error)]
pub enum GitError {
  /// Failed to create or open the cache repository.
  #[error("failed to open git cache at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to fetch from remote.
  #[error("failed to fetch '{refspec}' from '{url}': {source}")]
  Fetch {
    url: String,
    refspec: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The revision could not be found, even after fetching.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// The commit exists but has no such file.
  #[error("file '{path}' not found at commit {commit}")]
  FileNotFound { commit: String, path: String },

  /// Failed to read an object.
  #[error("failed to read '{path}' at commit {commit}: {source}")]
  Read {
    commit: String,
    path: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// Where an entry's build context lives, as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitLocation {
  pub repo: String,
  pub fetch: String,
  /// A (possibly abbreviated) commit, or `FETCH_HEAD`.
  pub commit: String,
}

impl GitLocation {
  pub fn new(repo: impl Into<String>, fetch: impl Into<String>, commit: impl Into<String>) -> Self {
    Self {
      repo: repo.into(),
      fetch: fetch.into(),
      commit: commit.into(),
    }
  }

  /// Key identifying this location in memo tables.
  pub fn cache_key(&self) -> String {
    [self.repo.as_str(), self.fetch.as_str(), self.commit.as_str()].join("\n")
  }

  /// Local ref that pins whatever was fetched for this location.
  pub fn cache_ref(&self) -> String {
    let key: String = self
      .cache_key()
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
      .collect();
    format!("{}/{}", GIT_CACHE_REF_PREFIX, key)
  }
}

/// Access to git objects.
pub trait GitSource {
  /// Resolve `location` to a full commit hash, fetching if needed.
  fn resolve_commit(&mut self, location: &GitLocation) -> Result<String, GitError>;

  /// Contents of `path` at `commit`.
  fn show_file(&mut self, commit: &str, path: &str) -> Result<String, GitError>;
}

/// Upgrade `git://github.com/` URLs to https, which is all GitHub still serves.
pub fn secure_repo_url(url: &str) -> String {
  match url.strip_prefix("git://github.com/") {
    Some(rest) => {
      warn!(url, "insecure protocol git:// detected, using https");
      format!("https://github.com/{}", rest)
    }
    None => url.to_string(),
  }
}
