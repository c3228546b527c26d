//! Per-invocation resolution context.
//!
//! The [`Resolver`] owns the git and image collaborators together with every
//! memo table built while answering questions about entries: resolved commits,
//! parsed Dockerfiles and image ids. It is created once per command and passed
//! by `&mut` to whatever needs it.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::SCRATCH;
use crate::dockerfile::{DockerfileError, DockerfileMetadata, parse_metadata};
use crate::fingerprint::{self, CacheFingerprint};
use crate::git::{GitError, GitLocation, GitSource};
use crate::image::{ImageError, ImageInspector};
use crate::manifest::ManifestEntry;
use crate::platform::Arch;
use crate::util::path;

/// Errors raised while resolving an entry's build inputs.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("failed fetching git repo for tags {tags:?} (arch {arch}): {source}")]
  Commit {
    tags: String,
    arch: Arch,
    #[source]
    source: GitError,
  },

  #[error("failed reading '{path}' at commit {commit}: {source}")]
  ReadDockerfile {
    commit: String,
    path: String,
    #[source]
    source: GitError,
  },

  #[error("failed parsing '{path}' at commit {commit}: {source}")]
  ParseDockerfile {
    commit: String,
    path: String,
    #[source]
    source: DockerfileError,
  },

  #[error(transparent)]
  Image(#[from] ImageError),
}

/// An entry's build-source fields for one architecture, with the commit
/// resolved to a concrete hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedEntry {
  pub arch: Arch,
  pub git_repo: String,
  pub git_fetch: String,
  pub git_commit: String,
  pub directory: String,
  pub file: String,
}

impl ResolvedEntry {
  /// Path of the build file inside the commit's tree.
  pub fn dockerfile_path(&self) -> String {
    path::join(&self.directory, &self.file)
  }
}

pub struct Resolver {
  git: Box<dyn GitSource>,
  images: Box<dyn ImageInspector>,
  commits: HashMap<GitLocation, String>,
  metadata: HashMap<(String, String), Rc<DockerfileMetadata>>,
  image_ids: HashMap<String, String>,
}

impl Resolver {
  pub fn new(git: Box<dyn GitSource>, images: Box<dyn ImageInspector>) -> Self {
    let mut image_ids = HashMap::new();
    image_ids.insert(SCRATCH.to_string(), SCRATCH.to_string());
    Self {
      git,
      images,
      commits: HashMap::new(),
      metadata: HashMap::new(),
      image_ids,
    }
  }

  /// Resolve a git location to a full commit, at most once per location.
  pub fn resolve_commit(&mut self, location: &GitLocation) -> Result<String, GitError> {
    if let Some(commit) = self.commits.get(location) {
      return Ok(commit.clone());
    }
    let commit = self.git.resolve_commit(location)?;
    debug!(repo = %location.repo, fetch = %location.fetch, commit = %commit, "resolved commit");
    self.commits.insert(location.clone(), commit.clone());
    Ok(commit)
  }

  /// A resolved copy of `entry`'s build source for `arch`. The entry itself is
  /// left untouched.
  pub fn resolve_entry(&mut self, entry: &ManifestEntry, arch: Arch) -> Result<ResolvedEntry, ResolveError> {
    let location = GitLocation::new(
      entry.arch_git_repo(arch),
      entry.arch_git_fetch(arch),
      entry.arch_git_commit(arch),
    );
    let git_commit = self
      .resolve_commit(&location)
      .map_err(|source| ResolveError::Commit {
        tags: entry.tags_string(),
        arch,
        source,
      })?;

    Ok(ResolvedEntry {
      arch,
      git_repo: location.repo,
      git_fetch: location.fetch,
      git_commit,
      directory: entry.arch_directory(arch).to_string(),
      file: entry.arch_file(arch).to_string(),
    })
  }

  /// Parsed build file of a resolved entry, memoized by commit and path.
  pub fn metadata(&mut self, resolved: &ResolvedEntry) -> Result<Rc<DockerfileMetadata>, ResolveError> {
    let path = resolved.dockerfile_path();
    let key = (resolved.git_commit.clone(), path.clone());
    if let Some(meta) = self.metadata.get(&key) {
      return Ok(Rc::clone(meta));
    }

    let commit = resolved.git_commit.clone();
    let text = self
      .git
      .show_file(&commit, &path)
      .map_err(|source| ResolveError::ReadDockerfile {
        commit: commit.clone(),
        path: path.clone(),
        source,
      })?;
    let meta = Rc::new(parse_metadata(&text).map_err(|source| ResolveError::ParseDockerfile {
      commit,
      path,
      source,
    })?);

    self.metadata.insert(key, Rc::clone(&meta));
    Ok(meta)
  }

  /// Resolve `entry` for `arch` and parse its build file.
  pub fn entry_metadata(
    &mut self,
    entry: &ManifestEntry,
    arch: Arch,
  ) -> Result<(ResolvedEntry, Rc<DockerfileMetadata>), ResolveError> {
    let resolved = self.resolve_entry(entry, arch)?;
    let meta = self.metadata(&resolved)?;
    Ok((resolved, meta))
  }

  /// Every image `entry` pulls in when built for `arch`.
  pub fn froms(&mut self, entry: &ManifestEntry, arch: Arch) -> Result<Vec<String>, ResolveError> {
    Ok(self.entry_metadata(entry, arch)?.1.froms.clone())
  }

  /// The image the final stage of `entry` is built on.
  pub fn last_stage_from(&mut self, entry: &ManifestEntry, arch: Arch) -> Result<Option<String>, ResolveError> {
    let (_, meta) = self.entry_metadata(entry, arch)?;
    Ok(meta.last_stage_from().map(str::to_string))
  }

  /// Id of a locally available image, memoized per reference.
  pub fn image_id(&mut self, reference: &str) -> Result<String, ImageError> {
    if let Some(id) = self.image_ids.get(reference) {
      return Ok(id.clone());
    }
    let id = self.images.image_id(reference)?;
    self.image_ids.insert(reference.to_string(), id.clone());
    Ok(id)
  }

  /// Cache fingerprint of `entry` built for `arch`.
  pub fn fingerprint(&mut self, entry: &ManifestEntry, arch: Arch) -> Result<CacheFingerprint, ResolveError> {
    let (resolved, meta) = self.entry_metadata(entry, arch)?;
    let fingerprint = fingerprint::compute(&resolved, &meta.froms, |from| self.image_id(from))?;
    debug!(tags = %entry.tags_string(), digest = %fingerprint, "computed cache fingerprint");
    Ok(fingerprint)
  }
}
