//! The manifest library: a directory of manifests, one file per repository,
//! plus a per-invocation cache of everything loaded from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::manifest::{FetchError, load};
use crate::repo::Repo;

#[derive(Debug, Error)]
pub enum LibraryError {
  #[error("failed to read library directory '{0}': {1}")]
  ReadDir(PathBuf, #[source] std::io::Error),

  #[error("need at least one repo (either explicitly or via --all)")]
  NoRepos,

  #[error("failed fetching repo {reference:?}: {source}")]
  Fetch {
    reference: String,
    #[source]
    source: FetchError,
  },
}

#[derive(Debug)]
pub struct Library {
  dir: PathBuf,
  repos: HashMap<String, Rc<Repo>>,
}

impl Library {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      repos: HashMap::new(),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Paths of every manifest in the library, sorted by name.
  pub fn all_references(&self) -> Result<Vec<String>, LibraryError> {
    let read_err = |e| LibraryError::ReadDir(self.dir.clone(), e);
    let mut names = Vec::new();
    for dirent in std::fs::read_dir(&self.dir).map_err(read_err)? {
      let dirent = dirent.map_err(read_err)?;
      if dirent.file_type().map_err(read_err)?.is_dir() {
        continue;
      }
      names.push(dirent.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(
      names
        .into_iter()
        .map(|name| self.dir.join(name).to_string_lossy().into_owned())
        .collect(),
    )
  }

  /// The repos to operate on: every library manifest when `all` is set, then
  /// the explicitly named ones.
  pub fn references(&self, all: bool, explicit: &[String]) -> Result<Vec<String>, LibraryError> {
    let mut references = if all { self.all_references()? } else { Vec::new() };
    references.extend(explicit.iter().cloned());
    if references.is_empty() {
      return Err(LibraryError::NoRepos);
    }
    Ok(references)
  }

  /// Load `reference`, reusing an earlier load of the same reference.
  pub fn load(&mut self, reference: &str) -> Result<Rc<Repo>, LibraryError> {
    if let Some(repo) = self.repos.get(reference) {
      return Ok(Rc::clone(repo));
    }

    debug!(reference, library = %self.dir.display(), "loading repo");
    let loaded = load(&self.dir, reference).map_err(|source| LibraryError::Fetch {
      reference: reference.to_string(),
      source,
    })?;
    let repo = Rc::new(Repo::from_loaded(loaded));
    self.repos.insert(reference.to_string(), Rc::clone(&repo));
    Ok(repo)
  }

  pub fn load_all(&mut self, references: &[String]) -> Result<Vec<Rc<Repo>>, LibraryError> {
    references.iter().map(|r| self.load(r)).collect()
  }
}
