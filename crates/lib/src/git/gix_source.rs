use std::fs;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use tracing::{debug, info};

use super::{GitError, GitLocation, GitSource, secure_repo_url};
use crate::consts::FETCH_HEAD;
use crate::manifest::is_commit;

/// [`GitSource`] backed by one bare repository that accumulates every fetched
/// build context.
///
/// The repository is created lazily on first use.
pub struct GixSource {
  path: PathBuf,
  repo: Option<gix::Repository>,
}

impl GixSource {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      repo: None,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn repo(&mut self) -> Result<&gix::Repository, GitError> {
    let repo = match self.repo.take() {
      Some(repo) => repo,
      None => open_or_init(&self.path)?,
    };
    Ok(self.repo.insert(repo))
  }
}

fn open_or_init(path: &Path) -> Result<gix::Repository, GitError> {
  let to_err = |source: Box<dyn std::error::Error + Send + Sync>| GitError::Open {
    path: path.to_path_buf(),
    source,
  };

  if path.join("HEAD").exists() {
    debug!(path = %path.display(), "opening git cache");
    return gix::open(path).map_err(|e| to_err(Box::new(e)));
  }

  info!(path = %path.display(), "initializing git cache");
  fs::create_dir_all(path).map_err(|e| to_err(Box::new(e)))?;
  gix::init_bare(path).map_err(|e| to_err(Box::new(e)))
}

/// Resolve `rev` to the commit it names, if the object is present.
fn lookup_commit(repo: &gix::Repository, rev: &str) -> Option<String> {
  let id = repo.rev_parse(rev).ok()?.single()?;
  let commit = id.object().ok()?.peel_to_commit().ok()?;
  Some(commit.id.to_string())
}

/// Refspec that stores `location.fetch` under `local_ref`.
///
/// A wildcard source needs a wildcard destination, so every matching ref
/// lands under `local_ref/`.
fn fetch_refspec(location: &GitLocation, local_ref: &str) -> String {
  if location.fetch.ends_with("/*") {
    format!("+{}:{}/*", location.fetch, local_ref)
  } else {
    format!("+{}:{}", location.fetch, local_ref)
  }
}

fn fetch(repo: &gix::Repository, url: &str, refspec: &str) -> Result<(), GitError> {
  let to_err = |source: Box<dyn std::error::Error + Send + Sync>| GitError::Fetch {
    url: url.to_string(),
    refspec: refspec.to_string(),
    source,
  };

  info!(url, refspec, "fetching");
  let remote = repo
    .remote_at(url)
    .map_err(|e| to_err(Box::new(e)))?
    .with_refspecs([refspec], Direction::Fetch)
    .map_err(|e| to_err(Box::new(e)))?;

  remote
    .connect(Direction::Fetch)
    .map_err(|e| to_err(Box::new(e)))?
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| to_err(Box::new(e)))?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| to_err(Box::new(e)))?;

  Ok(())
}

impl GitSource for GixSource {
  fn resolve_commit(&mut self, location: &GitLocation) -> Result<String, GitError> {
    let repo = self.repo()?;
    let local_ref = location.cache_ref();
    let wants_fetch_head = location.commit == FETCH_HEAD;

    // a full hash that is already present never needs a network round trip
    if !wants_fetch_head
      && is_commit(&location.commit)
      && let Some(commit) = lookup_commit(repo, &location.commit)
    {
      debug!(commit = %commit, "commit already cached");
      return Ok(commit);
    }
    if wants_fetch_head && let Some(commit) = lookup_commit(repo, &local_ref) {
      debug!(reference = %local_ref, commit = %commit, "fetch already cached");
      return Ok(commit);
    }

    let url = secure_repo_url(&location.repo);
    fetch(repo, &url, &fetch_refspec(location, &local_ref))?;

    let rev = if wants_fetch_head {
      local_ref.as_str()
    } else {
      location.commit.as_str()
    };
    lookup_commit(repo, rev).ok_or_else(|| GitError::RevisionNotFound { rev: rev.to_string() })
  }

  fn show_file(&mut self, commit: &str, path: &str) -> Result<String, GitError> {
    let repo = self.repo()?;
    let to_err = |source: Box<dyn std::error::Error + Send + Sync>| GitError::Read {
      commit: commit.to_string(),
      path: path.to_string(),
      source,
    };

    let id = gix::ObjectId::from_hex(commit.as_bytes()).map_err(|_| GitError::RevisionNotFound {
      rev: commit.to_string(),
    })?;
    let tree = repo
      .find_object(id)
      .map_err(|_| GitError::RevisionNotFound { rev: commit.to_string() })?
      .peel_to_commit()
      .map_err(|e| to_err(Box::new(e)))?
      .tree()
      .map_err(|e| to_err(Box::new(e)))?;

    let entry = tree
      .lookup_entry_by_path(path)
      .map_err(|e| to_err(Box::new(e)))?
      .ok_or_else(|| GitError::FileNotFound {
        commit: commit.to_string(),
        path: path.to_string(),
      })?;
    let object = entry.object().map_err(|e| to_err(Box::new(e)))?;

    String::from_utf8(object.detach().data).map_err(|e| to_err(Box::new(e)))
  }
}
