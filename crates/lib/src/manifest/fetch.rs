//! Locating and loading manifests.
//!
//! A manifest reference is `repo[:tag]` where `repo` is, in order of precedence:
//! an http(s) URL, a file path (absolute or containing a separator), or a name
//! inside the library directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::parse::parse;
use super::types::{Manifest, ParseError};

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to download manifest from '{url}': {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to read manifest '{0}': {1}")]
  Read(PathBuf, #[source] std::io::Error),

  #[error("failed to parse manifest for {repo:?}: {source}")]
  Parse {
    repo: String,
    #[source]
    source: ParseError,
  },

  #[error("tag not found in manifest for {repo:?}: {tag:?}")]
  TagNotFound { repo: String, tag: String },

  #[error("unable to find a manifest named {reference:?} (in '{library}' or as a remote URL)")]
  NotFound { reference: String, library: PathBuf },
}

/// A manifest together with the name it was loaded under.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
  /// Base name of the reference, without any `:tag` suffix.
  pub repo_name: String,
  /// Tag selected with `repo:tag`, if any.
  pub tag_name: Option<String>,
  pub manifest: Manifest,
}

/// Split `reference` into the location and the selected tag.
///
/// Only a `:` inside the final path component (after its first character) starts
/// a tag, so `https://...` and `C:\...` style prefixes are left alone.
pub fn split_reference(reference: &str) -> (String, String, Option<String>) {
  let base = reference.rsplit(['/', '\\']).next().unwrap_or(reference);
  match base.find(':') {
    Some(idx) if idx > 0 => {
      let tag = &base[idx + 1..];
      let location = &reference[..reference.len() - tag.len() - 1];
      (location.to_string(), base[..idx].to_string(), Some(tag.to_string()))
    }
    _ => (reference.to_string(), base.to_string(), None),
  }
}

fn is_remote(location: &str) -> bool {
  location.starts_with("http://") || location.starts_with("https://")
}

/// Load the manifest named by `reference`, looking in `library` for bare names.
pub fn load(library: &Path, reference: &str) -> Result<LoadedManifest, FetchError> {
  let (location, repo_name, tag_name) = split_reference(reference);

  let text = if is_remote(&location) {
    info!(url = %location, "downloading manifest");
    download(&location)?
  } else {
    read_local(library, &location)?
  };

  let manifest = parse(&text).map_err(|source| FetchError::Parse {
    repo: repo_name.clone(),
    source,
  })?;

  if let Some(tag) = tag_name.as_deref()
    && manifest.get_tag(tag).is_none()
    && manifest.get_shared_tag(tag).is_empty()
  {
    return Err(FetchError::TagNotFound {
      repo: repo_name,
      tag: tag.to_string(),
    });
  }

  Ok(LoadedManifest {
    repo_name,
    tag_name,
    manifest,
  })
}

fn download(url: &str) -> Result<String, FetchError> {
  let to_err = |source| FetchError::Http {
    url: url.to_string(),
    source,
  };
  reqwest::blocking::get(url)
    .and_then(|resp| resp.error_for_status())
    .and_then(|resp| resp.text())
    .map_err(to_err)
}

fn read_local(library: &Path, location: &str) -> Result<String, FetchError> {
  let path = Path::new(location);
  let mut candidates = Vec::new();
  if path.is_absolute() || location.contains('/') || location.contains(std::path::MAIN_SEPARATOR) {
    candidates.push(path.to_path_buf());
  }
  if !path.is_absolute() {
    candidates.push(library.join(location));
  }

  for candidate in candidates {
    match std::fs::read_to_string(&candidate) {
      Ok(text) => {
        debug!(path = %candidate.display(), "loaded manifest");
        return Ok(text);
      }
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
      Err(err) => return Err(FetchError::Read(candidate, err)),
    }
  }

  Err(FetchError::NotFound {
    reference: location.to_string(),
    library: library.to_path_buf(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const MANIFEST: &str = "Maintainers: A (@a)\nGitRepo: https://x/y.git\n\nTags: 1.0, latest\nSharedTags: stable\nGitCommit: abc\n";

  #[test]
  fn split_reference_forms() {
    assert_eq!(
      split_reference("busybox:latest"),
      ("busybox".to_string(), "busybox".to_string(), Some("latest".to_string()))
    );
    assert_eq!(
      split_reference("./library/busybox"),
      ("./library/busybox".to_string(), "busybox".to_string(), None)
    );
    assert_eq!(
      split_reference("https://example.com/library/busybox:1.36"),
      (
        "https://example.com/library/busybox".to_string(),
        "busybox".to_string(),
        Some("1.36".to_string())
      )
    );
  }

  #[test]
  fn loads_from_library() {
    let library = TempDir::new().unwrap();
    std::fs::write(library.path().join("busybox"), MANIFEST).unwrap();

    let loaded = load(library.path(), "busybox:stable").unwrap();
    assert_eq!(loaded.repo_name, "busybox");
    assert_eq!(loaded.tag_name.as_deref(), Some("stable"));
    assert_eq!(loaded.manifest.entries.len(), 1);
  }

  #[test]
  fn loads_from_path() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("custom");
    std::fs::write(&file, MANIFEST).unwrap();

    let loaded = load(Path::new("/nonexistent"), file.to_str().unwrap()).unwrap();
    assert_eq!(loaded.repo_name, "custom");
    assert_eq!(loaded.tag_name, None);
  }

  #[test]
  fn unknown_tag_is_an_error() {
    let library = TempDir::new().unwrap();
    std::fs::write(library.path().join("busybox"), MANIFEST).unwrap();

    let err = load(library.path(), "busybox:2.0").unwrap_err();
    assert!(matches!(err, FetchError::TagNotFound { tag, .. } if tag == "2.0"));
  }

  #[test]
  fn missing_manifest() {
    let library = TempDir::new().unwrap();
    let err = load(library.path(), "nope").unwrap_err();
    assert!(matches!(err, FetchError::NotFound { .. }));
  }

  #[test]
  fn parse_failure_names_repo() {
    let library = TempDir::new().unwrap();
    std::fs::write(library.path().join("broken"), "garbage\n").unwrap();

    let err = load(library.path(), "broken").unwrap_err();
    assert!(matches!(err, FetchError::Parse { repo, .. } if repo == "broken"));
  }
}
