//! Content-addressed build fingerprints.
//!
//! An entry's fingerprint covers everything that can change the image it
//! produces: the source repository, the resolved commit, the build context
//! directory, the build file and the id of every image it pulls in. Two builds
//! with equal fingerprints produce interchangeable images, so a previously
//! built image tagged with the fingerprint can be reused.

use std::fmt;

use serde::Serialize;

use crate::consts::{CACHE_TAG_NAMESPACE, SCRATCH};
use crate::resolver::ResolvedEntry;
use crate::util::hash::{ContentHash, hash_lines};

/// SHA-256 over an entry's unique build inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheFingerprint(ContentHash);

impl CacheFingerprint {
  /// The 64-character lowercase hex digest.
  pub fn digest(&self) -> &str {
    &self.0.0
  }

  /// Local image tag under which a build with this fingerprint is cached.
  pub fn cache_tag(&self) -> String {
    format!("{}:{}", CACHE_TAG_NAMESPACE, self.digest())
  }
}

impl fmt::Display for CacheFingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The ordered inputs a fingerprint is computed over:
/// `[git_repo, commit, directory, file, image id of each from...]`.
///
/// `lookup` maps an image reference to its id; `scratch` never reaches it.
pub fn unique_bits<E>(
  resolved: &ResolvedEntry,
  froms: &[String],
  mut lookup: impl FnMut(&str) -> Result<String, E>,
) -> Result<Vec<String>, E> {
  let mut bits = vec![
    resolved.git_repo.clone(),
    resolved.git_commit.clone(),
    resolved.directory.clone(),
    resolved.file.clone(),
  ];
  for from in froms {
    let id = if from == SCRATCH {
      SCRATCH.to_string()
    } else {
      lookup(from)?
    };
    bits.push(id);
  }
  Ok(bits)
}

/// Compute the fingerprint of `resolved` built on `froms`.
pub fn compute<E>(
  resolved: &ResolvedEntry,
  froms: &[String],
  lookup: impl FnMut(&str) -> Result<String, E>,
) -> Result<CacheFingerprint, E> {
  let bits = unique_bits(resolved, froms, lookup)?;
  Ok(CacheFingerprint(hash_lines(&bits)))
}
