//! The legacy one-entry-per-line manifest format:
//!
//! ```text
//! # maintainer: Full Name <email> (@handle)
//! 1.0: https://github.com/example/image.git@<commit-or-tag> <directory>
//! ```

use super::types::{LIST_SEPARATOR, Manifest, ManifestEntry, ParseError, is_commit};
use crate::consts::{FETCH_HEAD, LINE_BASED_GIT_FETCH};

const MAINTAINER_PREFIX: &str = "# maintainer: ";

/// Parse one `tag: repo@ref [directory]` line on top of `defaults`.
pub fn parse_line(line: &str, line_no: usize, defaults: &ManifestEntry) -> Result<ManifestEntry, ParseError> {
  let mut entry = defaults.clone();

  let Some((tag, rest)) = line.split_once(':') else {
    return Err(ParseError::Syntax {
      line: line_no,
      message: format!("manifest line missing ':': {}", line),
    });
  };
  entry.tags = vec![tag.trim().to_string()];

  let Some((repo, rest)) = rest.split_once('@') else {
    return Err(ParseError::Syntax {
      line: line_no,
      message: format!("manifest line missing '@': {}", line),
    });
  };
  entry.git_repo = repo.trim().to_string();

  let rest = rest.trim_start();
  match rest.split_once(' ') {
    Some((commit, directory)) => {
      entry.git_commit = commit.trim().to_string();
      entry.directory = directory.trim().to_string();
    }
    None => entry.git_commit = rest.trim().to_string(),
  }

  if entry.git_fetch == LINE_BASED_GIT_FETCH && !is_commit(&entry.git_commit) {
    entry.git_fetch = format!("refs/tags/{}", entry.git_commit);
    entry.git_commit = FETCH_HEAD.to_string();
  }

  Ok(entry)
}

/// Parse a complete line-based manifest.
pub fn parse_line_based(text: &str) -> Result<Manifest, ParseError> {
  let mut manifest = Manifest::default();
  manifest.global.git_fetch = LINE_BASED_GIT_FETCH.to_string();

  for (idx, raw) in text.lines().enumerate() {
    let line = raw.trim();
    if line.is_empty() {
      continue;
    }
    if line.starts_with('#') {
      if let Some(maintainer) = line.strip_prefix(MAINTAINER_PREFIX) {
        manifest.global.maintainers.push(maintainer.to_string());
      }
      continue;
    }

    let entry = parse_line(line, idx + 1, &manifest.global)?;
    manifest.add_entry(entry)?;
  }

  if manifest.global.maintainers.is_empty() {
    return Err(ParseError::MissingMaintainers);
  }
  let invalid = manifest.global.invalid_maintainers();
  if !invalid.is_empty() {
    return Err(ParseError::InvalidMaintainers {
      maintainers: invalid.join(LIST_SEPARATOR),
    });
  }

  Ok(manifest)
}
