//! Manifest text to [`Manifest`].

use tracing::debug;

use super::line_based::parse_line_based;
use super::rfc2822::{Paragraph, paragraphs, split_list};
use super::types::{
  ArchField, LIST_SEPARATOR, Manifest, ManifestEntry, ParseError, is_commit, is_fetch_ref,
};
use crate::platform::Arch;

/// Parse a manifest, trying RFC 2822 first and the legacy line-based format second.
pub fn parse(text: &str) -> Result<Manifest, ParseError> {
  match parse_rfc2822(text) {
    Ok(manifest) => Ok(manifest),
    Err(rfc2822) => {
      debug!(error = %rfc2822, "not an RFC 2822 manifest, trying line-based format");
      parse_line_based(text).map_err(|line_based| ParseError::EitherFormat {
        rfc2822: Box::new(rfc2822),
        line_based: Box::new(line_based),
      })
    }
  }
}

/// Parse an RFC 2822 manifest.
pub fn parse_rfc2822(text: &str) -> Result<Manifest, ParseError> {
  let mut paras = paragraphs(text)?.into_iter();
  let mut manifest = Manifest::default();

  let Some(global) = paras.next() else {
    return Err(ParseError::MissingMaintainers);
  };
  apply_paragraph(&mut manifest.global, &global, "global")?;

  if manifest.global.maintainers.is_empty() {
    return Err(ParseError::MissingMaintainers);
  }
  let invalid = manifest.global.invalid_maintainers();
  if !invalid.is_empty() {
    return Err(ParseError::InvalidMaintainers {
      maintainers: invalid.join(LIST_SEPARATOR),
    });
  }
  if !manifest.global.tags.is_empty() {
    return Err(ParseError::GlobalTags);
  }

  for para in paras {
    let mut entry = manifest.global.clone();
    apply_paragraph(&mut entry, &para, "entry")?;

    if entry.tags.is_empty() {
      return Err(ParseError::MissingTags);
    }
    if entry.git_repo.is_empty() || entry.git_fetch.is_empty() || entry.git_commit.is_empty() {
      return Err(ParseError::MissingGitFields {
        tags: entry.tags_string(),
      });
    }
    validate_git_refs(&entry)?;

    manifest.add_entry(entry)?;
  }

  Ok(manifest)
}

fn validate_git_refs(entry: &ManifestEntry) -> Result<(), ParseError> {
  let mut fetches = vec![(ArchField::GitFetch.key().to_string(), entry.git_fetch.as_str())];
  let mut commits = vec![(ArchField::GitCommit.key().to_string(), entry.git_commit.as_str())];
  for (arch, overrides) in &entry.arch_overrides {
    if let Some(fetch) = overrides.git_fetch.as_deref() {
      fetches.push((format!("{}-{}", arch, ArchField::GitFetch.key()), fetch));
    }
    if let Some(commit) = overrides.git_commit.as_deref() {
      commits.push((format!("{}-{}", arch, ArchField::GitCommit.key()), commit));
    }
  }

  for (field, value) in fetches {
    if !is_fetch_ref(value) {
      return Err(ParseError::InvalidGitFetch {
        tags: entry.tags_string(),
        field,
        value: value.to_string(),
      });
    }
  }
  for (field, value) in commits {
    if !is_commit(value) {
      return Err(ParseError::InvalidGitCommit {
        tags: entry.tags_string(),
        field,
        value: value.to_string(),
      });
    }
  }
  Ok(())
}

/// Apply every field of `para` onto `entry`, replacing inherited values.
fn apply_paragraph(entry: &mut ManifestEntry, para: &Paragraph, context: &str) -> Result<(), ParseError> {
  for field in &para.fields {
    let key = field.key.to_ascii_lowercase();
    let value = field.value.as_str();

    match key.as_str() {
      "maintainers" => entry.maintainers = split_list(value),
      "tags" => entry.tags = split_list(value),
      "sharedtags" => entry.shared_tags = split_list(value),
      "architectures" => entry.architectures = parse_architectures(value, context)?,
      "gitrepo" => entry.git_repo = value.to_string(),
      "gitfetch" => entry.git_fetch = value.to_string(),
      "gitcommit" => entry.git_commit = value.to_string(),
      "directory" => entry.directory = value.to_string(),
      "file" => entry.file = value.to_string(),
      "constraints" => entry.constraints = split_list(value),
      _ => {
        let arch_field = field
          .key
          .rsplit_once('-')
          .and_then(|(arch, name)| ArchField::from_key(name).map(|f| (arch, f)));
        match arch_field {
          Some((arch, arch_field)) => {
            let arch: Arch = arch.parse().map_err(|_| ParseError::UnsupportedArchitecture {
              context: format!("{} field {}", context, field.key),
              arch: arch.to_string(),
            })?;
            entry
              .arch_overrides
              .entry(arch)
              .or_default()
              .set(arch_field, value.to_string());
          }
          None => debug!(key = %field.key, line = field.line, "ignoring unknown manifest field"),
        }
      }
    }
  }

  entry.normalize_architectures();
  Ok(())
}

fn parse_architectures(value: &str, context: &str) -> Result<Vec<Arch>, ParseError> {
  split_list(value)
    .into_iter()
    .map(|name| {
      name.parse::<Arch>().map_err(|_| ParseError::UnsupportedArchitecture {
        context: context.to_string(),
        arch: name,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const COMMIT: &str = "0000000000000000000000000000000000000000";

  #[test]
  fn minimal_manifest_gets_defaults() {
    let text = format!(
      "Maintainers: A <a@b> (@a)\n\nTags: 1.0\nGitRepo: https://x/y.git\nGitCommit: {}\n",
      COMMIT
    );
    let manifest = parse(&text).unwrap();

    assert_eq!(manifest.entries.len(), 1);
    let entry = &manifest.entries[0];
    assert_eq!(entry.tags, vec!["1.0"]);
    assert_eq!(entry.directory, ".");
    assert_eq!(entry.file, "Dockerfile");
    assert_eq!(entry.git_fetch, "refs/heads/master");
    assert_eq!(entry.architectures, vec![Arch::Amd64]);
    assert_eq!(entry.maintainers, vec!["A <a@b> (@a)"]);
  }

  #[test]
  fn same_artifacts_merge() {
    let text = "Maintainers: A (@a)\nGitRepo: r\nGitCommit: c\n\nTags: a\nDirectory: .\n\nTags: b\nDirectory: .\n";
    let manifest = parse(text).unwrap();

    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.entries[0].tags, vec!["a", "b"]);
  }

  #[test]
  fn keys_are_case_insensitive_and_unknown_keys_ignored() {
    let text = format!(
      "maintainers: A (@a)\nHomepage: https://example.com\n\ntags: 1\ngitrepo: r\nGITCOMMIT: {}\n",
      COMMIT
    );
    let manifest = parse_rfc2822(&text).unwrap();
    assert_eq!(manifest.entries[0].git_commit, COMMIT);
  }

  #[test]
  fn architectures_replace_and_sort() {
    let text = format!(
      "Maintainers: A (@a)\nArchitectures: amd64, arm64v8\nGitRepo: r\n\nTags: 1\nArchitectures: s390x, amd64, s390x\nGitCommit: {c}\n\nTags: 2\nDirectory: 2\nGitCommit: {c}\n",
      c = COMMIT
    );
    let manifest = parse_rfc2822(&text).unwrap();

    assert_eq!(manifest.entries[0].architectures, vec![Arch::Amd64, Arch::S390x]);
    assert_eq!(manifest.entries[1].architectures, vec![Arch::Amd64, Arch::Arm64v8]);
  }

  #[test]
  fn arch_specific_fields() {
    let text = format!(
      "Maintainers: A (@a)\nGitRepo: r\n\nTags: 1\nArchitectures: amd64, windows-amd64\nGitCommit: {c}\nwindows-amd64-Directory: ./win//\nwindows-amd64-GitCommit: abcdef\n",
      c = COMMIT
    );
    let manifest = parse_rfc2822(&text).unwrap();
    let entry = &manifest.entries[0];

    assert_eq!(entry.arch_directory(Arch::WindowsAmd64), "win");
    assert_eq!(entry.arch_git_commit(Arch::WindowsAmd64), "abcdef");
    assert_eq!(entry.arch_git_commit(Arch::Amd64), COMMIT);
  }

  #[test]
  fn arch_specific_field_with_unknown_arch_is_rejected() {
    let text = format!(
      "Maintainers: A (@a)\n\nTags: 1\nGitRepo: r\nGitCommit: {}\nsparc-GitCommit: abc\n",
      COMMIT
    );
    let err = parse_rfc2822(&text).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedArchitecture { arch, .. } if arch == "sparc"));
  }

  #[test]
  fn unsupported_architecture_rejects_manifest() {
    let text = format!(
      "Maintainers: A (@a)\n\nTags: 1\nArchitectures: amd64, vax\nGitRepo: r\nGitCommit: {}\n",
      COMMIT
    );
    assert!(matches!(
      parse_rfc2822(&text),
      Err(ParseError::UnsupportedArchitecture { .. })
    ));
  }

  #[test]
  fn global_validation() {
    assert!(matches!(
      parse_rfc2822("GitRepo: r\n\nTags: 1\n"),
      Err(ParseError::MissingMaintainers)
    ));
    assert!(matches!(
      parse_rfc2822("Maintainers: nobody\n"),
      Err(ParseError::InvalidMaintainers { .. })
    ));
    assert!(matches!(
      parse_rfc2822("Maintainers: A (@a)\nTags: 1\n"),
      Err(ParseError::GlobalTags)
    ));
    assert!(matches!(
      parse_rfc2822("Maintainers: A (@a)\nArchitectures: nope\n"),
      Err(ParseError::UnsupportedArchitecture { .. })
    ));
  }

  #[test]
  fn entry_validation() {
    let base = "Maintainers: A (@a)\nGitRepo: r\n\n";
    assert!(matches!(
      parse_rfc2822(&format!("{}Directory: x\n", base)),
      Err(ParseError::MissingTags)
    ));
    assert!(matches!(
      parse_rfc2822(&format!("{}Tags: 1\n", base)),
      Err(ParseError::MissingGitFields { .. })
    ));
    assert!(matches!(
      parse_rfc2822(&format!("{}Tags: 1\nGitCommit: v1.0\n", base)),
      Err(ParseError::InvalidGitCommit { .. })
    ));
    assert!(matches!(
      parse_rfc2822(&format!("{}Tags: 1\nGitCommit: abc\nGitFetch: refs/heads/*\n", base)),
      Err(ParseError::InvalidGitFetch { .. })
    ));
    assert!(matches!(
      parse_rfc2822(&format!("{}Tags: 1\nGitCommit: abc\nMaintainers: bad\n", base)),
      Err(ParseError::InvalidMaintainers { .. })
    ));
  }

  #[test]
  fn duplicate_tag_within_entry_is_rejected() {
    let text = "Maintainers: A (@a)\nGitRepo: r\nGitCommit: c\n\nTags: 1, 1\n";
    assert!(matches!(
      parse_rfc2822(text),
      Err(ParseError::DuplicateTag { .. })
    ));
  }

  #[test]
  fn display_round_trips() {
    let text = format!(
      "# comment\nMaintainers: A (@a), B <b@example.com> (@b)\nGitRepo: https://github.com/docker-library/busybox.git\nArchitectures: amd64, arm64v8\n\nTags: 1.36-glibc, 1-glibc\nSharedTags: 1.36, latest\nGitCommit: {c}\nDirectory: stable/glibc\n\nTags: 1.36-musl\nSharedTags: 1.36, latest\nArchitectures: amd64\nGitFetch: refs/heads/dist\nGitCommit: {c}\nFile: Dockerfile.musl\nConstraints: !aufs\narm64v8-GitCommit: abcdef\n",
      c = COMMIT
    );
    let manifest = parse(&text).unwrap();
    let rendered = manifest.to_string();
    let reparsed = parse(&rendered).unwrap();

    assert_eq!(manifest, reparsed);
    assert!(rendered.starts_with("Maintainers: A (@a), B <b@example.com> (@b)\nArchitectures: amd64, arm64v8"));
    assert!(!rendered.contains("GitFetch: refs/heads/master"));
  }

  #[test]
  fn falls_back_to_line_based() {
    let text = "# maintainer: A (@a)\n\nlatest: https://x/y.git@v1.0 dir\n";
    let manifest = parse(text).unwrap();
    assert_eq!(manifest.entries[0].git_fetch, "refs/tags/v1.0");
  }

  #[test]
  fn reports_both_errors_when_neither_format_parses() {
    let err = parse("Maintainers: A (@a)\n\nTags: 1\n").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("cannot parse manifest in either format"));
    assert!(message.contains("RFC 2822 error: Tags \"1\" missing one of"));
    assert!(message.contains("Line-based error:"));
  }
}
