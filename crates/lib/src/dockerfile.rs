//! Base-image extraction from Dockerfiles.
//!
//! Only `FROM` and `COPY --from=` matter here: together they name every image a
//! build pulls in. Stage aliases (`FROM x AS name`) and numeric stage indices are
//! resolved back to the image they stand for, so the result never contains a
//! stage name.
//!
//! Dockerfiles whose bases cannot be known statically (an `ARG` in the image
//! name, a custom `# syntax=` frontend, a non-default escape character) are
//! rejected with [`DockerfileError::Unsupported`].

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::consts::SCRATCH;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DockerfileError {
  #[error("line {line}: unsupported Dockerfile construct: {reason}")]
  Unsupported { line: usize, reason: String },
}

/// Everything the build graph needs to know about one Dockerfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DockerfileMetadata {
  /// Base image of every stage, in order.
  pub stage_froms: Vec<String>,
  /// Names given with `FROM ... AS <name>`, in order.
  pub stage_names: Vec<String>,
  /// Stage name (lowercased) to the image it resolves to.
  pub stage_name_froms: BTreeMap<String, String>,
  /// Every external image referenced, in order of appearance.
  pub froms: Vec<String>,
}

impl DockerfileMetadata {
  /// Base image of the final stage, which is what the produced image is built on.
  pub fn last_stage_from(&self) -> Option<&str> {
    self.stage_froms.last().map(String::as_str)
  }

  fn resolve_alias(&self, reference: &str) -> Option<&str> {
    self
      .stage_name_froms
      .get(&reference.to_ascii_lowercase())
      .map(String::as_str)
  }
}

/// Append `:latest` to references that carry neither a tag nor a digest.
pub fn latestize(reference: &str) -> String {
  if reference == SCRATCH || reference.contains('@') {
    return reference.to_string();
  }
  let name = reference.rsplit('/').next().unwrap_or(reference);
  if name.contains(':') {
    reference.to_string()
  } else {
    format!("{}:latest", reference)
  }
}

/// Parse a Dockerfile and collect its base images.
pub fn parse_metadata(text: &str) -> Result<DockerfileMetadata, DockerfileError> {
  let mut meta = DockerfileMetadata::default();
  let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
  let mut in_directives = true;

  while let Some((line_no, raw)) = lines.next() {
    let line = raw.trim();
    if line.is_empty() {
      in_directives = false;
      continue;
    }
    if let Some(comment) = line.strip_prefix('#') {
      // directives only lead the file; any other comment ends them
      if in_directives && comment.contains('=') {
        check_directive(comment, line_no)?;
      } else {
        in_directives = false;
      }
      continue;
    }
    in_directives = false;

    let mut instruction = line.to_string();
    while instruction.ends_with('\\') {
      instruction.pop();
      let Some((_, next)) = lines.next() else { break };
      let trimmed = next.trim();
      if trimmed.is_empty() || trimmed.starts_with('#') {
        instruction.push('\\');
        continue;
      }
      instruction.push_str(next.trim_end());
    }

    let fields: Vec<&str> = instruction.split_whitespace().collect();
    let Some(keyword) = fields.first() else { continue };

    if keyword.eq_ignore_ascii_case("FROM") {
      parse_from(&mut meta, &fields[1..], line_no)?;
    } else if keyword.eq_ignore_ascii_case("COPY") {
      parse_copy(&mut meta, &fields[1..], line_no)?;
    }
  }

  Ok(meta)
}

fn check_directive(comment: &str, line_no: usize) -> Result<(), DockerfileError> {
  let Some((key, value)) = comment.split_once('=') else {
    return Ok(());
  };
  let key = key.trim();
  let value = value.trim();
  if key.eq_ignore_ascii_case("syntax") {
    return Err(DockerfileError::Unsupported {
      line: line_no,
      reason: format!("parser directive 'syntax={}'", value),
    });
  }
  if key.eq_ignore_ascii_case("escape") && value != "\\" {
    return Err(DockerfileError::Unsupported {
      line: line_no,
      reason: format!("parser directive 'escape={}'", value),
    });
  }
  Ok(())
}

fn reject_variable(reference: &str, line_no: usize) -> Result<(), DockerfileError> {
  if reference.contains('$') {
    return Err(DockerfileError::Unsupported {
      line: line_no,
      reason: format!("image reference {:?} depends on a build argument", reference),
    });
  }
  Ok(())
}

fn parse_from(meta: &mut DockerfileMetadata, args: &[&str], line_no: usize) -> Result<(), DockerfileError> {
  let mut args = args.iter().skip_while(|arg| arg.starts_with("--"));
  let Some(image) = args.next() else {
    return Err(DockerfileError::Unsupported {
      line: line_no,
      reason: "FROM without an image".to_string(),
    });
  };
  reject_variable(image, line_no)?;

  let from = match meta.resolve_alias(image) {
    Some(stage_from) => stage_from.to_string(),
    None => latestize(image),
  };
  meta.stage_froms.push(from.clone());
  meta.froms.push(from.clone());

  let rest: Vec<&&str> = args.collect();
  if let [keyword, name] = rest.as_slice()
    && keyword.eq_ignore_ascii_case("AS")
  {
    meta.stage_names.push(name.to_string());
    meta.stage_name_froms.insert(name.to_ascii_lowercase(), from);
  }
  Ok(())
}

fn parse_copy(meta: &mut DockerfileMetadata, args: &[&str], line_no: usize) -> Result<(), DockerfileError> {
  for arg in args {
    if !arg.starts_with("--") {
      break;
    }
    let Some(reference) = arg.strip_prefix("--from=") else {
      continue;
    };
    reject_variable(reference, line_no)?;

    let from = if let Some(stage_from) = meta.resolve_alias(reference) {
      stage_from.to_string()
    } else if let Ok(index) = reference.parse::<usize>()
      && index < meta.stage_froms.len()
    {
      meta.stage_froms[index].clone()
    } else {
      latestize(reference)
    };
    meta.froms.push(from);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn latestize_rules() {
    assert_eq!(latestize("debian"), "debian:latest");
    assert_eq!(latestize("debian:bookworm"), "debian:bookworm");
    assert_eq!(latestize("scratch"), "scratch");
    assert_eq!(latestize("localhost:5000/app"), "localhost:5000/app:latest");
    assert_eq!(latestize("alpine@sha256:abcd"), "alpine@sha256:abcd");
  }

  #[test]
  fn stage_aliases_resolve_to_base() {
    let meta = parse_metadata(
      "FROM base AS build\nRUN make\n\nFROM build\nCOPY --from=build /out /out\n",
    )
    .unwrap();

    assert_eq!(meta.froms, vec!["base:latest", "base:latest", "base:latest"]);
    assert_eq!(meta.stage_froms, vec!["base:latest", "base:latest"]);
    assert_eq!(meta.stage_names, vec!["build"]);
    assert_eq!(meta.last_stage_from(), Some("base:latest"));
    assert!(!meta.froms.iter().any(|f| f.starts_with("build")));
  }

  #[test]
  fn copy_from_index_and_external() {
    let meta = parse_metadata(
      "from golang:1.22 as builder\nFROM alpine:3.19\nCOPY --chown=1:1 --from=0 /a /a\nCOPY --from=nginx /b /b\nCOPY --from=7 /c /c\n",
    )
    .unwrap();

    assert_eq!(
      meta.froms,
      vec!["golang:1.22", "alpine:3.19", "golang:1.22", "nginx:latest", "7:latest"]
    );
    assert_eq!(meta.last_stage_from(), Some("alpine:3.19"));
  }

  #[test]
  fn copy_flags_stop_at_first_argument() {
    let meta = parse_metadata("FROM scratch\nCOPY src --from=other /dst\n").unwrap();
    assert_eq!(meta.froms, vec!["scratch"]);
  }

  #[test]
  fn continuation_lines_and_comments() {
    let text = "# a comment\nFROM \\\n  # interleaved\n\n  debian:bookworm \\\n  AS base\nCOPY \\\n  --from=base / /\n";
    let meta = parse_metadata(text).unwrap();

    assert_eq!(meta.stage_names, vec!["base"]);
    assert_eq!(meta.froms, vec!["debian:bookworm", "debian:bookworm"]);
  }

  #[test]
  fn continuation_joins_without_a_separator() {
    let meta = parse_metadata("FROM debian:\\\nbookworm AS base\n").unwrap();
    assert_eq!(meta.froms, vec!["debian:bookworm"]);
    assert_eq!(meta.stage_names, vec!["base"]);
  }

  #[test]
  fn from_platform_flag_is_skipped() {
    let meta = parse_metadata("FROM --platform=$BUILDPLATFORM golang:1.22 AS b\n").unwrap();
    assert_eq!(meta.stage_froms, vec!["golang:1.22"]);
  }

  #[test]
  fn alias_lookup_is_case_insensitive() {
    let meta = parse_metadata("FROM node:20 AS Deps\nFROM deps\n").unwrap();
    assert_eq!(meta.stage_froms, vec!["node:20", "node:20"]);
    assert_eq!(meta.stage_names, vec!["Deps"]);
  }

  #[test]
  fn rejects_build_arg_bases() {
    let err = parse_metadata("ARG TAG=1\nFROM debian:${TAG}\n").unwrap_err();
    assert!(matches!(err, DockerfileError::Unsupported { line: 2, .. }));

    let err = parse_metadata("FROM debian\nCOPY --from=$STAGE / /\n").unwrap_err();
    assert!(matches!(err, DockerfileError::Unsupported { line: 2, .. }));
  }

  #[test]
  fn rejects_parser_directives() {
    assert!(parse_metadata("# syntax=docker/dockerfile:1\nFROM debian\n").is_err());
    assert!(parse_metadata("# escape=`\nFROM debian\n").is_err());
    assert!(parse_metadata("# escape=\\\nFROM debian\n").is_ok());
    // directives are only honoured before the first instruction
    assert!(parse_metadata("FROM debian\n# syntax=docker/dockerfile:1\n").is_ok());
    assert!(parse_metadata("# note\n\n# syntax=docker/dockerfile:1\nFROM debian\n").is_ok());
    assert!(parse_metadata("\n# syntax=docker/dockerfile:1\nFROM debian\n").is_ok());
    assert!(parse_metadata("# check=skip=all\n# syntax=docker/dockerfile:1\nFROM debian\n").is_err());
  }

  #[test]
  fn rejects_empty_from() {
    assert!(matches!(
      parse_metadata("FROM\n"),
      Err(DockerfileError::Unsupported { line: 1, .. })
    ));
  }
}
