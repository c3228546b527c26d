//! Manifest types.
//!
//! A manifest describes every buildable unit of one image repository. It is
//! made of a global paragraph holding defaults and an ordered list of entries,
//! each produced by cloning the global paragraph and overriding whatever its
//! own paragraph declares.
//!
//! Entries are immutable once [`Manifest::add_entry`] has accepted them; later
//! stages work with resolved copies instead (see `resolver::ResolvedEntry`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::consts::{DEFAULT_DIRECTORY, DEFAULT_FILE, DEFAULT_GIT_FETCH};
use crate::platform::Arch;
use crate::util::path;

/// Expected shape of a maintainer line, quoted in error messages.
pub const MAINTAINERS_FORMAT: &str =
  "Full Name <contact-email-or-url> (@github-handle) OR Full Name (@github-handle)";

/// Separator used when joining list fields back into a single value.
pub const LIST_SEPARATOR: &str = ", ";

static MAINTAINER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([^\s<>()][^<>()]*)(?:\s+<([^\s<>()]+)>)?\s+[(]@([^\s<>()]+)[)]$")
    .expect("maintainer regex is valid")
});

pub(crate) static GIT_COMMIT_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[0-9a-f]{1,64}$").expect("commit regex is valid"));

pub(crate) static GIT_FETCH_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^refs/(heads|tags)/[^*?:]+$").expect("fetch regex is valid"));

/// Returns true if `commit` looks like an abbreviated or full commit hash.
pub fn is_commit(commit: &str) -> bool {
  GIT_COMMIT_REGEX.is_match(commit)
}

/// Returns true if `fetch` is a concrete branch or tag ref.
pub fn is_fetch_ref(fetch: &str) -> bool {
  GIT_FETCH_REGEX.is_match(fetch)
}

/// Errors that reject a whole manifest.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("line {line}: {message}")]
  Syntax { line: usize, message: String },

  #[error("missing Maintainers")]
  MissingMaintainers,

  #[error("invalid Maintainers: {maintainers:?} (expected format {MAINTAINERS_FORMAT:?})")]
  InvalidMaintainers { maintainers: String },

  #[error("global Tags not permitted")]
  GlobalTags,

  #[error("missing Tags")]
  MissingTags,

  #[error("Tags {tags:?} missing one of GitRepo, GitFetch, or GitCommit")]
  MissingGitFields { tags: String },

  #[error("Tags {tags:?} has invalid {field} (must be \"refs/heads/...\" or \"refs/tags/...\"): {value:?}")]
  InvalidGitFetch { tags: String, field: String, value: String },

  #[error("Tags {tags:?} has invalid {field} (must be a commit, not a tag or ref): {value:?}")]
  InvalidGitCommit { tags: String, field: String, value: String },

  #[error("{context} has invalid architecture: {arch:?}")]
  UnsupportedArchitecture { context: String, arch: String },

  #[error("Tags {tags:?} includes duplicate tag: {tag:?}")]
  DuplicateTag { tags: String, tag: String },

  #[error("Tags {tags:?} includes tag conflicting with a shared tag: {tag:?}")]
  TagConflictsWithSharedTag { tags: String, tag: String },

  #[error("SharedTags {tags:?} includes duplicate tag: {tag:?}")]
  DuplicateSharedTag { tags: String, tag: String },

  #[error("SharedTags {tags:?} includes tag conflicting with a non-shared tag: {tag:?}")]
  SharedTagConflictsWithTag { tags: String, tag: String },

  #[error("cannot parse manifest in either format:\nRFC 2822 error: {rfc2822}\nLine-based error: {line_based}")]
  EitherFormat {
    rfc2822: Box<ParseError>,
    line_based: Box<ParseError>,
  },
}

/// Build-source fields that may be overridden per architecture with an
/// `<arch>-<Field>` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchField {
  GitRepo,
  GitFetch,
  GitCommit,
  Directory,
  File,
}

impl ArchField {
  pub const ALL: [ArchField; 5] = [
    Self::GitRepo,
    Self::GitFetch,
    Self::GitCommit,
    Self::Directory,
    Self::File,
  ];

  /// The field name as written in manifests.
  pub fn key(&self) -> &'static str {
    match self {
      Self::GitRepo => "GitRepo",
      Self::GitFetch => "GitFetch",
      Self::GitCommit => "GitCommit",
      Self::Directory => "Directory",
      Self::File => "File",
    }
  }

  /// Case-insensitive lookup of a field name.
  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|f| f.key().eq_ignore_ascii_case(key))
  }
}

/// Per-architecture overrides of the build-source fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchOverrides {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub git_repo: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub git_fetch: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub git_commit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub directory: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file: Option<String>,
}

impl ArchOverrides {
  pub fn get(&self, field: ArchField) -> Option<&str> {
    match field {
      ArchField::GitRepo => self.git_repo.as_deref(),
      ArchField::GitFetch => self.git_fetch.as_deref(),
      ArchField::GitCommit => self.git_commit.as_deref(),
      ArchField::Directory => self.directory.as_deref(),
      ArchField::File => self.file.as_deref(),
    }
  }

  pub fn set(&mut self, field: ArchField, value: String) {
    let slot = match field {
      ArchField::GitRepo => &mut self.git_repo,
      ArchField::GitFetch => &mut self.git_fetch,
      ArchField::GitCommit => &mut self.git_commit,
      ArchField::Directory => &mut self.directory,
      ArchField::File => &mut self.file,
    };
    *slot = Some(value);
  }

  /// Iterate the fields that are set, in [`ArchField::ALL`] order.
  pub fn iter(&self) -> impl Iterator<Item = (ArchField, &str)> {
    ArchField::ALL
      .into_iter()
      .filter_map(|field| self.get(field).map(|value| (field, value)))
  }
}

/// One buildable unit of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
  pub maintainers: Vec<String>,
  pub tags: Vec<String>,
  pub shared_tags: Vec<String>,
  pub architectures: Vec<Arch>,
  pub git_repo: String,
  pub git_fetch: String,
  pub git_commit: String,
  pub directory: String,
  pub file: String,
  pub constraints: Vec<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub arch_overrides: BTreeMap<Arch, ArchOverrides>,
}

impl Default for ManifestEntry {
  /// The built-in global paragraph every manifest starts from.
  fn default() -> Self {
    Self {
      maintainers: Vec::new(),
      tags: Vec::new(),
      shared_tags: Vec::new(),
      architectures: vec![Arch::DEFAULT],
      git_repo: String::new(),
      git_fetch: DEFAULT_GIT_FETCH.to_string(),
      git_commit: String::new(),
      directory: DEFAULT_DIRECTORY.to_string(),
      file: DEFAULT_FILE.to_string(),
      constraints: Vec::new(),
      arch_overrides: BTreeMap::new(),
    }
  }
}

impl ManifestEntry {
  pub fn maintainers_string(&self) -> String {
    self.maintainers.join(LIST_SEPARATOR)
  }

  pub fn tags_string(&self) -> String {
    self.tags.join(LIST_SEPARATOR)
  }

  pub fn shared_tags_string(&self) -> String {
    self.shared_tags.join(LIST_SEPARATOR)
  }

  pub fn architectures_string(&self) -> String {
    self
      .architectures
      .iter()
      .map(Arch::as_str)
      .collect::<Vec<_>>()
      .join(LIST_SEPARATOR)
  }

  pub fn constraints_string(&self) -> String {
    self.constraints.join(LIST_SEPARATOR)
  }

  /// The first tag, used to name the entry in output and errors.
  pub fn primary_tag(&self) -> &str {
    self.tags.first().map(String::as_str).unwrap_or_default()
  }

  /// Value of a build-source field for `arch`, falling back to the entry-level value.
  pub fn arch_field(&self, arch: Arch, field: ArchField) -> &str {
    if let Some(value) = self.arch_overrides.get(&arch).and_then(|o| o.get(field)) {
      return value;
    }
    match field {
      ArchField::GitRepo => &self.git_repo,
      ArchField::GitFetch => &self.git_fetch,
      ArchField::GitCommit => &self.git_commit,
      ArchField::Directory => &self.directory,
      ArchField::File => &self.file,
    }
  }

  pub fn arch_git_repo(&self, arch: Arch) -> &str {
    self.arch_field(arch, ArchField::GitRepo)
  }

  pub fn arch_git_fetch(&self, arch: Arch) -> &str {
    self.arch_field(arch, ArchField::GitFetch)
  }

  pub fn arch_git_commit(&self, arch: Arch) -> &str {
    self.arch_field(arch, ArchField::GitCommit)
  }

  pub fn arch_directory(&self, arch: Arch) -> &str {
    self.arch_field(arch, ArchField::Directory)
  }

  pub fn arch_file(&self, arch: Arch) -> &str {
    self.arch_field(arch, ArchField::File)
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tags.iter().any(|t| t == tag)
  }

  pub fn has_shared_tag(&self, tag: &str) -> bool {
    self.shared_tags.iter().any(|t| t == tag)
  }

  pub fn has_architecture(&self, arch: Arch) -> bool {
    self.architectures.contains(&arch)
  }

  /// Maintainer lines that do not match [`MAINTAINERS_FORMAT`].
  pub fn invalid_maintainers(&self) -> Vec<&str> {
    self
      .maintainers
      .iter()
      .filter(|m| !MAINTAINER_REGEX.is_match(m))
      .map(String::as_str)
      .collect()
  }

  /// Whether `self` and `other` produce the same image, so their tags can be
  /// served by a single build.
  pub fn same_build_artifacts(&self, other: &ManifestEntry) -> bool {
    self.architectures == other.architectures
      && self.git_repo == other.git_repo
      && self.git_fetch == other.git_fetch
      && self.git_commit == other.git_commit
      && self.directory == other.directory
      && self.file == other.file
      && self.constraints == other.constraints
      && self.arch_overrides == other.arch_overrides
  }

  pub(crate) fn dedup_shared_tags(&mut self) {
    dedup_preserving_order(&mut self.shared_tags);
  }

  pub(crate) fn normalize_architectures(&mut self) {
    self.architectures.sort();
    self.architectures.dedup();
  }

  pub(crate) fn clean_directories(&mut self) {
    self.directory = path::clean(&self.directory);
    for overrides in self.arch_overrides.values_mut() {
      if let Some(dir) = overrides.directory.as_mut() {
        *dir = path::clean(dir);
      }
    }
  }

  /// Render this entry as `Key: value` lines, leaving out anything equal to `defaults`.
  pub fn paragraph(&self, defaults: &ManifestEntry) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |key: &str, value: String, default: String| {
      if value != default {
        lines.push(format!("{}: {}", key, value).trim_end().to_string());
      }
    };

    push("Maintainers", self.maintainers_string(), defaults.maintainers_string());
    push("Tags", self.tags_string(), defaults.tags_string());
    push("SharedTags", self.shared_tags_string(), defaults.shared_tags_string());
    push(
      "Architectures",
      self.architectures_string(),
      defaults.architectures_string(),
    );
    push("GitRepo", self.git_repo.clone(), defaults.git_repo.clone());
    push("GitFetch", self.git_fetch.clone(), defaults.git_fetch.clone());
    push("GitCommit", self.git_commit.clone(), defaults.git_commit.clone());
    push("Directory", self.directory.clone(), defaults.directory.clone());
    push("File", self.file.clone(), defaults.file.clone());
    push("Constraints", self.constraints_string(), defaults.constraints_string());

    for (arch, overrides) in &self.arch_overrides {
      let inherited = defaults.arch_overrides.get(arch);
      for (field, value) in overrides.iter() {
        if inherited.and_then(|o| o.get(field)) != Some(value) {
          lines.push(format!("{}-{}: {}", arch, field.key(), value));
        }
      }
    }

    lines
  }
}

/// A set of shared tags and the entries that back them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedTagGroup {
  pub shared_tags: Vec<String>,
  /// Indices into [`Manifest::entries`], in manifest order.
  pub entries: Vec<usize>,
}

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
  pub global: ManifestEntry,
  pub entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
  fn default() -> Self {
    Self {
      global: ManifestEntry::default(),
      entries: Vec::new(),
    }
  }
}

impl Manifest {
  pub fn get_tag(&self, tag: &str) -> Option<&ManifestEntry> {
    self.entries.iter().find(|e| e.has_tag(tag))
  }

  /// Index of the entry declaring `tag` in its `Tags`.
  pub fn tag_index(&self, tag: &str) -> Option<usize> {
    self.entries.iter().position(|e| e.has_tag(tag))
  }

  /// All entries contributing to the shared tag `tag`.
  pub fn get_shared_tag(&self, tag: &str) -> Vec<&ManifestEntry> {
    self.entries.iter().filter(|e| e.has_shared_tag(tag)).collect()
  }

  /// Every shared tag, in first-seen order.
  pub fn all_shared_tags(&self) -> Vec<String> {
    let mut tags: Vec<String> = self
      .entries
      .iter()
      .flat_map(|e| e.shared_tags.iter().cloned())
      .collect();
    dedup_preserving_order(&mut tags);
    tags
  }

  /// Group shared tags by the exact set of entries backing them.
  pub fn shared_tag_groups(&self) -> Vec<SharedTagGroup> {
    let mut groups: Vec<SharedTagGroup> = Vec::new();

    for tag in self.all_shared_tags() {
      let backing: Vec<usize> = self
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.has_shared_tag(&tag))
        .map(|(i, _)| i)
        .collect();

      match groups.iter_mut().find(|g| g.entries == backing) {
        Some(group) => group.shared_tags.push(tag),
        None => groups.push(SharedTagGroup {
          shared_tags: vec![tag],
          entries: backing,
        }),
      }
    }

    groups
  }

  /// Validate `entry` against the manifest and add it, merging it into an
  /// existing entry that builds the same artifact.
  pub fn add_entry(&mut self, mut entry: ManifestEntry) -> Result<(), ParseError> {
    if entry.tags.is_empty() {
      return Err(ParseError::MissingTags);
    }
    if entry.git_repo.is_empty() || entry.git_fetch.is_empty() || entry.git_commit.is_empty() {
      return Err(ParseError::MissingGitFields {
        tags: entry.tags_string(),
      });
    }
    let invalid = entry.invalid_maintainers();
    if !invalid.is_empty() {
      return Err(ParseError::InvalidMaintainers {
        maintainers: invalid.join(LIST_SEPARATOR),
      });
    }

    entry.dedup_shared_tags();
    entry.clean_directories();
    entry.normalize_architectures();

    let mut seen: Vec<&str> = Vec::new();
    for tag in &entry.tags {
      if self.get_tag(tag).is_some() || seen.contains(&tag.as_str()) {
        return Err(ParseError::DuplicateTag {
          tags: entry.tags_string(),
          tag: tag.clone(),
        });
      }
      if !self.get_shared_tag(tag).is_empty() {
        return Err(ParseError::TagConflictsWithSharedTag {
          tags: entry.tags_string(),
          tag: tag.clone(),
        });
      }
      seen.push(tag);
    }
    for tag in &entry.shared_tags {
      if self.get_tag(tag).is_some() {
        return Err(ParseError::SharedTagConflictsWithTag {
          tags: entry.shared_tags_string(),
          tag: tag.clone(),
        });
      }
      if seen.contains(&tag.as_str()) {
        return Err(ParseError::DuplicateSharedTag {
          tags: entry.shared_tags_string(),
          tag: tag.clone(),
        });
      }
      seen.push(tag);
    }

    if let Some(existing) = self.entries.iter_mut().find(|e| e.same_build_artifacts(&entry)) {
      existing.tags.extend(entry.tags);
      existing.shared_tags.extend(entry.shared_tags);
      existing.dedup_shared_tags();
      return Ok(());
    }

    self.entries.push(entry);
    Ok(())
  }
}

impl fmt::Display for Manifest {
  /// Normalized RFC 2822 form: the global paragraph without built-in defaults,
  /// then each entry without the values it inherits from the global paragraph.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut paragraphs = vec![self.global.paragraph(&ManifestEntry::default()).join("\n")];
    for entry in &self.entries {
      paragraphs.push(entry.paragraph(&self.global).join("\n"));
    }
    write!(f, "{}", paragraphs.join("\n\n"))
  }
}

fn dedup_preserving_order(values: &mut Vec<String>) {
  let mut seen = std::collections::HashSet::new();
  values.retain(|v| seen.insert(v.clone()));
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(tags: &[&str]) -> ManifestEntry {
    ManifestEntry {
      tags: tags.iter().map(|t| t.to_string()).collect(),
      git_repo: "https://github.com/docker-library/busybox.git".to_string(),
      git_commit: "abc123".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn maintainer_format() {
    let mut e = entry(&["1"]);
    e.maintainers = vec![
      "Tianon Gravi <admwiggin@gmail.com> (@tianon)".to_string(),
      "Joseph Ferguson (@yosifkit)".to_string(),
      "nobody".to_string(),
      "Bad <email> @handle".to_string(),
    ];
    assert_eq!(e.invalid_maintainers(), vec!["nobody", "Bad <email> @handle"]);
  }

  #[test]
  fn identical_artifacts_merge_tags() {
    let mut manifest = Manifest::default();
    manifest.add_entry(entry(&["a"])).unwrap();
    manifest.add_entry(entry(&["b"])).unwrap();

    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.entries[0].tags, vec!["a", "b"]);
  }

  #[test]
  fn different_directory_does_not_merge() {
    let mut manifest = Manifest::default();
    manifest.add_entry(entry(&["a"])).unwrap();
    let mut other = entry(&["b"]);
    other.directory = "alpine".to_string();
    manifest.add_entry(other).unwrap();

    assert_eq!(manifest.entries.len(), 2);
  }

  #[test]
  fn arch_override_prevents_merge() {
    let mut manifest = Manifest::default();
    manifest.add_entry(entry(&["a"])).unwrap();
    let mut other = entry(&["b"]);
    other
      .arch_overrides
      .entry(Arch::Amd64)
      .or_default()
      .set(ArchField::File, "Dockerfile.amd64".to_string());
    manifest.add_entry(other).unwrap();

    assert_eq!(manifest.entries.len(), 2);
    assert_eq!(manifest.entries[1].arch_file(Arch::Amd64), "Dockerfile.amd64");
    assert_eq!(manifest.entries[1].arch_file(Arch::Arm64v8), "Dockerfile");
  }

  #[test]
  fn duplicate_tag_across_entries_is_rejected() {
    let mut manifest = Manifest::default();
    manifest.add_entry(entry(&["a"])).unwrap();
    let mut other = entry(&["a"]);
    other.directory = "other".to_string();

    let err = manifest.add_entry(other).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateTag { tag, .. } if tag == "a"));
  }

  #[test]
  fn shared_tag_may_not_shadow_tag() {
    let mut manifest = Manifest::default();
    manifest.add_entry(entry(&["latest"])).unwrap();
    let mut other = entry(&["windows"]);
    other.directory = "windows".to_string();
    other.shared_tags = vec!["latest".to_string()];

    let err = manifest.add_entry(other).unwrap_err();
    assert!(matches!(err, ParseError::SharedTagConflictsWithTag { .. }));
  }

  #[test]
  fn tag_may_not_shadow_shared_tag() {
    let mut manifest = Manifest::default();
    let mut first = entry(&["1.0"]);
    first.shared_tags = vec!["latest".to_string()];
    manifest.add_entry(first).unwrap();
    let mut other = entry(&["latest"]);
    other.directory = "x".to_string();

    let err = manifest.add_entry(other).unwrap_err();
    assert!(matches!(err, ParseError::TagConflictsWithSharedTag { .. }));
  }

  #[test]
  fn shared_tag_repeating_own_tag_is_rejected() {
    let mut manifest = Manifest::default();
    let mut e = entry(&["1.0"]);
    e.shared_tags = vec!["1.0".to_string()];

    let err = manifest.add_entry(e).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateSharedTag { .. }));
  }

  #[test]
  fn add_entry_normalizes() {
    let mut manifest = Manifest::default();
    let mut e = entry(&["1.0"]);
    e.directory = "./1.0//alpine/".to_string();
    e.shared_tags = vec!["1".to_string(), "latest".to_string(), "1".to_string()];
    e.architectures = vec![Arch::S390x, Arch::Amd64, Arch::S390x];
    manifest.add_entry(e).unwrap();

    let e = &manifest.entries[0];
    assert_eq!(e.directory, "1.0/alpine");
    assert_eq!(e.shared_tags, vec!["1", "latest"]);
    assert_eq!(e.architectures, vec![Arch::Amd64, Arch::S390x]);
  }

  #[test]
  fn shared_tag_groups_key_on_backing_entries() {
    let mut manifest = Manifest::default();
    let mut a = entry(&["1.0-linux"]);
    a.shared_tags = vec!["1.0".to_string(), "latest".to_string()];
    let mut b = entry(&["1.0-windows"]);
    b.directory = "windows".to_string();
    b.shared_tags = vec!["1.0".to_string(), "latest".to_string(), "windows".to_string()];
    manifest.add_entry(a).unwrap();
    manifest.add_entry(b).unwrap();

    let groups = manifest.shared_tag_groups();
    assert_eq!(
      groups,
      vec![
        SharedTagGroup {
          shared_tags: vec!["1.0".to_string(), "latest".to_string()],
          entries: vec![0, 1],
        },
        SharedTagGroup {
          shared_tags: vec!["windows".to_string()],
          entries: vec![1],
        },
      ]
    );
  }

  #[test]
  fn paragraph_omits_defaults() {
    let e = entry(&["1.0"]);
    let lines = e.paragraph(&ManifestEntry::default());
    assert_eq!(
      lines,
      vec![
        "Tags: 1.0",
        "GitRepo: https://github.com/docker-library/busybox.git",
        "GitCommit: abc123",
      ]
    );
  }
}
