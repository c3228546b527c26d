//! Host eligibility: whether an entry can be built on this host.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use tracing::warn;

use crate::manifest::ManifestEntry;
use crate::platform::Arch;

/// Why an entry is not eligible on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  Architecture { arch: Arch, supported: String },
  ExclusiveConstraints,
  Constraints(Vec<String>),
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Architecture { arch, supported } => {
        write!(f, "architecture {:?}; only {:?} supported", arch.as_str(), supported)
      }
      Self::ExclusiveConstraints => write!(f, "exclusive constraints"),
      Self::Constraints(unsatisfied) => write!(f, "unsatisfactory constraints {:?}", unsatisfied),
    }
  }
}

/// The host's architecture and constraint set.
#[derive(Debug)]
pub struct ConstraintFilter {
  arch: Arch,
  constraints: BTreeSet<String>,
  exclusive: bool,
  reported: RefCell<HashSet<String>>,
}

impl ConstraintFilter {
  /// `exclusive` makes entries without any constraints ineligible.
  pub fn new(arch: Arch, constraints: impl IntoIterator<Item = String>, exclusive: bool) -> Self {
    Self {
      arch,
      constraints: constraints.into_iter().collect(),
      exclusive,
      reported: RefCell::new(HashSet::new()),
    }
  }

  pub fn arch(&self) -> Arch {
    self.arch
  }

  pub fn skip_reason(&self, entry: &ManifestEntry) -> Option<SkipReason> {
    if !entry.has_architecture(self.arch) {
      return Some(SkipReason::Architecture {
        arch: self.arch,
        supported: entry.architectures_string(),
      });
    }

    if entry.constraints.is_empty() {
      return self.exclusive.then_some(SkipReason::ExclusiveConstraints);
    }

    let unsatisfied: Vec<String> = entry
      .constraints
      .iter()
      .filter_map(|constraint| {
        let (wanted, name) = match constraint.strip_prefix('!') {
          Some(name) => (false, name),
          None => (true, constraint.as_str()),
        };
        (self.constraints.contains(name) != wanted).then(|| name.to_string())
      })
      .collect();

    (!unsatisfied.is_empty()).then_some(SkipReason::Constraints(unsatisfied))
  }

  /// Whether `entry` of `repo_name` should be skipped; each skipped
  /// `repo:tag` is reported once.
  pub fn skips(&self, repo_name: &str, entry: &ManifestEntry) -> bool {
    let Some(reason) = self.skip_reason(entry) else {
      return false;
    };
    let repo_tag = format!("{}:{}", repo_name, entry.primary_tag());
    if self.reported.borrow_mut().insert(repo_tag.clone()) {
      warn!(entry = %repo_tag, "skipping ({})", reason);
    }
    true
  }
}
