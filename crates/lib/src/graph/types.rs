use std::fmt;

use thiserror::Error;

use crate::resolver::ResolveError;

/// What a graph node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodePayload {
  /// Index into the list of repositories being sorted.
  Repo(usize),
  /// Index into the manifest entries of the repository being sorted.
  Entry(usize),
  /// A single fully qualified tag; carries the identifier of the entry declaring it.
  Tag(String),
}

/// How specifically a label names its node.
///
/// When two nodes register the same label, the higher rank keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
  /// Registered on behalf of a whole repository.
  Repository,
  /// Registered on behalf of an explicitly selected tag.
  Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
  pub name: String,
  pub payload: NodePayload,
}

impl fmt::Display for GraphNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Errors that can occur while building or ordering a graph.
#[derive(Debug, Error)]
pub enum GraphError {
  /// No build order exists; `nodes` are the nodes that could not be ordered.
  #[error("dependency cycle detected among: {}", nodes.join(", "))]
  Cycle { nodes: Vec<String> },

  #[error(transparent)]
  Resolve(#[from] ResolveError),
}
