//! Tag-level family tree across the whole library.
//!
//! Every tag of every entry is its own node, so the children of `debian:bookworm`
//! are only the images actually built on that tag, not everything built on any
//! `debian` image.

use std::collections::HashSet;

use petgraph::Direction;

use super::network::BuildGraph;
use super::types::{GraphError, NodePayload, Specificity};
use crate::constraints::ConstraintFilter;
use crate::repo::Repo;
use crate::resolver::Resolver;

#[derive(Debug, Default)]
pub struct FamilyGraph {
  graph: BuildGraph,
}

impl FamilyGraph {
  /// Build the family tree over `repos`.
  ///
  /// With `apply_constraints` only entries eligible on the filter's host are
  /// considered, and only for its architecture; otherwise each entry is
  /// inspected for every architecture it declares.
  pub fn build(
    repos: &[impl AsRef<Repo>],
    resolver: &mut Resolver,
    namespace: &str,
    filter: &ConstraintFilter,
    apply_constraints: bool,
  ) -> Result<Self, GraphError> {
    let mut graph = BuildGraph::new();

    for repo in repos {
      let repo = repo.as_ref();
      for (_, entry) in repo.entries() {
        if apply_constraints && filter.skips(&repo.name, entry) {
          continue;
        }
        for tag in repo.tags(namespace, false, entry) {
          if graph.canonical(&tag).is_none() {
            let node = graph.add_node(tag.clone(), NodePayload::Tag(repo.entry_identifier(entry)));
            graph.register_label(tag, node, Specificity::Tag);
          }
        }
      }
    }

    for repo in repos {
      let repo = repo.as_ref();
      for (_, entry) in repo.entries() {
        if apply_constraints && filter.skips(&repo.name, entry) {
          continue;
        }
        let arches = if apply_constraints {
          vec![filter.arch()]
        } else {
          entry.architectures.clone()
        };

        for arch in arches {
          for from in resolver.froms(entry, arch)? {
            let Some(from_node) = graph.canonical(&from) else {
              continue;
            };
            for tag in repo.tags(namespace, false, entry) {
              if let Some(tag_node) = graph.canonical(&tag) {
                graph.add_dependency(from_node, tag_node);
              }
            }
          }
        }
      }
    }

    Ok(Self { graph })
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.graph.canonical(tag).is_some()
  }

  /// Tags built on any of `tags`, nearest first. Unknown tags are ignored and
  /// every tag is reported at most once.
  pub fn children(&self, tags: &[String], depth: Option<usize>) -> Vec<String> {
    self.relatives(tags, Direction::Outgoing, depth)
  }

  /// Tags any of `tags` is built on, nearest first.
  pub fn parents(&self, tags: &[String], depth: Option<usize>) -> Vec<String> {
    self.relatives(tags, Direction::Incoming, depth)
  }

  fn relatives(&self, tags: &[String], direction: Direction, depth: Option<usize>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags
      .iter()
      .filter_map(|tag| self.graph.canonical(tag))
      .flat_map(|start| self.graph.walk(start, direction, depth, &mut seen))
      .map(|idx| self.graph.node(idx).name.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use super::*;
  use crate::manifest::parse;
  use crate::platform::Arch;
  use crate::util::testutil::{FakeGit, FakeImages, fake_resolver};

  const DEBIAN: &str = "1111111111111111111111111111111111111111";
  const BPD: &str = "2222222222222222222222222222222222222222";
  const PYTHON: &str = "3333333333333333333333333333333333333333";

  fn repo(name: &str, text: &str) -> Rc<Repo> {
    Rc::new(Repo::new(name, None, Rc::new(parse(text).unwrap())))
  }

  fn library() -> Vec<Rc<Repo>> {
    vec![
      repo(
        "debian",
        &format!(
          "Maintainers: A (@a)\nGitRepo: d\nGitCommit: {DEBIAN}\nArchitectures: amd64, arm64v8\n\nTags: bookworm, latest\n\nTags: trixie\nDirectory: trixie\n"
        ),
      ),
      repo(
        "buildpack-deps",
        &format!("Maintainers: A (@a)\nGitRepo: b\nGitCommit: {BPD}\n\nTags: bookworm\n"),
      ),
      repo(
        "python",
        &format!(
          "Maintainers: A (@a)\nGitRepo: p\nGitCommit: {PYTHON}\n\nTags: 3.12\n\nTags: 3.12-arm\nArchitectures: arm64v8\nDirectory: arm\n"
        ),
      ),
    ]
  }

  fn git() -> FakeGit {
    FakeGit::default()
      .with_file(DEBIAN, "Dockerfile", "FROM scratch\n")
      .with_file(DEBIAN, "trixie/Dockerfile", "FROM scratch\n")
      .with_file(BPD, "Dockerfile", "FROM debian:bookworm\n")
      .with_file(PYTHON, "Dockerfile", "FROM buildpack-deps:bookworm\n")
      .with_file(PYTHON, "arm/Dockerfile", "FROM debian:trixie\n")
  }

  fn tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
  }

  fn build(apply_constraints: bool) -> FamilyGraph {
    let filter = ConstraintFilter::new(Arch::Amd64, Vec::new(), false);
    let mut resolver = fake_resolver(&git(), &FakeImages::default());
    FamilyGraph::build(&library(), &mut resolver, "", &filter, apply_constraints).unwrap()
  }

  #[test]
  fn children_are_per_tag() {
    let family = build(false);

    assert_eq!(
      family.children(&tags(&["debian:bookworm"]), None),
      vec!["buildpack-deps:bookworm", "python:3.12"]
    );
    assert_eq!(family.children(&tags(&["debian:trixie"]), None), vec!["python:3.12-arm"]);
    assert_eq!(
      family.children(&tags(&["debian:bookworm"]), Some(1)),
      vec!["buildpack-deps:bookworm"]
    );
  }

  #[test]
  fn parents_walk_upwards() {
    let family = build(false);
    assert_eq!(
      family.parents(&tags(&["python:3.12"]), None),
      vec!["buildpack-deps:bookworm", "debian:bookworm"]
    );
  }

  #[test]
  fn shared_seen_set_across_starting_tags() {
    let family = build(false);
    assert_eq!(
      family.parents(&tags(&["python:3.12", "buildpack-deps:bookworm", "missing:tag"]), None),
      vec!["buildpack-deps:bookworm", "debian:bookworm"]
    );
  }

  #[test]
  fn constraints_limit_to_host_arch() {
    let family = build(true);
    assert!(!family.contains("python:3.12-arm"));
    assert!(family.children(&tags(&["debian:trixie"]), None).is_empty());
    assert_eq!(
      family.children(&tags(&["debian:bookworm"]), None),
      vec!["buildpack-deps:bookworm", "python:3.12"]
    );
    // an alias of the same entry is a separate node
    assert!(family.children(&tags(&["debian:latest"]), None).is_empty());
  }
}
