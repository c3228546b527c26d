//! Build order of repositories and of the entries within one repository.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::network::BuildGraph;
use super::types::{GraphError, NodePayload, Specificity};
use crate::constraints::ConstraintFilter;
use crate::repo::Repo;
use crate::resolver::Resolver;

/// How to order.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions<'a> {
  /// Prefix applied to every tag, as in `namespace/repo:tag`.
  pub namespace: &'a str,
  /// Host architecture and constraints.
  pub filter: &'a ConstraintFilter,
  /// Leave out entries the filter rejects.
  pub apply_constraints: bool,
  /// When false, everything is returned in its original order.
  pub sort: bool,
}

/// One thing being ordered: a repository (or a single entry of one) and the
/// payload its node carries.
#[derive(Debug, Clone)]
pub struct Unit<'a> {
  pub repo: &'a Repo,
  pub payload: NodePayload,
}

/// Build the dependency graph between `units`.
///
/// Every unit becomes one node labelled with its identifier. Its tags are
/// registered as labels too, so a base image naming any of them resolves to the
/// unit. Bases outside the set being ordered are ignored.
pub fn build_graph(units: &[Unit<'_>], resolver: &mut Resolver, opts: &SortOptions<'_>) -> Result<BuildGraph, GraphError> {
  let mut graph = BuildGraph::new();
  let arch = opts.filter.arch();

  let nodes: Vec<_> = units
    .iter()
    .map(|unit| {
      let node = graph.add_node(unit.repo.identifier(), unit.payload.clone());
      for (_, entry) in unit.repo.entries() {
        for tag in unit.repo.tags(opts.namespace, false, entry) {
          graph.register_label(tag, node, unit.repo.specificity());
        }
      }
      graph.register_label(unit.repo.name.clone(), node, Specificity::Repository);
      node
    })
    .collect();

  for (unit, &node) in units.iter().zip(&nodes) {
    let repo = unit.repo;
    for (_, entry) in repo.entries() {
      if opts.apply_constraints && opts.filter.skips(&repo.name, entry) {
        continue;
      }
      if !entry.has_architecture(arch) {
        continue;
      }

      for from in resolver.froms(entry, arch)? {
        let Some(from_node) = graph.canonical(&from) else {
          continue;
        };
        for tag in repo.tags(opts.namespace, false, entry) {
          if let Some(tag_node) = graph.canonical(&tag) {
            graph.add_dependency(from_node, tag_node);
          }
        }
      }
      debug!(node = %graph.node(node), "collected dependencies");
    }
  }

  Ok(graph)
}

/// Order repositories so that every repository comes after the ones it builds on.
///
/// Repositories with the same identifier are kept once, at their first position.
pub fn sort_repos(repos: &[Rc<Repo>], resolver: &mut Resolver, opts: &SortOptions<'_>) -> Result<Vec<Rc<Repo>>, GraphError> {
  let mut seen = HashSet::new();
  let unique: Vec<Rc<Repo>> = repos
    .iter()
    .filter(|repo| seen.insert(repo.identifier()))
    .cloned()
    .collect();

  if !opts.sort || unique.len() <= 1 {
    return Ok(unique);
  }

  let units: Vec<Unit<'_>> = unique
    .iter()
    .enumerate()
    .map(|(i, repo)| Unit {
      repo: repo.as_ref(),
      payload: NodePayload::Repo(i),
    })
    .collect();
  let graph = build_graph(&units, resolver, opts)?;

  let order = graph.sorted()?;
  Ok(
    order
      .into_iter()
      .filter_map(|idx| match graph.node(idx).payload {
        NodePayload::Repo(i) => unique.get(i).cloned(),
        _ => None,
      })
      .collect(),
  )
}

/// Order the selected entries of `repo` (as manifest indices) so that entries
/// built on other entries of the same repository come after them.
pub fn sorted_entries(repo: &Repo, resolver: &mut Resolver, opts: &SortOptions<'_>) -> Result<Vec<usize>, GraphError> {
  let indices = repo.entry_indices().to_vec();
  if !opts.sort || indices.len() <= 1 {
    return Ok(indices);
  }

  let entry_repos: Vec<Repo> = indices.iter().map(|&i| repo.entry_repo(i)).collect();
  let units: Vec<Unit<'_>> = entry_repos
    .iter()
    .zip(&indices)
    .map(|(entry_repo, &i)| Unit {
      repo: entry_repo,
      payload: NodePayload::Entry(i),
    })
    .collect();
  let graph = build_graph(&units, resolver, opts)?;

  Ok(
    graph
      .sorted()?
      .into_iter()
      .filter_map(|idx| match graph.node(idx).payload {
        NodePayload::Entry(i) => Some(i),
        _ => None,
      })
      .collect(),
  )
}
