//! Labelled dependency network over petgraph.
//!
//! Nodes are added once; any number of labels (fully qualified tags, repo
//! names) may point at a node. Edges run from a dependency to its dependent.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use super::types::{GraphError, GraphNode, NodePayload, Specificity};

#[derive(Debug, Default)]
pub struct BuildGraph {
  graph: DiGraph<GraphNode, ()>,
  labels: HashMap<String, (NodeIndex, Specificity)>,
}

impl BuildGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_node(&mut self, name: impl Into<String>, payload: NodePayload) -> NodeIndex {
    self.graph.add_node(GraphNode {
      name: name.into(),
      payload,
    })
  }

  /// Point `label` at `node`. An existing registration is only replaced by a
  /// strictly more specific one.
  pub fn register_label(&mut self, label: impl Into<String>, node: NodeIndex, specificity: Specificity) {
    let label = label.into();
    match self.labels.get(&label) {
      Some(&(_, existing)) if existing >= specificity => {}
      _ => {
        self.labels.insert(label, (node, specificity));
      }
    }
  }

  /// The node `label` currently resolves to.
  pub fn canonical(&self, label: &str) -> Option<NodeIndex> {
    self.labels.get(label).map(|&(node, _)| node)
  }

  pub fn node(&self, index: NodeIndex) -> &GraphNode {
    &self.graph[index]
  }

  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Record that `to` depends on `from`. Self edges and repeated edges are
  /// dropped; returns whether an edge was added.
  pub fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
    if from == to || self.graph.contains_edge(from, to) {
      return false;
    }
    debug!(from = %self.graph[from], to = %self.graph[to], "adding dependency");
    self.graph.add_edge(from, to, ());
    true
  }

  /// Neighbours of `node` in `direction`, in the order the edges were added.
  pub fn neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut edges: Vec<_> = self.graph.edges_directed(node, direction).collect();
    edges.sort_by_key(|edge| edge.id());
    edges
      .into_iter()
      .map(|edge| match direction {
        Direction::Outgoing => edge.target(),
        Direction::Incoming => edge.source(),
      })
      .collect()
  }

  /// Group nodes into build generations.
  ///
  /// Each pass takes, in registration order, every remaining node whose
  /// dependencies were all placed by earlier passes. If a pass finds nothing
  /// while nodes remain, those nodes form or depend on a cycle.
  pub fn generations(&self) -> Result<Vec<Vec<NodeIndex>>, GraphError> {
    let mut placed: HashSet<NodeIndex> = HashSet::new();
    let mut generations = Vec::new();

    while placed.len() < self.graph.node_count() {
      let ready: Vec<NodeIndex> = self
        .graph
        .node_indices()
        .filter(|idx| !placed.contains(idx))
        .filter(|&idx| {
          self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .all(|dep| placed.contains(&dep))
        })
        .collect();

      if ready.is_empty() {
        let nodes = self
          .graph
          .node_indices()
          .filter(|idx| !placed.contains(idx))
          .map(|idx| self.graph[idx].name.clone())
          .collect();
        return Err(GraphError::Cycle { nodes });
      }

      placed.extend(ready.iter().copied());
      generations.push(ready);
    }

    Ok(generations)
  }

  /// All nodes in build order.
  pub fn sorted(&self) -> Result<Vec<NodeIndex>, GraphError> {
    Ok(self.generations()?.into_iter().flatten().collect())
  }

  /// Breadth-first walk from `start` in `direction`.
  ///
  /// Nodes already in `seen` are neither reported nor expanded, and every
  /// reported node is added to it, so repeated walks sharing `seen` report each
  /// node once. `depth` limits how many edges away from `start` to go.
  pub fn walk(
    &self,
    start: NodeIndex,
    direction: Direction,
    depth: Option<usize>,
    seen: &mut HashSet<NodeIndex>,
  ) -> Vec<NodeIndex> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((node, distance)) = queue.pop_front() {
      if let Some(max) = depth
        && distance >= max
      {
        continue;
      }
      for next in self.neighbors(node, direction) {
        if seen.insert(next) {
          found.push(next);
          queue.push_back((next, distance + 1));
        }
      }
    }

    found
  }
}
