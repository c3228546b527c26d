//! Implementation of the `kiln children` and `kiln parents` commands.
//!
//! Both build the tag-level family tree over the entire library, then walk it
//! from every tag of the named repositories.

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::graph::FamilyGraph;

use super::Globals;
use crate::output::{print_json, print_warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
  /// Images built on the named tags.
  Children,
  /// Images the named tags are built on.
  Parents,
}

pub fn cmd_family(
  globals: &Globals,
  relation: Relation,
  repos: &[String],
  all: bool,
  uniq: bool,
  depth: Option<usize>,
  apply_constraints: bool,
) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(all, repos)?;

  let everything = library.all_references()?;
  let everything = library.load_all(&everything)?;

  let filter = globals.filter();
  let mut resolver = globals.resolver();
  let family = FamilyGraph::build(
    &everything,
    &mut resolver,
    &globals.namespace,
    &filter,
    apply_constraints,
  )
  .context("Failed to build the family tree")?;

  let mut starts = Vec::new();
  for repo in library.load_all(&references)?.iter() {
    for (_, entry) in repo.entries() {
      if apply_constraints && filter.skips(&repo.name, entry) {
        continue;
      }
      for tag in repo.tags(&globals.namespace, uniq, entry) {
        if !family.contains(&tag) {
          print_warning(&format!("{} is not part of the library", tag));
        }
        starts.push(tag);
      }
    }
  }

  debug!(starts = starts.len(), ?relation, ?depth, "walking family tree");
  let found = match relation {
    Relation::Children => family.children(&starts, depth),
    Relation::Parents => family.parents(&starts, depth),
  };

  if globals.format.is_json() {
    print_json(&found)?;
  } else {
    for tag in &found {
      println!("{}", tag);
    }
  }

  Ok(())
}
