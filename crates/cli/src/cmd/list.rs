//! Implementation of the `kiln list` command.
//!
//! Prints fully qualified tags (or repository names), optionally in the order
//! they have to be built.

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::graph::{SortOptions, sort_repos, sorted_entries};

use super::Globals;
use crate::output::print_json;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
  pub all: bool,
  pub uniq: bool,
  pub build_order: bool,
  pub apply_constraints: bool,
  pub repos_only: bool,
}

pub fn cmd_list(globals: &Globals, repos: &[String], opts: ListOptions) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(opts.all, repos)?;
  let mut repos = library.load_all(&references)?;
  debug!(count = repos.len(), "loaded repos");

  let filter = globals.filter();
  let mut resolver = globals.resolver();
  let sort = SortOptions {
    namespace: &globals.namespace,
    filter: &filter,
    apply_constraints: opts.apply_constraints,
    sort: opts.build_order && !globals.no_sort,
  };

  if sort.sort {
    repos = sort_repos(&repos, &mut resolver, &sort).context("Failed to determine build order")?;
  }

  let mut lines = Vec::new();
  let mut seen_repos = HashSet::new();
  for repo in &repos {
    if opts.repos_only {
      if seen_repos.insert(repo.name.clone()) {
        lines.push(repo.name.clone());
      }
      continue;
    }

    let indices = if sort.sort {
      sorted_entries(repo, &mut resolver, &sort)
        .with_context(|| format!("Failed to determine build order of {}", repo.identifier()))?
    } else {
      repo.entry_indices().to_vec()
    };

    for entry in indices.iter().filter_map(|&i| repo.manifest.entries.get(i)) {
      if opts.apply_constraints && filter.skips(&repo.name, entry) {
        continue;
      }
      lines.extend(repo.tags(&globals.namespace, opts.uniq, entry));
    }
  }

  if globals.format.is_json() {
    print_json(&lines)?;
  } else {
    for line in &lines {
      println!("{}", line);
    }
  }

  Ok(())
}
