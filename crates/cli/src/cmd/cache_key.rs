//! Implementation of the `kiln cache-key` command.
//!
//! Prints, in build order, the local cache tag a build of each eligible entry
//! would be stored under. Base images must already be present locally.

use anyhow::{Context, Result};
use serde::Serialize;

use kiln_lib::graph::{SortOptions, sort_repos, sorted_entries};
use kiln_lib::platform::Arch;

use super::Globals;
use crate::output::print_json;

#[derive(Debug, Serialize)]
struct CacheKey {
  tags: Vec<String>,
  arch: Arch,
  digest: String,
  cache_tag: String,
}

pub fn cmd_cache_key(globals: &Globals, repos: &[String], all: bool, uniq: bool) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(all, repos)?;
  let repos = library.load_all(&references)?;

  let arch = globals.arch();
  let filter = globals.filter();
  let mut resolver = globals.resolver();
  let sort = SortOptions {
    namespace: &globals.namespace,
    filter: &filter,
    apply_constraints: true,
    sort: !globals.no_sort,
  };

  let repos = sort_repos(&repos, &mut resolver, &sort).context("Failed to determine build order")?;

  let mut keys = Vec::new();
  for repo in &repos {
    let indices = sorted_entries(repo, &mut resolver, &sort)
      .with_context(|| format!("Failed to determine build order of {}", repo.identifier()))?;

    for entry in indices.iter().filter_map(|&i| repo.manifest.entries.get(i)) {
      if filter.skips(&repo.name, entry) {
        continue;
      }
      let fingerprint = resolver
        .fingerprint(entry, arch)
        .with_context(|| format!("Failed to compute cache key of {}", repo.entry_identifier(entry)))?;
      keys.push(CacheKey {
        tags: repo.tags(&globals.namespace, uniq, entry),
        arch,
        digest: fingerprint.digest().to_string(),
        cache_tag: fingerprint.cache_tag(),
      });
    }
  }

  if globals.format.is_json() {
    print_json(&keys)?;
  } else {
    for key in &keys {
      for tag in &key.tags {
        println!("{} {}", tag, key.cache_tag);
      }
    }
  }

  Ok(())
}
