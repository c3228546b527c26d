//! Implementation of the `kiln from` command.

use anyhow::{Context, Result};
use serde::Serialize;

use super::Globals;
use crate::output::print_json;

#[derive(Debug, Serialize)]
struct TagFroms {
  tag: String,
  froms: Vec<String>,
}

/// Print every image each selected tag pulls in when built for the target arch.
pub fn cmd_from(globals: &Globals, repos: &[String], all: bool, uniq: bool, apply_constraints: bool) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(all, repos)?;
  let repos = library.load_all(&references)?;

  let arch = globals.arch();
  let filter = globals.filter();
  let mut resolver = globals.resolver();

  let mut results = Vec::new();
  for repo in &repos {
    for (_, entry) in repo.entries() {
      if apply_constraints && filter.skips(&repo.name, entry) {
        continue;
      }
      if !entry.has_architecture(arch) {
        continue;
      }

      let froms = resolver
        .froms(entry, arch)
        .with_context(|| format!("Failed to resolve base images of {}", repo.entry_identifier(entry)))?;
      for tag in repo.tags(&globals.namespace, uniq, entry) {
        results.push(TagFroms {
          tag,
          froms: froms.clone(),
        });
      }
    }
  }

  if globals.format.is_json() {
    print_json(&results)?;
  } else {
    for result in &results {
      println!("{}: {}", result.tag, result.froms.join(" "));
    }
  }

  Ok(())
}
