//! Implementation of the `kiln cat` command.

use anyhow::Result;
use serde::Serialize;

use kiln_lib::manifest::Manifest;
use kiln_lib::repo::Repo;

use super::Globals;
use crate::output::print_json;

#[derive(Debug, Serialize)]
struct RepoManifest {
  repo: String,
  manifest: Manifest,
}

/// The part of the manifest a repo selects: everything, or the global
/// paragraph plus the selected entries.
fn selected(repo: &Repo) -> Manifest {
  if repo.tag.is_none() {
    return repo.manifest.as_ref().clone();
  }
  Manifest {
    global: repo.manifest.global.clone(),
    entries: repo.entries().map(|(_, entry)| entry.clone()).collect(),
  }
}

/// Print the normalized manifest of each selected repository.
pub fn cmd_cat(globals: &Globals, repos: &[String], all: bool) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(all, repos)?;
  let repos = library.load_all(&references)?;

  let manifests: Vec<RepoManifest> = repos
    .iter()
    .map(|repo| RepoManifest {
      repo: repo.identifier(),
      manifest: selected(repo),
    })
    .collect();

  if globals.format.is_json() {
    print_json(&manifests)?;
  } else {
    let texts: Vec<String> = manifests.iter().map(|m| m.manifest.to_string()).collect();
    println!("{}", texts.join("\n\n"));
  }

  Ok(())
}
