//! Implementation of the `kiln shared-tags` command.

use anyhow::Result;
use serde::Serialize;

use kiln_lib::util::path;

use super::Globals;
use crate::output::{print_item, print_json};

#[derive(Debug, Serialize)]
struct Group {
  shared_tags: Vec<String>,
  /// Identifiers of the entries backing the shared tags.
  entries: Vec<String>,
}

/// Print each group of shared tags with the entries that back it.
pub fn cmd_shared_tags(globals: &Globals, repos: &[String], all: bool) -> Result<()> {
  let mut library = globals.library();
  let references = library.references(all, repos)?;
  let repos = library.load_all(&references)?;

  let mut groups = Vec::new();
  for repo in &repos {
    let tag_repo = path::join(&globals.namespace, &repo.name);
    for group in repo.manifest.shared_tag_groups() {
      if !group.entries.iter().any(|i| repo.entry_indices().contains(i)) {
        continue;
      }
      groups.push(Group {
        shared_tags: group
          .shared_tags
          .iter()
          .map(|tag| format!("{}:{}", tag_repo, tag))
          .collect(),
        entries: group
          .entries
          .iter()
          .filter_map(|&i| repo.manifest.entries.get(i))
          .map(|entry| format!("{}:{}", tag_repo, entry.primary_tag()))
          .collect(),
      });
    }
  }

  if globals.format.is_json() {
    print_json(&groups)?;
  } else {
    for group in &groups {
      println!("{}", group.shared_tags.join(", "));
      for entry in &group.entries {
        print_item(entry);
      }
    }
  }

  Ok(())
}
