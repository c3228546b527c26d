//! A loaded manifest plus an optional tag selection (`repo` or `repo:tag`).

use std::rc::Rc;

use crate::graph::Specificity;
use crate::manifest::{LoadedManifest, Manifest, ManifestEntry};
use crate::util::path;

#[derive(Debug, Clone)]
pub struct Repo {
  pub name: String,
  /// The tag named in the reference, if any. May be a shared tag.
  pub tag: Option<String>,
  pub manifest: Rc<Manifest>,
  /// Indices of the selected entries in manifest order.
  entries: Vec<usize>,
}

impl Repo {
  /// Select the entries named by `tag`: the entry declaring it, or every entry
  /// contributing to it as a shared tag. Without a tag all entries are selected.
  pub fn new(name: impl Into<String>, tag: Option<String>, manifest: Rc<Manifest>) -> Self {
    let entries = match tag.as_deref() {
      None => (0..manifest.entries.len()).collect(),
      Some(tag) => match manifest.tag_index(tag) {
        Some(index) => vec![index],
        None => manifest
          .entries
          .iter()
          .enumerate()
          .filter(|(_, e)| e.has_shared_tag(tag))
          .map(|(i, _)| i)
          .collect(),
      },
    };
    Self {
      name: name.into(),
      tag,
      manifest,
      entries,
    }
  }

  pub fn from_loaded(loaded: LoadedManifest) -> Self {
    Self::new(loaded.repo_name, loaded.tag_name, Rc::new(loaded.manifest))
  }

  /// A repo selecting only the entry at `index`, named by its first tag.
  pub fn entry_repo(&self, index: usize) -> Repo {
    Repo {
      name: self.name.clone(),
      tag: self.manifest.entries.get(index).map(|e| e.primary_tag().to_string()),
      manifest: Rc::clone(&self.manifest),
      entries: vec![index],
    }
  }

  /// `repo:<first tag>` when a tag is selected, otherwise just the repo name.
  pub fn identifier(&self) -> String {
    match (&self.tag, self.entries().next()) {
      (Some(_), Some((_, entry))) => self.entry_identifier(entry),
      _ => self.name.clone(),
    }
  }

  pub fn entry_identifier(&self, entry: &ManifestEntry) -> String {
    format!("{}:{}", self.name, entry.primary_tag())
  }

  /// How strongly this repo claims the tags it registers in a build graph.
  pub fn specificity(&self) -> Specificity {
    match self.tag {
      Some(_) => Specificity::Tag,
      None => Specificity::Repository,
    }
  }

  pub fn entry_indices(&self) -> &[usize] {
    &self.entries
  }

  /// The selected entries with their manifest indices.
  pub fn entries(&self) -> impl Iterator<Item = (usize, &ManifestEntry)> {
    self
      .entries
      .iter()
      .filter_map(|&i| self.manifest.entries.get(i).map(|e| (i, e)))
  }

  /// Fully qualified names of `entry`'s tags followed by its shared tags, as
  /// `namespace/repo:tag`. With `uniq` only the first is returned.
  pub fn tags(&self, namespace: &str, uniq: bool, entry: &ManifestEntry) -> Vec<String> {
    let tag_repo = path::join(namespace, &self.name);
    let all = entry.tags.iter().chain(entry.shared_tags.iter());
    let take = if uniq { 1 } else { usize::MAX };
    all.take(take).map(|tag| format!("{}:{}", tag_repo, tag)).collect()
  }
}
