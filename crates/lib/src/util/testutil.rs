//! Test doubles for the git and image collaborators.
//!
//! Both keep their state behind an `Rc<RefCell<_>>` so a test can hand a clone
//! to a [`Resolver`](crate::resolver::Resolver) and still inspect call counts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::consts::FETCH_HEAD;
use crate::git::{GitError, GitLocation, GitSource};
use crate::image::{ImageError, ImageInspector};
use crate::resolver::Resolver;
use crate::util::hash::hash_bytes;

#[derive(Default)]
struct GitState {
  files: HashMap<(String, String), String>,
  resolve_calls: usize,
  show_calls: usize,
}

/// In-memory [`GitSource`].
///
/// Concrete commits resolve to themselves; `FETCH_HEAD` resolves to a hash of
/// the location so different fetch specs yield different commits.
#[derive(Clone, Default)]
pub struct FakeGit {
  state: Rc<RefCell<GitState>>,
}

impl FakeGit {
  pub fn with_file(self, commit: &str, path: &str, contents: &str) -> Self {
    self
      .state
      .borrow_mut()
      .files
      .insert((commit.to_string(), path.to_string()), contents.to_string());
    self
  }

  pub fn resolve_calls(&self) -> usize {
    self.state.borrow().resolve_calls
  }

  pub fn show_calls(&self) -> usize {
    self.state.borrow().show_calls
  }

  /// The commit `FETCH_HEAD` resolves to for `location`.
  pub fn fetch_head_commit(location: &GitLocation) -> String {
    hash_bytes(location.cache_key().as_bytes()).0[..40].to_string()
  }
}

impl GitSource for FakeGit {
  fn resolve_commit(&mut self, location: &GitLocation) -> Result<String, GitError> {
    self.state.borrow_mut().resolve_calls += 1;
    if location.commit == FETCH_HEAD {
      return Ok(Self::fetch_head_commit(location));
    }
    Ok(location.commit.clone())
  }

  fn show_file(&mut self, commit: &str, path: &str) -> Result<String, GitError> {
    let mut state = self.state.borrow_mut();
    state.show_calls += 1;
    state
      .files
      .get(&(commit.to_string(), path.to_string()))
      .cloned()
      .ok_or_else(|| GitError::FileNotFound {
        commit: commit.to_string(),
        path: path.to_string(),
      })
  }
}

#[derive(Default)]
struct ImageState {
  ids: HashMap<String, String>,
  calls: usize,
}

/// In-memory [`ImageInspector`]; unknown references fail like a missing image.
#[derive(Clone, Default)]
pub struct FakeImages {
  state: Rc<RefCell<ImageState>>,
}

impl FakeImages {
  pub fn with_image(self, reference: &str, id: &str) -> Self {
    self
      .state
      .borrow_mut()
      .ids
      .insert(reference.to_string(), id.to_string());
    self
  }

  pub fn calls(&self) -> usize {
    self.state.borrow().calls
  }
}

impl ImageInspector for FakeImages {
  fn image_id(&mut self, reference: &str) -> Result<String, ImageError> {
    let mut state = self.state.borrow_mut();
    state.calls += 1;
    state.ids.get(reference).cloned().ok_or_else(|| ImageError::Inspect {
      reference: reference.to_string(),
      stderr: "No such image".to_string(),
    })
  }
}

/// A resolver over the given fakes.
pub fn fake_resolver(git: &FakeGit, images: &FakeImages) -> Resolver {
  Resolver::new(Box::new(git.clone()), Box::new(images.clone()))
}
