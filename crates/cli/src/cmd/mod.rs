mod cache_key;
mod cat;
mod family;
mod from;
mod info;
mod list;
mod shared_tags;

use std::path::PathBuf;

use clap::Args;

use kiln_lib::constraints::ConstraintFilter;
use kiln_lib::git::GixSource;
use kiln_lib::image::DockerInspector;
use kiln_lib::library::Library;
use kiln_lib::platform::paths::{cache_dir, default_library_dir, git_cache_dir};
use kiln_lib::platform::{Arch, host_arch};
use kiln_lib::resolver::Resolver;

use crate::output::OutputFormat;

pub use cache_key::cmd_cache_key;
pub use cat::cmd_cat;
pub use family::{Relation, cmd_family};
pub use from::cmd_from;
pub use info::cmd_info;
pub use list::{ListOptions, cmd_list};
pub use shared_tags::cmd_shared_tags;

/// Flags shared by every command.
#[derive(Debug, Args)]
pub struct Globals {
  /// Directory containing the manifest library
  #[arg(long, global = true, env = "KILN_LIBRARY")]
  pub library: Option<PathBuf>,

  /// Where fetched git objects are kept
  #[arg(long, global = true, env = "KILN_CACHE")]
  pub cache: Option<PathBuf>,

  /// Architecture to resolve entries for (defaults to the host's)
  #[arg(long, global = true, env = "KILN_ARCH")]
  pub arch: Option<Arch>,

  /// Namespace prefixed to every tag
  #[arg(long, global = true, default_value = "")]
  pub namespace: String,

  /// Host constraint (repeatable)
  #[arg(long = "constraint", global = true)]
  pub constraints: Vec<String>,

  /// Skip entries that declare no constraints
  #[arg(long, global = true)]
  pub exclusive_constraints: bool,

  /// Keep manifest order instead of build order
  #[arg(long, global = true)]
  pub no_sort: bool,

  /// Enable debug logging
  #[arg(long, global = true, env = "KILN_DEBUG")]
  pub debug: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

impl Globals {
  pub fn arch(&self) -> Arch {
    self.arch.unwrap_or_else(host_arch)
  }

  pub fn library_dir(&self) -> PathBuf {
    self.library.clone().unwrap_or_else(default_library_dir)
  }

  pub fn cache_dir(&self) -> PathBuf {
    self.cache.clone().unwrap_or_else(cache_dir)
  }

  pub fn library(&self) -> Library {
    Library::new(self.library_dir())
  }

  pub fn filter(&self) -> ConstraintFilter {
    ConstraintFilter::new(self.arch(), self.constraints.iter().cloned(), self.exclusive_constraints)
  }

  /// A resolver backed by the on-disk git cache and the local docker daemon.
  pub fn resolver(&self) -> Resolver {
    Resolver::new(
      Box::new(GixSource::new(git_cache_dir(&self.cache_dir()))),
      Box::new(DockerInspector::default()),
    )
  }
}
