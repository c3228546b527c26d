use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use kiln_lib::platform::paths::git_cache_dir;

use super::Globals;
use crate::output::{print_json, print_stat};

#[derive(Debug, Serialize)]
struct Info {
  version: &'static str,
  arch: String,
  platform: String,
  library: PathBuf,
  cache: PathBuf,
  git_cache: PathBuf,
  constraints: Vec<String>,
}

pub fn cmd_info(globals: &Globals) -> Result<()> {
  let arch = globals.arch();
  let library = globals.library_dir();
  let cache = globals.cache_dir();

  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    arch: arch.to_string(),
    platform: arch.oci_platform().to_string(),
    library: dunce::canonicalize(&library).unwrap_or(library),
    git_cache: git_cache_dir(&cache),
    cache,
    constraints: globals.constraints.clone(),
  };

  if globals.format.is_json() {
    return print_json(&info);
  }

  print_stat("Version", info.version);
  print_stat("Arch", &info.arch);
  print_stat("Platform", &info.platform);
  print_stat("Library", &info.library.display().to_string());
  print_stat("Cache", &info.cache.display().to_string());
  print_stat("Git cache", &info.git_cache.display().to_string());
  if !info.constraints.is_empty() {
    print_stat("Constraints", &info.constraints.join(", "));
  }
  Ok(())
}
