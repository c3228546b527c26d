use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Returns the user's home directory
///
/// Falls back to the current directory when no home is configured.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
///
/// Falls back to the current directory when no home is configured.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Location of the bare git repository holding every fetched build context
pub fn git_cache_dir(cache: &std::path::Path) -> PathBuf {
  cache.join("git")
}

/// Default manifest library: a checkout of the official-images repository in the
/// user's home.
pub fn default_library_dir() -> PathBuf {
  home_dir().join("docker").join("official-images").join("library")
}
