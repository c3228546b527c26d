//! Lexical normalization of slash-separated paths inside a git tree.
//!
//! Separators are always `/`, whatever the host platform.

/// Clean a slash-separated path lexically.
///
/// - Repeated slashes collapse into one
/// - `.` elements are removed
/// - `..` elements remove the preceding element (or are dropped at the root)
/// - Trailing slashes are removed
/// - An empty result becomes `.`
pub fn clean(path: &str) -> String {
  let rooted = path.starts_with('/');
  let mut parts: Vec<&str> = Vec::new();

  for part in path.split('/') {
    match part {
      "" | "." => {}
      ".." => {
        if matches!(parts.last(), Some(last) if *last != "..") {
          parts.pop();
        } else if !rooted {
          parts.push("..");
        }
      }
      other => parts.push(other),
    }
  }

  let joined = parts.join("/");
  match (rooted, joined.is_empty()) {
    (true, _) => format!("/{}", joined),
    (false, true) => ".".to_string(),
    (false, false) => joined,
  }
}

/// Join a directory and a file name, then clean the result.
pub fn join(dir: &str, file: &str) -> String {
  if dir.is_empty() {
    return clean(file);
  }
  clean(&format!("{}/{}", dir, file))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clean_collapses_and_resolves() {
    assert_eq!(clean("a//b/./c/"), "a/b/c");
    assert_eq!(clean("a/b/../c"), "a/c");
    assert_eq!(clean("./"), ".");
    assert_eq!(clean(""), ".");
    assert_eq!(clean("../x"), "../x");
    assert_eq!(clean("/../x"), "/x");
  }

  #[test]
  fn join_with_dot_directory() {
    assert_eq!(join(".", "Dockerfile"), "Dockerfile");
    assert_eq!(join("1.6/alpine", "Dockerfile"), "1.6/alpine/Dockerfile");
  }
}
