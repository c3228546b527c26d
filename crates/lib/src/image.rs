//! Local image inspection.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while inspecting an image.
#[derive(Debug, Error)]
pub enum ImageError {
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to inspect image '{reference}': {stderr}")]
  Inspect { reference: String, stderr: String },

  #[error("no image id reported for '{reference}'")]
  EmptyId { reference: String },
}

/// Looks up the content identifier of a locally available image.
pub trait ImageInspector {
  fn image_id(&mut self, reference: &str) -> Result<String, ImageError>;
}

/// [`ImageInspector`] that shells out to the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerInspector {
  program: String,
}

impl Default for DockerInspector {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerInspector {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl ImageInspector for DockerInspector {
  fn image_id(&mut self, reference: &str) -> Result<String, ImageError> {
    debug!(reference, "inspecting image");
    let output = Command::new(&self.program)
      .args(["inspect", "-f", "{{.Id}}", reference])
      .output()
      .map_err(|source| ImageError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    if !output.status.success() {
      return Err(ImageError::Inspect {
        reference: reference.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if id.is_empty() {
      return Err(ImageError::EmptyId {
        reference: reference.to_string(),
      });
    }
    Ok(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_program_is_a_spawn_error() {
    let mut inspector = DockerInspector::new("kiln-test-no-such-docker-binary");
    let err = inspector.image_id("debian:bookworm").unwrap_err();
    assert!(matches!(err, ImageError::Spawn { .. }));
  }

  #[test]
  #[cfg(unix)]
  fn failing_inspect_reports_stderr() {
    // `false` exits non-zero without output, standing in for a missing image
    let mut inspector = DockerInspector::new("false");
    let err = inspector.image_id("debian:bookworm").unwrap_err();
    assert!(matches!(err, ImageError::Inspect { reference, .. } if reference == "debian:bookworm"));
  }

  #[test]
  #[cfg(unix)]
  fn echoed_id_is_trimmed() {
    // `echo` prints its arguments, which is enough to check output handling
    let mut inspector = DockerInspector::new("echo");
    let id = inspector.image_id("x").unwrap();
    assert_eq!(id, "inspect -f {{.Id}} x");
  }
}
