use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image architectures an entry may declare.
///
/// Variants are declared in name order so the derived `Ord` sorts the same way
/// the names do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  Amd64,
  Arm32v5,
  Arm32v6,
  Arm32v7,
  Arm64v8,
  I386,
  Mips64le,
  Ppc64le,
  S390x,
  #[serde(rename = "windows-amd64")]
  WindowsAmd64,
}

/// OCI image-index platform for an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OciPlatform {
  pub os: &'static str,
  pub architecture: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variant: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported architecture: {0}")]
pub struct UnsupportedArch(pub String);

impl Arch {
  pub const ALL: [Arch; 10] = [
    Self::Amd64,
    Self::Arm32v5,
    Self::Arm32v6,
    Self::Arm32v7,
    Self::Arm64v8,
    Self::I386,
    Self::Mips64le,
    Self::Ppc64le,
    Self::S390x,
    Self::WindowsAmd64,
  ];

  /// The architecture assumed when a manifest declares none.
  pub const DEFAULT: Arch = Arch::Amd64;

  /// Detect the image architecture matching the current host
  pub fn current() -> Option<Self> {
    Self::from_host(
      std::env::consts::OS,
      std::env::consts::ARCH,
      cfg!(target_endian = "little"),
    )
  }

  fn from_host(os: &str, arch: &str, little_endian: bool) -> Option<Self> {
    match (os, arch, little_endian) {
      ("windows", "x86_64", _) => Some(Self::WindowsAmd64),
      (_, "x86_64", _) => Some(Self::Amd64),
      (_, "aarch64", true) => Some(Self::Arm64v8),
      (_, "x86", _) => Some(Self::I386),
      (_, "powerpc64", true) => Some(Self::Ppc64le),
      (_, "s390x", _) => Some(Self::S390x),
      (_, "mips64", true) => Some(Self::Mips64le),
      _ => None,
    }
  }

  /// Returns the identifier used in manifests for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm32v5 => "arm32v5",
      Self::Arm32v6 => "arm32v6",
      Self::Arm32v7 => "arm32v7",
      Self::Arm64v8 => "arm64v8",
      Self::I386 => "i386",
      Self::Mips64le => "mips64le",
      Self::Ppc64le => "ppc64le",
      Self::S390x => "s390x",
      Self::WindowsAmd64 => "windows-amd64",
    }
  }

  pub fn oci_platform(&self) -> OciPlatform {
    let (os, architecture, variant) = match self {
      Self::Amd64 => ("linux", "amd64", None),
      Self::Arm32v5 => ("linux", "arm", Some("v5")),
      Self::Arm32v6 => ("linux", "arm", Some("v6")),
      Self::Arm32v7 => ("linux", "arm", Some("v7")),
      Self::Arm64v8 => ("linux", "arm64", Some("v8")),
      Self::I386 => ("linux", "386", None),
      Self::Mips64le => ("linux", "mips64le", None),
      Self::Ppc64le => ("linux", "ppc64le", None),
      Self::S390x => ("linux", "s390x", None),
      Self::WindowsAmd64 => ("windows", "amd64", None),
    };
    OciPlatform {
      os,
      architecture,
      variant,
    }
  }
}

impl FromStr for Arch {
  type Err = UnsupportedArch;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|arch| arch.as_str() == s)
      .ok_or_else(|| UnsupportedArch(s.to_string()))
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl fmt::Display for OciPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.variant {
      Some(variant) => write!(f, "{}/{}/{}", self.os, self.architecture, variant),
      None => write!(f, "{}/{}", self.os, self.architecture),
    }
  }
}

/// Returns the image architecture of the current host, falling back to
/// [`Arch::DEFAULT`] when the host is not in the supported table
pub fn host_arch() -> Arch {
  Arch::current().unwrap_or(Arch::DEFAULT)
}
