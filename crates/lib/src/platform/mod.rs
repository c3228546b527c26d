//! Host facts: the supported image architectures and default on-disk locations.

pub mod arch;
pub mod paths;

pub use arch::{Arch, OciPlatform, UnsupportedArch, host_arch};
