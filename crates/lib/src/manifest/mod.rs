//! Image manifests: the declarative description of how each tag of a
//! repository is built.

pub mod fetch;
pub mod line_based;
pub mod parse;
pub mod rfc2822;
mod types;

pub use fetch::{FetchError, LoadedManifest, load};
pub use parse::{parse, parse_rfc2822};
pub use types::*;
