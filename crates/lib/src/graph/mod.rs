//! Dependency graphs between repositories, entries and tags.

pub mod family;
pub mod network;
pub mod order;
mod types;

pub use family::FamilyGraph;
pub use network::BuildGraph;
pub use order::{SortOptions, sort_repos, sorted_entries};
pub use types::*;
