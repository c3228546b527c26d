//! kiln-lib: Core types and logic for kiln
//!
//! This crate decides what to build for a catalog of container image
//! manifests, and in which order:
//! - `Manifest`: parsed repository build definitions (tags, sources, arches)
//! - `DockerfileMetadata`: the base images a build file depends on
//! - `BuildGraph`: base-image dependency graph with deterministic topological order
//! - `CacheFingerprint`: content hash identifying the artifact a build would produce

pub mod constraints;
pub mod consts;
pub mod dockerfile;
pub mod fingerprint;
pub mod git;
pub mod graph;
pub mod image;
pub mod library;
pub mod manifest;
pub mod platform;
pub mod repo;
pub mod resolver;
pub mod util;
