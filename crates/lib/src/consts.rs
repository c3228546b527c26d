pub const APP_NAME: &str = "kiln";

/// Namespace under which cache fingerprints are tagged (`kiln/cache:<digest>`).
pub const CACHE_TAG_NAMESPACE: &str = "kiln/cache";

/// Pseudo-base image meaning "no base at all".
pub const SCRATCH: &str = "scratch";

/// Placeholder commit meaning "whatever `GitFetch` points at".
pub const FETCH_HEAD: &str = "FETCH_HEAD";

pub const DEFAULT_GIT_FETCH: &str = "refs/heads/master";
pub const DEFAULT_DIRECTORY: &str = ".";
pub const DEFAULT_FILE: &str = "Dockerfile";

/// Fetch spec used by the legacy line-based manifest format.
pub const LINE_BASED_GIT_FETCH: &str = "refs/heads/*";

/// Prefix for the local refs that pin fetched commits in the git cache.
pub const GIT_CACHE_REF_PREFIX: &str = "refs/tags/kiln";
