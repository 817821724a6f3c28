//! Error types for the scheduler cache.

use thiserror::Error;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while reading or mutating the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown cluster {cluster} referenced by {key}")]
    UnknownCluster { key: String, cluster: String },

    #[error("pod {0} has no cluster assigned")]
    Unassigned(String),

    #[error("stale record for {0}: cached state changed underneath the update")]
    Stale(String),
}
