//! Engine error types.

use slicegrid_placement::PlacementError;
use slicegrid_state::CacheError;
use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("namespace {key}: changing quota slice size or slice count is not supported, deschedule first")]
    ShapeMismatch { key: String },

    #[error("namespace {0} has not been scheduled")]
    NamespaceNotScheduled(String),

    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("fit algorithm left a slice of {namespace} undecided")]
    UndecidedSlice { namespace: String },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl EngineError {
    /// Whether re-invoking the same call may succeed once conditions change.
    ///
    /// A shape mismatch needs an explicit deschedule first and an undecided
    /// slice is a fit-algorithm bug; everything else can clear up.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            EngineError::ShapeMismatch { .. } | EngineError::UndecidedSlice { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
