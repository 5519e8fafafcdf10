//! Crate-level error rollup.
//!
//! Component errors ([`StoreError`](crate::saga::StoreError),
//! [`SchedulingError`](crate::scheduling::SchedulingError)) live beside their
//! components; [`RouterError`] is what callers of the router see.

use crate::saga::StoreError;
use crate::scheduling::SchedulingError;

/// Errors surfaced by event routing.
///
/// Only [`Handler`](Self::Handler) is subject to the router's suppression
/// toggle. Store integrity errors (unknown identifier, duplicate
/// registration) always propagate.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Persistence collaborator failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A saga's event handler failed. The failing instance was committed
    /// before this error was raised.
    #[error("saga {saga_id} failed to handle event: {source}")]
    Handler {
        /// Identifier of the failing instance.
        saga_id: String,
        /// The underlying handler failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Deadline scheduling failure.
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
