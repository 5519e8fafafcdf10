//! The persistence port for saga state and the association index.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AssociationValue, Saga};

/// Errors from saga store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No saga is registered under the given identifier.
    #[error("no saga registered under identifier {0}")]
    NotFound(String),

    /// A saga with the same identifier was already registered.
    #[error("saga {0} is already registered")]
    DuplicateIdentifier(String),

    /// Implementation-specific failure of a durable backend.
    #[error("storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend-specific failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Storage for saga instances and the association index that routes events
/// to them.
///
/// Implementations must keep the index in step with committed association
/// deltas, and must treat [`commit`](Self::commit) of an inactive saga as a
/// normal persist: concluded instances stay loadable so the router can skip
/// stale index entries instead of failing on them.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Load a saga by identifier. Fails with [`StoreError::NotFound`] if
    /// absent.
    async fn load(&self, saga_type: &str, saga_id: &str) -> Result<Arc<dyn Saga>, StoreError>;

    /// Durably persist a saga's state and apply its pending association delta
    /// to the index, then mark the delta synced.
    async fn commit(&self, saga_type: &str, saga: &dyn Saga) -> Result<(), StoreError>;

    /// First registration of a new saga. Fails with
    /// [`StoreError::DuplicateIdentifier`] on an identifier conflict.
    async fn add(&self, saga_type: &str, saga: Arc<dyn Saga>) -> Result<(), StoreError>;

    /// Identifiers of all sagas of the given type associated with the given
    /// value. The order is implementation-defined but stable for identical
    /// index contents, and free of duplicates.
    async fn find(
        &self,
        saga_type: &str,
        association: &AssociationValue,
    ) -> Result<Vec<String>, StoreError>;
}
