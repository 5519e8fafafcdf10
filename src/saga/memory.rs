//! In-memory implementation of the saga store.
//!
//! Backs the integration tests and small embedded deployments. State lives in
//! process memory; the association index is kept in step with committed deltas
//! exactly like a durable implementation would.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::association::AssociationValue;
use super::store::{SagaStore, StoreError};
use super::Saga;

/// In-memory saga store with an association index.
///
/// Cloning is cheap and clones share the same state. Commits are recorded in
/// order so tests can assert on exactly which instances were committed.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    inner: Arc<InnerStore>,
}

#[derive(Default)]
struct InnerStore {
    sagas: RwLock<HashMap<(String, String), Arc<dyn Saga>>>,
    index: RwLock<HashMap<(String, AssociationValue), Vec<String>>>,
    commit_log: RwLock<Vec<String>>,
}

impl InMemorySagaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sagas, active and concluded alike.
    pub fn saga_count(&self) -> usize {
        self.inner.sagas.read().len()
    }

    /// Identifiers committed through this store, in commit order. An
    /// identifier appears once per commit.
    pub fn committed_identifiers(&self) -> Vec<String> {
        self.inner.commit_log.read().clone()
    }

    /// How many times the given identifier has been committed.
    pub fn commit_count(&self, saga_id: &str) -> usize {
        self.inner
            .commit_log
            .read()
            .iter()
            .filter(|id| id.as_str() == saga_id)
            .count()
    }

    /// Clear all sagas, index entries, and the commit log.
    pub fn clear(&self) {
        self.inner.sagas.write().clear();
        self.inner.index.write().clear();
        self.inner.commit_log.write().clear();
    }

    fn apply_association_delta(&self, saga_type: &str, saga: &dyn Saga) {
        let saga_id = saga.saga_identifier();
        let associations = saga.association_values();
        let mut index = self.inner.index.write();

        for added in associations.added_since_last_sync() {
            let entry = index
                .entry((saga_type.to_string(), added))
                .or_default();
            if !entry.iter().any(|id| id == saga_id) {
                entry.push(saga_id.to_string());
            }
        }
        for removed in associations.removed_since_last_sync() {
            let key = (saga_type.to_string(), removed);
            if let Some(entry) = index.get_mut(&key) {
                entry.retain(|id| id != saga_id);
                if entry.is_empty() {
                    index.remove(&key);
                }
            }
        }

        associations.mark_synced();
    }
}

#[async_trait::async_trait]
impl SagaStore for InMemorySagaStore {
    async fn load(&self, saga_type: &str, saga_id: &str) -> Result<Arc<dyn Saga>, StoreError> {
        self.inner
            .sagas
            .read()
            .get(&(saga_type.to_string(), saga_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(saga_id.to_string()))
    }

    async fn commit(&self, saga_type: &str, saga: &dyn Saga) -> Result<(), StoreError> {
        let saga_id = saga.saga_identifier().to_string();
        if !self
            .inner
            .sagas
            .read()
            .contains_key(&(saga_type.to_string(), saga_id.clone()))
        {
            return Err(StoreError::NotFound(saga_id));
        }

        self.apply_association_delta(saga_type, saga);
        self.inner.commit_log.write().push(saga_id);
        Ok(())
    }

    async fn add(&self, saga_type: &str, saga: Arc<dyn Saga>) -> Result<(), StoreError> {
        let saga_id = saga.saga_identifier().to_string();
        {
            let mut sagas = self.inner.sagas.write();
            let key = (saga_type.to_string(), saga_id.clone());
            if sagas.contains_key(&key) {
                return Err(StoreError::DuplicateIdentifier(saga_id));
            }
            sagas.insert(key, Arc::clone(&saga));
        }

        self.apply_association_delta(saga_type, saga.as_ref());
        Ok(())
    }

    async fn find(
        &self,
        saga_type: &str,
        association: &AssociationValue,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .index
            .read()
            .get(&(saga_type.to_string(), association.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
