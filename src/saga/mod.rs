//! # Saga Lifecycle
//!
//! The [`Saga`] trait is the capability set the router requires of any
//! long-running process instance: handle an event, report activity, expose the
//! owned association values and a stable identifier.
//!
//! ## Mutability model
//!
//! `handle` takes `&self`. Saga types keep their business state behind interior
//! mutability (`Mutex`/`RwLock`), which keeps the trait object-safe and lets the
//! store hand out shared handles while the router guarantees at-most-one
//! concurrent mutating invocation per identifier.

pub mod association;
pub mod memory;
pub mod store;

pub use association::{AssociationValue, AssociationValues};
pub use memory::InMemorySagaStore;
pub use store::{SagaStore, StoreError};

use async_trait::async_trait;

use crate::events::EventMessage;

/// Failure raised by a saga's event handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A long-running business process instance coordinated through domain events.
///
/// Instances are mutated only through [`handle`](Self::handle) and destroyed
/// only by the persistence collaborator. Deactivation is one-way: once
/// [`is_active`](Self::is_active) returns `false` it must never return `true`
/// again. Saga types do not need to guard against post-deactivation invocation;
/// the router never invokes an inactive instance.
#[async_trait]
pub trait Saga: Send + Sync {
    /// Stable identifier, unique within this saga type's namespace.
    fn saga_identifier(&self) -> &str;

    /// Whether this instance still accepts events.
    fn is_active(&self) -> bool;

    /// The association values owned by this instance.
    fn association_values(&self) -> &AssociationValues;

    /// Process one event. May mutate internal state and the owned association
    /// values, may deactivate the instance, and may fail.
    async fn handle(&self, event: &EventMessage) -> Result<(), HandlerError>;
}
