#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Saga Core Rust
//!
//! Orchestration core of an event-driven process-management framework: routes
//! domain events to long-running business-process instances (sagas) keyed by
//! correlation values, manages instance creation policy, invocation, and
//! durable commit, and lets a process schedule a future event to be
//! redelivered to itself through an engine-agnostic deadline abstraction.
//!
//! ## Architecture
//!
//! The router is the only orchestrator. Everything it collaborates with —
//! event source, persistence, job execution — sits behind a trait, with
//! in-process implementations shipped for embedded use and testing. Policy
//! decisions (which association value an event carries, whether a new
//! instance is started) are injected as a [`RoutingStrategy`].
//!
//! ## Module Organization
//!
//! - [`router`] - Event routing, creation policy, failure suppression
//! - [`saga`] - Saga lifecycle contract, association values, persistence port
//! - [`scheduling`] - Deadline scheduling and schedule tokens
//! - [`events`] - Event messages and the in-process event bus
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing bootstrap
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use saga_core::{
//!     AssociationValue, EventBus, EventMessage, EventRouter, InMemorySagaStore, InProcessEventBus,
//!     RoutingStrategy, SagaCreationPolicy,
//! };
//!
//! struct PaymentStrategy;
//!
//! impl RoutingStrategy for PaymentStrategy {
//!     fn saga_type(&self) -> &str {
//!         "payment"
//!     }
//!
//!     fn extract_association_value(&self, event: &EventMessage) -> Option<AssociationValue> {
//!         let order_id = event.payload.get("order_id")?.as_str()?;
//!         Some(AssociationValue::new("order_id", order_id))
//!     }
//!
//!     fn creation_policy(&self, _event: &EventMessage) -> SagaCreationPolicy {
//!         SagaCreationPolicy::None
//!     }
//! }
//!
//! # async fn example() -> saga_core::Result<()> {
//! let store = Arc::new(InMemorySagaStore::new());
//! let bus = Arc::new(InProcessEventBus::new());
//! let router = EventRouter::new(store, Arc::new(PaymentStrategy), bus.clone());
//!
//! router.subscribe().await;
//! bus.publish(EventMessage::new(serde_json::json!({ "order_id": "42" })))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod router;
pub mod saga;
pub mod scheduling;

pub use config::RouterConfig;
pub use error::{Result, RouterError};
pub use events::{EventBus, EventHandler, EventMessage, InProcessEventBus, SubscriptionId};
pub use router::{EventRouter, RoutingStrategy, SagaCreationPolicy};
pub use saga::{
    AssociationValue, AssociationValues, HandlerError, InMemorySagaStore, Saga, SagaStore,
    StoreError,
};
pub use scheduling::{
    DeadlineScheduler, EngineDeadlineScheduler, JobExecutionEngine, ScheduleToken,
    SchedulingError, TokioJobEngine,
};
