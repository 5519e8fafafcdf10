//! # Event Router
//!
//! The orchestration core: subscribes to an event source and routes each event
//! to every matching saga instance.
//!
//! ## Overview
//!
//! For each event the router extracts an association value through the
//! injected [`RoutingStrategy`], looks matching instances up in the store,
//! evaluates the creation policy, and then runs the strict per-instance
//! sequence load → invoke → commit under a per-identifier lock. Handler
//! failures are committed first (partial progress stays durable) and then
//! either suppressed or propagated depending on the runtime toggle.
//!
//! ## Concurrency
//!
//! Events addressed to the same identifier are strictly ordered; events
//! addressed to disjoint identifiers proceed in parallel. The find-or-create
//! step runs under a lock keyed on the association value so two concurrent
//! events carrying the same new association cannot both create an instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, trace, warn};

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::events::{EventBus, EventHandler, EventMessage, SubscriptionId};
use crate::saga::{AssociationValue, Saga, SagaStore};

/// The rule deciding whether a new saga instance is started for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SagaCreationPolicy {
    /// Never create; route to existing instances only.
    #[default]
    None,
    /// Create only when no instance matches the association value.
    IfNoneFound,
    /// Create a new instance for every event, matches or not.
    Always,
}

/// The injected strategy bundle: saga type name, association extraction,
/// creation policy, and the instance factory.
///
/// This is the explicit form of what the source framework derived from
/// handler metadata; wiring stays outside the core.
pub trait RoutingStrategy: Send + Sync {
    /// Namespace of the saga type this router manages.
    fn saga_type(&self) -> &str;

    /// Extract the association value correlating this event to instances.
    /// `None` means the event is not relevant to this saga type.
    fn extract_association_value(&self, event: &EventMessage) -> Option<AssociationValue>;

    /// The creation policy to apply for this event.
    fn creation_policy(&self, event: &EventMessage) -> SagaCreationPolicy;

    /// Build a new instance for this event. Strategies whose policy never
    /// mandates creation can keep the default.
    fn create_saga(&self, event: &EventMessage) -> Option<Arc<dyn Saga>> {
        let _ = event;
        None
    }
}

/// Routes domain events to matching saga instances and commits their state.
///
/// Constructed behind an `Arc` so it can hand itself to the event bus as a
/// handler when subscribing.
pub struct EventRouter {
    store: Arc<dyn SagaStore>,
    strategy: Arc<dyn RoutingStrategy>,
    bus: Arc<dyn EventBus>,
    suppress_handler_errors: AtomicBool,
    subscription: Mutex<Option<SubscriptionId>>,
    instance_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    creation_locks: DashMap<AssociationValue, Arc<AsyncMutex<()>>>,
    self_handle: Weak<EventRouter>,
}

impl EventRouter {
    /// Create a router with default configuration (handler errors
    /// suppressed).
    pub fn new(
        store: Arc<dyn SagaStore>,
        strategy: Arc<dyn RoutingStrategy>,
        bus: Arc<dyn EventBus>,
    ) -> Arc<Self> {
        Self::with_config(store, strategy, bus, &RouterConfig::default())
    }

    /// Create a router with explicit configuration.
    pub fn with_config(
        store: Arc<dyn SagaStore>,
        strategy: Arc<dyn RoutingStrategy>,
        bus: Arc<dyn EventBus>,
        config: &RouterConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_handle| Self {
            store,
            strategy,
            bus,
            suppress_handler_errors: AtomicBool::new(config.suppress_handler_errors),
            subscription: Mutex::new(None),
            instance_locks: DashMap::new(),
            creation_locks: DashMap::new(),
            self_handle: self_handle.clone(),
        })
    }

    /// Toggle whether handler failures are suppressed (default) or propagated
    /// to the caller of [`handle`](Self::handle).
    pub fn set_suppress_exceptions(&self, suppress: bool) {
        self.suppress_handler_errors
            .store(suppress, Ordering::Relaxed);
    }

    /// Current suppression setting.
    pub fn suppresses_exceptions(&self) -> bool {
        self.suppress_handler_errors.load(Ordering::Relaxed)
    }

    /// Register with the event source. Exactly one active subscription is
    /// expected; re-subscribing while subscribed is a logged no-op.
    pub async fn subscribe(&self) {
        if self.subscription.lock().is_some() {
            warn!(
                saga_type = self.strategy.saga_type(),
                "router is already subscribed; ignoring"
            );
            return;
        }
        // The upgrade always succeeds while `self` is alive; the weak handle
        // exists only to hand the bus a strong one.
        let Some(handler) = self.self_handle.upgrade() else {
            return;
        };
        let subscription = self.bus.subscribe(handler as Arc<dyn EventHandler>).await;
        *self.subscription.lock() = Some(subscription);
        info!(
            saga_type = self.strategy.saga_type(),
            %subscription,
            "router subscribed to event source"
        );
    }

    /// Deregister from the event source. After return, no further deliveries
    /// are attributable to the subscription. Returns `false` if the router
    /// was not subscribed.
    pub async fn unsubscribe(&self) -> bool {
        let subscription = self.subscription.lock().take();
        match subscription {
            Some(subscription) => {
                let removed = self.bus.unsubscribe(subscription).await;
                info!(
                    saga_type = self.strategy.saga_type(),
                    %subscription,
                    "router unsubscribed from event source"
                );
                removed
            }
            None => false,
        }
    }

    /// Route one event: extract the association value, find or create
    /// matching instances, then invoke and commit each active one in order.
    pub async fn handle(&self, event: &EventMessage) -> Result<(), RouterError> {
        let Some(association) = self.strategy.extract_association_value(event) else {
            trace!(
                saga_type = self.strategy.saga_type(),
                event_id = %event.id,
                "event carries no association value for this saga type; ignoring"
            );
            return Ok(());
        };

        let identifiers = self.find_or_create(event, &association).await?;
        let suppress = self.suppresses_exceptions();
        let saga_type = self.strategy.saga_type();

        for saga_id in identifiers {
            let lock = self.instance_lock(&saga_id);
            let _guard = lock.lock().await;

            let saga = self.store.load(saga_type, &saga_id).await?;
            if !saga.is_active() {
                debug!(
                    saga_type,
                    saga_id = %saga_id,
                    "skipping concluded saga referenced by a stale index entry"
                );
                continue;
            }

            if let Err(cause) = saga.handle(event).await {
                // State mutated up to the failure point stays durable, and
                // later redeliveries of this event see the committed result.
                self.store.commit(saga_type, saga.as_ref()).await?;
                if suppress {
                    warn!(
                        saga_type,
                        saga_id = %saga_id,
                        event_id = %event.id,
                        error = %cause,
                        "saga handler failed; suppressing and continuing with remaining instances"
                    );
                    continue;
                }
                return Err(RouterError::Handler {
                    saga_id,
                    source: cause,
                });
            }

            self.store.commit(saga_type, saga.as_ref()).await?;
        }

        Ok(())
    }

    /// Look up matching identifiers and apply the creation policy, all under
    /// a lock keyed on the association value. The lock is released before
    /// dispatch begins.
    async fn find_or_create(
        &self,
        event: &EventMessage,
        association: &AssociationValue,
    ) -> Result<Vec<String>, RouterError> {
        let saga_type = self.strategy.saga_type();
        let lock = self.creation_lock(association);
        let _guard = lock.lock().await;

        let found = self.store.find(saga_type, association).await?;
        let mut identifiers = Vec::with_capacity(found.len());
        for saga_id in found {
            if !identifiers.contains(&saga_id) {
                identifiers.push(saga_id);
            }
        }

        let mandated = match self.strategy.creation_policy(event) {
            SagaCreationPolicy::Always => true,
            SagaCreationPolicy::IfNoneFound => identifiers.is_empty(),
            SagaCreationPolicy::None => false,
        };
        if !mandated {
            return Ok(identifiers);
        }

        match self.strategy.create_saga(event) {
            Some(saga) => {
                saga.association_values().add(association.clone());
                let saga_id = saga.saga_identifier().to_string();
                self.store.add(saga_type, saga).await?;
                info!(saga_type, saga_id = %saga_id, %association, "created new saga instance");
                if !identifiers.contains(&saga_id) {
                    identifiers.push(saga_id);
                }
            }
            None => {
                error!(
                    saga_type,
                    event_id = %event.id,
                    "creation policy mandated a new saga but the strategy provides no factory"
                );
            }
        }

        Ok(identifiers)
    }

    fn instance_lock(&self, saga_id: &str) -> Arc<AsyncMutex<()>> {
        self.instance_locks
            .entry(saga_id.to_string())
            .or_default()
            .clone()
    }

    fn creation_lock(&self, association: &AssociationValue) -> Arc<AsyncMutex<()>> {
        self.creation_locks
            .entry(association.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl EventHandler for EventRouter {
    async fn on_event(
        &self,
        event: &EventMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.handle(event).await.map_err(|err| Box::new(err) as _)
    }

    fn handler_name(&self) -> &str {
        self.strategy.saga_type()
    }
}
