//! In-process event bus with thread-safe subscription management.
//!
//! The bus is the event source the router registers with. Delivery is
//! sequential in registration order; a failing handler is logged and does not
//! block delivery to the others. Transports with stronger guarantees plug in
//! behind the same [`EventBus`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::EventMessage;

/// Handle identifying one active subscription.
pub type SubscriptionId = Uuid;

/// Receiver side of event delivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Deliver one event to this handler.
    async fn on_event(
        &self,
        event: &EventMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Handler name for identification in logs.
    fn handler_name(&self) -> &str {
        "unnamed_handler"
    }
}

/// An event source handlers can subscribe to.
///
/// Delivery is at-least-once. No ordering is guaranteed across distinct saga
/// identifiers; same-identifier ordering is only as strong as the transport's
/// own guarantee.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Register a handler. Events published after this call are delivered to
    /// it until the returned subscription is cancelled.
    async fn subscribe(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId;

    /// Cancel a subscription. Returns `false` if it was not active. After
    /// return, no further deliveries are attributable to it.
    async fn unsubscribe(&self, subscription: SubscriptionId) -> bool;

    /// Deliver an event to every current subscriber.
    async fn publish(&self, event: EventMessage);
}

/// Event bus delivering to subscribers within the current process.
#[derive(Default)]
pub struct InProcessEventBus {
    subscriptions: RwLock<Vec<(SubscriptionId, Arc<dyn EventHandler>)>>,
}

impl InProcessEventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn subscribe(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let subscription = Uuid::new_v4();
        debug!(
            %subscription,
            handler = handler.handler_name(),
            "registering event subscription"
        );
        self.subscriptions
            .write()
            .await
            .push((subscription, handler));
        subscription
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write().await;
        let before = subscriptions.len();
        subscriptions.retain(|(id, _)| *id != subscription);
        let removed = subscriptions.len() < before;
        if removed {
            debug!(%subscription, "cancelled event subscription");
        }
        removed
    }

    async fn publish(&self, event: EventMessage) {
        // Snapshot under the read lock, deliver outside it: handlers may
        // themselves subscribe or unsubscribe while handling.
        let subscribers: Vec<(SubscriptionId, Arc<dyn EventHandler>)> =
            self.subscriptions.read().await.clone();

        for (subscription, handler) in subscribers {
            if let Err(error) = handler.on_event(&event).await {
                warn!(
                    %subscription,
                    handler = handler.handler_name(),
                    event_id = %event.id,
                    %error,
                    "event handler failed; continuing delivery to remaining subscribers"
                );
            }
        }
    }
}
