//! # Event System
//!
//! The routed unit ([`EventMessage`]) and the in-process event source the
//! router subscribes to ([`EventBus`] / [`InProcessEventBus`]).

pub mod bus;

pub use bus::{EventBus, EventHandler, InProcessEventBus, SubscriptionId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One domain event as routed by this core.
///
/// The payload is opaque JSON; its encoding on any wire is an external
/// concern. Deferred deliveries carry the same type, so a fired deadline is
/// indistinguishable from an externally sourced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    /// Unique identifier of this message.
    pub id: Uuid,
    /// Opaque business payload.
    pub payload: Value,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

impl EventMessage {
    /// Create an event carrying the given payload, stamped with a fresh
    /// identifier and the current time.
    pub fn new(payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}
