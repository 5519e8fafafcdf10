#![allow(dead_code)] // Each integration test binary uses its own subset.

//! Test doubles for router integration tests.
//!
//! Recording sagas track every delivered event behind shared state: `with_*`
//! builders to shape behavior, accessors to assert on what happened.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use saga_core::{
    AssociationValue, AssociationValues, EventMessage, HandlerError, RoutingStrategy, Saga,
    SagaCreationPolicy,
};

/// Mutable state of a [`RecordingSaga`], shared with the test for assertions.
#[derive(Debug, Default)]
pub struct RecordingState {
    /// Identifiers of every event delivered to `handle`, in order.
    pub handled_events: Vec<Uuid>,
    /// Current activity flag.
    pub active: bool,
    /// When set, `handle` fails with this message after recording the event.
    pub fail_with: Option<String>,
    /// When set, the saga deactivates itself while handling the next event.
    pub deactivate_on_next_event: bool,
    /// When set, `handle` adds this association while handling an event.
    pub associate_on_handle: Option<AssociationValue>,
}

/// Saga test double recording every invocation.
pub struct RecordingSaga {
    saga_id: String,
    associations: AssociationValues,
    state: Arc<Mutex<RecordingState>>,
    handle_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSaga {
    /// Create an active saga with no associations.
    pub fn new(saga_id: impl Into<String>) -> Self {
        Self {
            saga_id: saga_id.into(),
            associations: AssociationValues::new(),
            state: Arc::new(Mutex::new(RecordingState {
                active: true,
                ..RecordingState::default()
            })),
            handle_delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Associate the saga, leaving the delta pending so registration (or the
    /// next commit) carries it into the store's index.
    pub fn with_association(self, association: AssociationValue) -> Self {
        self.associations.add(association);
        self
    }

    /// Make `handle` fail with the given message.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.state.lock().unwrap().fail_with = Some(message.into());
        self
    }

    /// Add an association during the next `handle` invocations.
    pub fn with_association_on_handle(self, association: AssociationValue) -> Self {
        self.state.lock().unwrap().associate_on_handle = Some(association);
        self
    }

    /// Deactivate the saga while handling its next event.
    pub fn deactivating_on_next_event(self) -> Self {
        self.state.lock().unwrap().deactivate_on_next_event = true;
        self
    }

    /// Start the saga concluded.
    pub fn inactive(self) -> Self {
        self.state.lock().unwrap().active = false;
        self
    }

    /// Hold each `handle` invocation open for the given duration, tracking
    /// how many run concurrently.
    pub fn with_handle_delay(mut self, delay: Duration) -> Self {
        self.handle_delay = Some(delay);
        self
    }

    /// Number of events delivered so far.
    pub fn handled_count(&self) -> usize {
        self.state.lock().unwrap().handled_events.len()
    }

    /// Identifiers of delivered events, in order.
    pub fn handled_events(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().handled_events.clone()
    }

    /// Highest number of concurrently running `handle` invocations observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Saga for RecordingSaga {
    fn saga_identifier(&self) -> &str {
        &self.saga_id
    }

    fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    fn association_values(&self) -> &AssociationValues {
        &self.associations
    }

    async fn handle(&self, event: &EventMessage) -> Result<(), HandlerError> {
        let failure = {
            let mut state = self.state.lock().unwrap();
            state.handled_events.push(event.id);
            if state.deactivate_on_next_event {
                state.active = false;
            }
            if let Some(association) = state.associate_on_handle.clone() {
                self.associations.add(association);
            }
            state.fail_with.clone()
        };

        if let Some(delay) = self.handle_delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        match failure {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

type SagaFactory = Box<dyn Fn(&EventMessage) -> Arc<dyn Saga> + Send + Sync>;

/// Strategy double extracting the association value from the event payload's
/// `"key"` / `"value"` fields.
pub struct PayloadStrategy {
    saga_type: String,
    policy: SagaCreationPolicy,
    factory: Option<SagaFactory>,
}

impl PayloadStrategy {
    pub fn new(saga_type: impl Into<String>) -> Self {
        Self {
            saga_type: saga_type.into(),
            policy: SagaCreationPolicy::None,
            factory: None,
        }
    }

    pub fn with_policy(mut self, policy: SagaCreationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&EventMessage) -> Arc<dyn Saga> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }
}

impl RoutingStrategy for PayloadStrategy {
    fn saga_type(&self) -> &str {
        &self.saga_type
    }

    fn extract_association_value(&self, event: &EventMessage) -> Option<AssociationValue> {
        let key = event.payload.get("key")?.as_str()?;
        let value = event.payload.get("value")?.as_str()?;
        Some(AssociationValue::new(key, value))
    }

    fn creation_policy(&self, _event: &EventMessage) -> SagaCreationPolicy {
        self.policy
    }

    fn create_saga(&self, event: &EventMessage) -> Option<Arc<dyn Saga>> {
        self.factory.as_ref().map(|factory| factory(event))
    }
}

/// Event whose payload associates it with `("association", "value")`, the
/// correlation used throughout the routing tests.
pub fn correlated_event() -> EventMessage {
    event_for("association", "value")
}

/// Event whose payload associates it with the given pair.
pub fn event_for(key: &str, value: &str) -> EventMessage {
    EventMessage::new(serde_json::json!({ "key": key, "value": value }))
}
