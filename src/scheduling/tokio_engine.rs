//! Tokio-timer-backed job execution engine.
//!
//! Each pending job is one sleeping task plus an entry in the job table. The
//! entry is the arbitration point between firing and cancellation: whichever
//! side removes it owns the outcome, so a job can never fire twice and can
//! never be both cancelled and fired.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::{JobExecutionEngine, SchedulingError};
use crate::events::{EventBus, EventMessage};

/// Default group namespace for jobs scheduled by this engine.
pub const DEFAULT_JOB_GROUP: &str = "deadlines";

/// In-process [`JobExecutionEngine`] on Tokio timers.
///
/// Fired payloads are published to the event bus, so they reach the router
/// exactly like externally sourced events. Jobs do not survive a process
/// restart; durable engines plug in behind the same trait.
#[derive(Clone)]
pub struct TokioJobEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    group: String,
    bus: Arc<dyn EventBus>,
    jobs: DashMap<String, oneshot::Sender<()>>,
}

impl TokioJobEngine {
    /// Create an engine delivering fired payloads to the given bus, using the
    /// default job group.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self::with_group(bus, DEFAULT_JOB_GROUP)
    }

    /// Create an engine using the group namespace from configuration.
    pub fn from_config(bus: Arc<dyn EventBus>, config: &crate::config::RouterConfig) -> Self {
        Self::with_group(bus, config.deadline_group.clone())
    }

    /// Create an engine with an explicit group namespace.
    pub fn with_group(bus: Arc<dyn EventBus>, group: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                group: group.into(),
                bus,
                jobs: DashMap::new(),
            }),
        }
    }

    /// The group namespace this engine registers jobs under.
    pub fn group(&self) -> &str {
        &self.inner.group
    }

    /// Number of jobs currently pending.
    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.len()
    }
}

#[async_trait]
impl JobExecutionEngine for TokioJobEngine {
    async fn schedule_job(
        &self,
        trigger_at: DateTime<Utc>,
        payload: EventMessage,
    ) -> Result<(String, String), SchedulingError> {
        let job_id = Uuid::new_v4().to_string();
        // A trigger time in the past fires on the next timer tick.
        let delay = (trigger_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        // The entry must exist before the task runs, or an immediate firing
        // would lose the arbitration against its own registration.
        self.inner.jobs.insert(job_id.clone(), cancel_tx);

        let inner = Arc::clone(&self.inner);
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    // Single winner: only the side that removes the entry acts.
                    if inner.jobs.remove(&task_job_id).is_some() {
                        debug!(job_id = %task_job_id, event_id = %payload.id, "deadline elapsed; redelivering payload");
                        inner.bus.publish(payload).await;
                    }
                }
                _ = cancel_rx => {
                    debug!(job_id = %task_job_id, "job cancelled before its deadline");
                }
            }
        });

        debug!(job_id = %job_id, group = %self.inner.group, %trigger_at, "registered deferred job");
        Ok((job_id, self.inner.group.clone()))
    }

    async fn delete_job(&self, job_id: &str, group_id: &str) -> Result<bool, SchedulingError> {
        if group_id != self.inner.group {
            return Ok(false);
        }
        match self.inner.jobs.remove(job_id) {
            Some((_, cancel_tx)) => {
                // Waking the sleeper is best-effort; removing the entry already
                // decided the outcome.
                let _ = cancel_tx.send(());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
