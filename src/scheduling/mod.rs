//! # Deadline Scheduling
//!
//! Lets a saga request redelivery of a payload at a future point in time and
//! cancel that request before it fires.
//!
//! ## Overview
//!
//! The router-visible abstraction is [`DeadlineScheduler`]: schedule a payload,
//! get back an opaque [`ScheduleToken`], optionally cancel with it. Concrete
//! job-execution engines need a two-part address (job identifier, group
//! identifier); [`JobExecutionEngine`] is that collaborator port and
//! [`EngineDeadlineScheduler`] projects its addresses into tokens, keeping the
//! orchestration core free of any engine specifics. When a deferred job fires,
//! its payload re-enters the router through the event bus exactly like an
//! externally sourced event.

pub mod tokio_engine;

pub use tokio_engine::TokioJobEngine;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::EventMessage;

/// Opaque handle addressing one deferred scheduled delivery.
///
/// A two-field value, never a delimited string: the job and group namespaces
/// must stay unambiguous. Carries no behavior; it exists for cancellation and
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleToken {
    job_identifier: String,
    group_identifier: String,
}

impl ScheduleToken {
    /// Build a token from the engine's two-part job address.
    pub fn new(job_identifier: impl Into<String>, group_identifier: impl Into<String>) -> Self {
        Self {
            job_identifier: job_identifier.into(),
            group_identifier: group_identifier.into(),
        }
    }

    /// The identifier the job was registered under.
    pub fn job_identifier(&self) -> &str {
        &self.job_identifier
    }

    /// The group namespace the job belongs to.
    pub fn group_identifier(&self) -> &str {
        &self.group_identifier
    }
}

impl fmt::Display for ScheduleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scheduled job {} in group {}",
            self.job_identifier, self.group_identifier
        )
    }
}

/// Errors from deadline scheduling.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// The scheduling engine rejected a schedule request.
    #[error("scheduling engine rejected the job: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SchedulingError {
    /// Wrap an engine-specific failure.
    pub fn engine<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Engine(Box::new(err))
    }
}

/// Deferred redelivery of event payloads, addressable by opaque tokens.
#[async_trait]
pub trait DeadlineScheduler: Send + Sync {
    /// Register a deferred delivery of `payload` at (or after) `trigger_at`.
    /// The returned token is the only address the job has from here on.
    async fn schedule(
        &self,
        trigger_at: DateTime<Utc>,
        payload: EventMessage,
    ) -> Result<ScheduleToken, SchedulingError>;

    /// Best-effort cancellation. Returns `true` if a pending job was
    /// cancelled, `false` if it already fired or does not exist. Never fails:
    /// a job that cannot be cancelled has simply fired.
    async fn cancel(&self, token: &ScheduleToken) -> bool;
}

/// The concrete job-execution engine behind the scheduler.
///
/// Engines address jobs by a (job identifier, group identifier) pair. Safe for
/// `delete_job` to race the job's own firing: either the job fires or the
/// delete wins, never both and never neither.
#[async_trait]
pub trait JobExecutionEngine: Send + Sync {
    /// Register a job firing at (or after) `trigger_at`. Returns the two-part
    /// address the job was registered under.
    async fn schedule_job(
        &self,
        trigger_at: DateTime<Utc>,
        payload: EventMessage,
    ) -> Result<(String, String), SchedulingError>;

    /// Delete a pending job. Returns `false` if no pending job matches the
    /// address.
    async fn delete_job(&self, job_id: &str, group_id: &str) -> Result<bool, SchedulingError>;
}

/// [`DeadlineScheduler`] over any [`JobExecutionEngine`], projecting the
/// engine's job addresses as [`ScheduleToken`]s.
pub struct EngineDeadlineScheduler {
    engine: Arc<dyn JobExecutionEngine>,
}

impl EngineDeadlineScheduler {
    /// Wrap a job-execution engine.
    pub fn new(engine: Arc<dyn JobExecutionEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl DeadlineScheduler for EngineDeadlineScheduler {
    async fn schedule(
        &self,
        trigger_at: DateTime<Utc>,
        payload: EventMessage,
    ) -> Result<ScheduleToken, SchedulingError> {
        let (job_id, group_id) = self.engine.schedule_job(trigger_at, payload).await?;
        Ok(ScheduleToken::new(job_id, group_id))
    }

    async fn cancel(&self, token: &ScheduleToken) -> bool {
        match self
            .engine
            .delete_job(token.job_identifier(), token.group_identifier())
            .await
        {
            Ok(deleted) => deleted,
            Err(error) => {
                debug!(%token, %error, "cancel request failed; treating the job as already fired");
                false
            }
        }
    }
}
