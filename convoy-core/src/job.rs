use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::tenant::TenantId;

/// Unique identifier for a job, scoped under its tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new unique job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for one audit-trail record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub String);

impl TransitionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status lifecycle
///
/// ```text
/// PENDING -> SCHEDULED -> RUNNING -> COMPLETED | FAILED
/// PENDING ------------------------> FAILED
/// any non-terminal ---------------> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted and persisted, not yet handed to the execution backend
    Pending,

    /// Admitted for dispatch, awaiting submission to the backend
    Scheduled,

    /// Accepted by the execution backend
    Running,

    /// Finished successfully (terminal)
    Completed,

    /// Rejected by the backend or explicitly failed (terminal)
    Failed,

    /// Cancelled before reaching another terminal state (terminal)
    Cancelled,
}

impl JobStatus {
    /// Check if the status is terminal (completed, failed, or cancelled)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the edge `self -> to` is a permitted lifecycle transition.
    ///
    /// Terminal states permit nothing; attempts against them must surface as
    /// invalid-transition errors, never be silently ignored.
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        match (self, to) {
            (Self::Pending, Self::Scheduled)
            | (Self::Pending, Self::Running)
            | (Self::Pending, Self::Failed)
            | (Self::Pending, Self::Cancelled)
            | (Self::Scheduled, Self::Running)
            | (Self::Scheduled, Self::Failed)
            | (Self::Scheduled, Self::Cancelled)
            | (Self::Running, Self::Completed)
            | (Self::Running, Self::Failed)
            | (Self::Running, Self::Cancelled) => true,
            _ => false,
        }
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Scheduled => "SCHEDULED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of submitted containerized work, tracked through its lifecycle.
///
/// The persistent store owns this record; in-memory copies are projections.
/// Per-transition timestamps are set exactly once and never cleared, and
/// `completed_at` is set if and only if the status is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub tenant_id: TenantId,
    pub job_id: JobId,
    pub status: JobStatus,

    /// Container image to execute
    pub image_uri: String,

    /// Ordered command sequence passed to the container
    pub commands: Vec<String>,

    /// Environment variables passed to the container
    pub env_vars: HashMap<String, String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Attempts consumed so far; modeled for forward compatibility, nothing
    /// consumes it to retry automatically
    pub retry_count: u32,
    pub max_retries: u32,

    /// Last failure detail, present once the job has failed
    pub error_message: Option<String>,

    /// Opaque handle issued by the execution backend on submission
    pub backend_handle: Option<String>,
}

impl Job {
    /// Create a new PENDING job record.
    pub fn new(
        tenant_id: TenantId,
        job_id: JobId,
        image_uri: impl Into<String>,
        commands: Vec<String>,
        env_vars: HashMap<String, String>,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            job_id,
            status: JobStatus::Pending,
            image_uri: image_uri.into(),
            commands,
            env_vars,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries,
            error_message: None,
            backend_handle: None,
        }
    }

    /// Check if the job has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Immutable audit record of one job status change.
///
/// Appended alongside every status update, in the same atomic store write;
/// never updated or deleted. `from_status` is absent only for the creation
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTransition {
    pub tenant_id: TenantId,
    pub job_id: JobId,
    pub transition_id: TransitionId,
    pub from_status: Option<JobStatus>,
    pub to_status: JobStatus,
    pub transitioned_at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl JobTransition {
    pub fn new(
        tenant_id: TenantId,
        job_id: JobId,
        from_status: Option<JobStatus>,
        to_status: JobStatus,
        reason: Option<String>,
    ) -> Self {
        Self {
            tenant_id,
            job_id,
            transition_id: TransitionId::new(),
            from_status,
            to_status,
            transitioned_at: Utc::now(),
            reason,
        }
    }
}
