use async_trait::async_trait;
use chrono::{DateTime, Utc};

use convoy_core::{ConvoyResult, Job, JobId, JobStatus, JobTransition, Tenant, TenantId};

/// Field changes applied with one job status update.
///
/// `None` fields are left untouched; timestamps for a given transition are
/// set exactly once and never cleared.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub tenant_id: TenantId,
    pub job_id: JobId,
    pub status: JobStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub backend_handle: Option<String>,
}

impl JobUpdate {
    pub fn new(tenant_id: TenantId, job_id: JobId, status: JobStatus) -> Self {
        Self {
            tenant_id,
            job_id,
            status,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            error_message: None,
            backend_handle: None,
        }
    }

    pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_backend_handle(mut self, handle: impl Into<String>) -> Self {
        self.backend_handle = Some(handle.into());
        self
    }
}

/// Contract consumed by the identity resolver and job lifecycle.
///
/// Implementations must be safe for unlimited concurrent callers and honor
/// caller cancellation promptly; Convoy holds no locks of its own across
/// these calls except where a call's atomicity is the correctness mechanism.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a tenant row.
    ///
    /// Fails with `ConvoyError::Conflict` when a tenant already exists for
    /// the same `(oauth_provider, oauth_user_id)` pair. That constraint is
    /// the arbiter of tenant uniqueness across processes.
    async fn insert_tenant(&self, tenant: Tenant) -> ConvoyResult<()>;

    /// Fetch a tenant by internal id.
    async fn get_tenant(&self, tenant_id: &TenantId) -> ConvoyResult<Option<Tenant>>;

    /// Fetch a tenant by its external OAuth identity.
    async fn get_tenant_by_oauth(
        &self,
        provider: &str,
        oauth_user_id: &str,
    ) -> ConvoyResult<Option<Tenant>>;

    /// Remove a tenant and cascade to its jobs and transition records.
    /// Administrative operation.
    async fn delete_tenant(&self, tenant_id: &TenantId) -> ConvoyResult<()>;

    /// Insert a job row together with its creation transition, atomically.
    async fn insert_job(&self, job: Job, transition: JobTransition) -> ConvoyResult<()>;

    /// Fetch one job by composite key.
    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Option<Job>>;

    /// All jobs for a tenant, optionally filtered by status, newest first.
    async fn list_jobs(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>>;

    /// Apply a status update and append its audit record in one atomic write.
    ///
    /// The update is conditional: it fails with
    /// `ConvoyError::InvalidTransition` when the job's current status no
    /// longer matches `transition.from_status`. That per-row check is the
    /// serialization point for concurrent transitions on the same job.
    /// Returns the job as written.
    async fn update_job(&self, update: JobUpdate, transition: JobTransition) -> ConvoyResult<Job>;

    /// The append-only audit trail for one job, newest first.
    async fn list_transitions(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>>;

    /// Remove a job row and its transitions. Administrative operation.
    async fn delete_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<()>;
}
