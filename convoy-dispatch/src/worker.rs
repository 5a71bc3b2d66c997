use std::sync::Arc;

use tracing::instrument;

use convoy_core::{ConvoyError, ConvoyResult, Job, JobId, JobStatus, JobTransition, TenantId};
use convoy_jobs::{ExecutionBackend, JobLifecycle};
use convoy_store::Store;

use crate::client::{SubmitJobRequest, SubmitJobResponse};

/// Worker-side coordinator: executes job operations for the tenants routed
/// to this worker.
///
/// Holds no routing state of its own. Tenant scoping comes from the caller;
/// the gateway has already resolved and routed the tenant by the time a call
/// lands here.
pub struct ExecutionCoordinator {
    lifecycle: JobLifecycle,
}

impl ExecutionCoordinator {
    pub fn new(store: Arc<dyn Store>, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            lifecycle: JobLifecycle::new(store, backend),
        }
    }

    /// Persist a new job and hand it to the execution backend.
    ///
    /// On backend rejection the job is durably FAILED and the backend error
    /// is returned; the caller discovers the failed record through listing.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id))]
    pub async fn submit_job(
        &self,
        tenant_id: &TenantId,
        request: &SubmitJobRequest,
    ) -> ConvoyResult<SubmitJobResponse> {
        if tenant_id.as_str().is_empty() {
            return Err(ConvoyError::Validation("tenant_id is required".to_string()));
        }

        let job_id = self
            .lifecycle
            .create(
                tenant_id,
                &request.image_uri,
                request.commands.clone(),
                request.env_vars.clone(),
            )
            .await?;
        let job = self.lifecycle.submit(tenant_id, &job_id).await?;

        Ok(SubmitJobResponse {
            job_id,
            status: job.status,
            worker_assigned: None,
        })
    }

    pub async fn list_jobs(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>> {
        self.lifecycle.list(tenant_id, status).await
    }

    pub async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.lifecycle.get(tenant_id, job_id).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn cancel_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.lifecycle.cancel(tenant_id, job_id).await
    }

    /// The job's audit trail, newest first.
    pub async fn job_history(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>> {
        self.lifecycle.transitions(tenant_id, job_id).await
    }
}
