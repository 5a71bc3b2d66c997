use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use convoy_core::{ConvoyResult, Job, JobId, JobStatus, JobTransition, TenantId};

use crate::worker::ExecutionCoordinator;

/// A request to run one container job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub image_uri: String,
    pub commands: Vec<String>,
    pub env_vars: HashMap<String, String>,
}

impl SubmitJobRequest {
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            commands: Vec::new(),
            env_vars: HashMap::new(),
        }
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a submission, as reported back through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Worker the gateway routed the tenant to; absent when the response
    /// came straight from a worker.
    pub worker_assigned: Option<String>,
}

/// Transport seam between the gateway and one worker.
///
/// Implementations carry the call to wherever the worker's
/// [`ExecutionCoordinator`] lives; the gateway never assumes locality.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn submit_job(
        &self,
        tenant_id: &TenantId,
        request: &SubmitJobRequest,
    ) -> ConvoyResult<SubmitJobResponse>;

    async fn list_jobs(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>>;

    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job>;

    async fn cancel_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job>;

    async fn job_history(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>>;
}

/// In-process transport: the worker coordinator lives in the same process
/// as the gateway.
pub struct LocalWorkerClient {
    coordinator: Arc<ExecutionCoordinator>,
}

impl LocalWorkerClient {
    pub fn new(coordinator: Arc<ExecutionCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl WorkerClient for LocalWorkerClient {
    async fn submit_job(
        &self,
        tenant_id: &TenantId,
        request: &SubmitJobRequest,
    ) -> ConvoyResult<SubmitJobResponse> {
        self.coordinator.submit_job(tenant_id, request).await
    }

    async fn list_jobs(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>> {
        self.coordinator.list_jobs(tenant_id, status).await
    }

    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.coordinator.get_job(tenant_id, job_id).await
    }

    async fn cancel_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.coordinator.cancel_job(tenant_id, job_id).await
    }

    async fn job_history(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>> {
        self.coordinator.job_history(tenant_id, job_id).await
    }
}
