use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use convoy_core::{ConvoyError, ConvoyResult, Job, JobId, JobStatus, JobTransition, Tenant, TenantId};
use convoy_identity::IdentityResolver;
use convoy_ring::{HashRing, RingConfig, RingMember};
use convoy_store::Store;

use crate::client::{SubmitJobRequest, SubmitJobResponse, WorkerClient};
use crate::metadata::principal_from_metadata;

/// Gateway-side coordinator: authenticates callers, resolves their tenant,
/// and forwards job operations to the worker the ring assigns that tenant.
///
/// The ring and the worker registry mutate together under their own locks;
/// guards are dropped before any forwarded call awaits.
pub struct DispatchCoordinator {
    resolver: Arc<IdentityResolver>,
    store: Arc<dyn Store>,
    ring: RwLock<HashRing>,
    workers: RwLock<HashMap<String, Arc<dyn WorkerClient>>>,
}

impl DispatchCoordinator {
    pub fn new(resolver: Arc<IdentityResolver>, store: Arc<dyn Store>) -> Self {
        Self {
            resolver,
            store,
            ring: RwLock::new(HashRing::new(RingConfig::default())),
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a worker under `name` and place it on the ring.
    ///
    /// Re-registering an existing name replaces its client without moving
    /// any partitions.
    pub fn add_worker(&self, name: impl Into<String>, client: Arc<dyn WorkerClient>) {
        let name = name.into();
        self.workers.write().insert(name.clone(), client);
        if self.ring.write().add(RingMember::from(name.clone())) {
            info!(worker = %name, "registered worker");
        } else {
            debug!(worker = %name, "replaced client for existing worker");
        }
    }

    /// Drop a worker from the ring and the registry. Its tenants re-route to
    /// the survivors on the next call.
    pub fn remove_worker(&self, name: &str) {
        self.ring.write().remove(name);
        if self.workers.write().remove(name).is_some() {
            info!(worker = name, "deregistered worker");
        }
    }

    /// Resolve the caller's tenant record, provisioning it on first contact.
    #[instrument(skip(self, metadata))]
    pub async fn get_current_tenant(
        &self,
        metadata: &HashMap<String, String>,
    ) -> ConvoyResult<Tenant> {
        let principal = principal_from_metadata(metadata)?;
        let tenant_id = self.resolver.resolve(&principal).await?;
        self.store
            .get_tenant(&tenant_id)
            .await?
            .ok_or_else(|| ConvoyError::TenantNotFound(tenant_id.to_string()))
    }

    /// Submit a job on behalf of the authenticated caller.
    ///
    /// Requests that cannot possibly run are rejected before routing; a
    /// tenant with no reachable worker is a routing failure, not a job
    /// failure.
    #[instrument(skip(self, metadata, request))]
    pub async fn submit_job(
        &self,
        metadata: &HashMap<String, String>,
        request: &SubmitJobRequest,
    ) -> ConvoyResult<SubmitJobResponse> {
        if request.image_uri.is_empty() {
            return Err(ConvoyError::Validation("image_uri is required".to_string()));
        }

        let tenant_id = self.resolve(metadata).await?;
        let (worker, client) = self.route(&tenant_id)?;

        debug!(tenant_id = %tenant_id, worker = %worker, "routing job submission");
        let mut response = client.submit_job(&tenant_id, request).await?;
        response.worker_assigned = Some(worker);
        Ok(response)
    }

    /// List the caller's jobs, optionally filtered by status.
    #[instrument(skip(self, metadata))]
    pub async fn list_jobs(
        &self,
        metadata: &HashMap<String, String>,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>> {
        let tenant_id = self.resolve(metadata).await?;
        let (_, client) = self.route(&tenant_id)?;
        client.list_jobs(&tenant_id, status).await
    }

    /// Fetch one of the caller's jobs.
    #[instrument(skip(self, metadata), fields(job_id = %job_id))]
    pub async fn get_job(
        &self,
        metadata: &HashMap<String, String>,
        job_id: &JobId,
    ) -> ConvoyResult<Job> {
        let tenant_id = self.resolve(metadata).await?;
        let (_, client) = self.route(&tenant_id)?;
        client.get_job(&tenant_id, job_id).await
    }

    /// Cancel one of the caller's jobs.
    #[instrument(skip(self, metadata), fields(job_id = %job_id))]
    pub async fn cancel_job(
        &self,
        metadata: &HashMap<String, String>,
        job_id: &JobId,
    ) -> ConvoyResult<Job> {
        let tenant_id = self.resolve(metadata).await?;
        let (_, client) = self.route(&tenant_id)?;
        client.cancel_job(&tenant_id, job_id).await
    }

    /// The audit trail of one of the caller's jobs, newest first.
    #[instrument(skip(self, metadata), fields(job_id = %job_id))]
    pub async fn job_history(
        &self,
        metadata: &HashMap<String, String>,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>> {
        let tenant_id = self.resolve(metadata).await?;
        let (_, client) = self.route(&tenant_id)?;
        client.job_history(&tenant_id, job_id).await
    }

    /// Which worker the ring currently assigns `tenant_id`.
    pub fn worker_for(&self, tenant_id: &TenantId) -> Option<String> {
        self.ring
            .read()
            .locate(tenant_id.as_str().as_bytes())
            .map(|member| member.as_str().to_string())
    }

    async fn resolve(&self, metadata: &HashMap<String, String>) -> ConvoyResult<TenantId> {
        let principal = principal_from_metadata(metadata)?;
        self.resolver.resolve(&principal).await
    }

    fn route(&self, tenant_id: &TenantId) -> ConvoyResult<(String, Arc<dyn WorkerClient>)> {
        let worker = {
            let ring = self.ring.read();
            ring.locate(tenant_id.as_str().as_bytes())
                .map(|member| member.as_str().to_string())
        }
        .ok_or_else(|| ConvoyError::Routing("no workers registered".to_string()))?;

        let client = self
            .workers
            .read()
            .get(&worker)
            .cloned()
            .ok_or_else(|| ConvoyError::Routing(format!("worker {worker} is not registered")))?;
        Ok((worker, client))
    }
}
