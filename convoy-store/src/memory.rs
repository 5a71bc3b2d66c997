use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use convoy_core::{
    ConvoyError, ConvoyResult, Job, JobId, JobStatus, JobTransition, Tenant, TenantId,
};

use crate::contract::{JobUpdate, Store};

type JobKey = (TenantId, JobId);

/// In-memory reference backend for testing and development.
///
/// Whole-map reader/writer locks stand in for row-level store atomicity:
/// every write path that touches a job and its audit trail holds both locks,
/// so readers never observe a job row without its matching transition.
/// Lock order is tenants, oauth index, jobs, transitions.
pub struct MemoryStore {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    /// Uniqueness index: (oauth_provider, oauth_user_id) -> tenant_id
    oauth_index: RwLock<HashMap<(String, String), TenantId>>,
    jobs: RwLock<HashMap<JobKey, Job>>,
    /// Audit trail per job, in append (chronological) order
    transitions: RwLock<HashMap<JobKey, Vec<JobTransition>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            oauth_index: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            transitions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of tenant rows currently stored.
    pub fn tenant_count(&self) -> usize {
        self.tenants.read().len()
    }

    /// Number of job rows currently stored, across all tenants.
    pub fn job_count(&self) -> usize {
        self.jobs.read().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_tenant(&self, tenant: Tenant) -> ConvoyResult<()> {
        let mut tenants = self.tenants.write();
        let mut index = self.oauth_index.write();

        let oauth_key = (tenant.oauth_provider.clone(), tenant.oauth_user_id.clone());
        if index.contains_key(&oauth_key) {
            return Err(ConvoyError::Conflict(format!(
                "tenant already exists for {}/{}",
                oauth_key.0, oauth_key.1
            )));
        }

        index.insert(oauth_key, tenant.tenant_id.clone());
        tenants.insert(tenant.tenant_id.clone(), tenant);
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: &TenantId) -> ConvoyResult<Option<Tenant>> {
        Ok(self.tenants.read().get(tenant_id).cloned())
    }

    async fn get_tenant_by_oauth(
        &self,
        provider: &str,
        oauth_user_id: &str,
    ) -> ConvoyResult<Option<Tenant>> {
        let tenants = self.tenants.read();
        let index = self.oauth_index.read();
        Ok(index
            .get(&(provider.to_string(), oauth_user_id.to_string()))
            .and_then(|id| tenants.get(id))
            .cloned())
    }

    async fn delete_tenant(&self, tenant_id: &TenantId) -> ConvoyResult<()> {
        let mut tenants = self.tenants.write();
        let mut index = self.oauth_index.write();
        let mut jobs = self.jobs.write();
        let mut transitions = self.transitions.write();

        if let Some(tenant) = tenants.remove(tenant_id) {
            index.remove(&(tenant.oauth_provider, tenant.oauth_user_id));
            jobs.retain(|(owner, _), _| owner != tenant_id);
            transitions.retain(|(owner, _), _| owner != tenant_id);
        }
        Ok(())
    }

    async fn insert_job(&self, job: Job, transition: JobTransition) -> ConvoyResult<()> {
        let mut jobs = self.jobs.write();
        let mut transitions = self.transitions.write();

        let key = (job.tenant_id.clone(), job.job_id.clone());
        if jobs.contains_key(&key) {
            return Err(ConvoyError::Conflict(format!(
                "job {} already exists",
                job.job_id
            )));
        }

        transitions.entry(key.clone()).or_default().push(transition);
        jobs.insert(key, job);
        Ok(())
    }

    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Option<Job>> {
        Ok(self
            .jobs
            .read()
            .get(&(tenant_id.clone(), job_id.clone()))
            .cloned())
    }

    async fn list_jobs(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>> {
        let jobs = self.jobs.read();
        let mut matched: Vec<Job> = jobs
            .values()
            .filter(|job| &job.tenant_id == tenant_id)
            .filter(|job| status.map_or(true, |s| job.status == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn update_job(&self, update: JobUpdate, transition: JobTransition) -> ConvoyResult<Job> {
        let mut jobs = self.jobs.write();
        let mut transitions = self.transitions.write();

        let key = (update.tenant_id.clone(), update.job_id.clone());
        let job = jobs
            .get_mut(&key)
            .ok_or_else(|| ConvoyError::JobNotFound(update.job_id.to_string()))?;

        // Conditional write: the row must still be in the state the caller
        // transitioned from, or a concurrent transition won the race.
        if transition.from_status != Some(job.status) {
            return Err(ConvoyError::InvalidTransition {
                from: job.status,
                to: update.status,
            });
        }

        job.status = update.status;
        job.updated_at = transition.transitioned_at;
        if let Some(at) = update.scheduled_at {
            job.scheduled_at = Some(at);
        }
        if let Some(at) = update.started_at {
            job.started_at = Some(at);
        }
        if let Some(at) = update.completed_at {
            job.completed_at = Some(at);
        }
        if let Some(message) = update.error_message {
            job.error_message = Some(message);
        }
        if let Some(handle) = update.backend_handle {
            job.backend_handle = Some(handle);
        }

        transitions.entry(key).or_default().push(transition);
        Ok(job.clone())
    }

    async fn list_transitions(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>> {
        let transitions = self.transitions.read();
        let mut trail = transitions
            .get(&(tenant_id.clone(), job_id.clone()))
            .cloned()
            .unwrap_or_default();
        trail.reverse();
        Ok(trail)
    }

    async fn delete_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<()> {
        let mut jobs = self.jobs.write();
        let mut transitions = self.transitions.write();

        let key = (tenant_id.clone(), job_id.clone());
        jobs.remove(&key);
        transitions.remove(&key);
        Ok(())
    }
}
