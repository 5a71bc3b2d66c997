use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use convoy_core::{
    ConvoyError, ConvoyResult, Job, JobId, JobStatus, JobTransition, TenantId,
};
use convoy_store::{JobUpdate, Store};

/// Lifecycle tuning parameters.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Default `max_retries` stamped onto new jobs. The field is persisted
    /// for forward compatibility; nothing consumes it to retry implicitly.
    pub default_max_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
        }
    }
}

/// Drives a job from submission to a terminal outcome.
///
/// All state lives in the store; this type holds only the collaborators.
/// Transition legality is checked against the status edge table, and the
/// store's conditional update makes the check race-safe: a stale writer
/// observes `InvalidTransition` instead of clobbering a newer status.
pub struct JobLifecycle {
    store: Arc<dyn Store>,
    backend: Arc<dyn crate::ExecutionBackend>,
    config: LifecycleConfig,
}

impl JobLifecycle {
    pub fn new(store: Arc<dyn Store>, backend: Arc<dyn crate::ExecutionBackend>) -> Self {
        Self {
            store,
            backend,
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Insert a new PENDING job and its creation transition.
    #[instrument(skip(self, commands, env_vars), fields(tenant_id = %tenant_id))]
    pub async fn create(
        &self,
        tenant_id: &TenantId,
        image_uri: &str,
        commands: Vec<String>,
        env_vars: HashMap<String, String>,
    ) -> ConvoyResult<JobId> {
        if image_uri.is_empty() {
            return Err(ConvoyError::Validation("image_uri is required".to_string()));
        }

        let job = Job::new(
            tenant_id.clone(),
            JobId::new(),
            image_uri,
            commands,
            env_vars,
            self.config.default_max_retries,
        );
        let job_id = job.job_id.clone();

        let creation = JobTransition::new(
            tenant_id.clone(),
            job_id.clone(),
            None,
            JobStatus::Pending,
            None,
        );
        self.store.insert_job(job, creation).await?;

        info!(job_id = %job_id, "created job");
        Ok(job_id)
    }

    /// Admit a PENDING job for dispatch without submitting it yet.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn schedule(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        let job = self.load(tenant_id, job_id).await?;
        self.check_edge(&job, JobStatus::Scheduled)?;

        let now = Utc::now();
        let update = JobUpdate::new(tenant_id.clone(), job_id.clone(), JobStatus::Scheduled)
            .with_scheduled_at(now);
        let transition = JobTransition::new(
            tenant_id.clone(),
            job_id.clone(),
            Some(job.status),
            JobStatus::Scheduled,
            None,
        );
        self.store.update_job(update, transition).await
    }

    /// Hand the job to the execution backend.
    ///
    /// Backend acceptance moves the job to RUNNING with its handle stored;
    /// backend rejection moves it to FAILED with the error captured, and the
    /// wrapped backend error is returned. If the FAILED record itself cannot
    /// be written, the store error is returned instead: the caller never
    /// sees a failure the persisted state does not reflect.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn submit(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        let job = self.load(tenant_id, job_id).await?;
        self.check_edge(&job, JobStatus::Running)?;

        match self
            .backend
            .submit(job_id, &job.image_uri, &job.env_vars)
            .await
        {
            Ok(handle) => {
                let now = Utc::now();
                let update = JobUpdate::new(tenant_id.clone(), job_id.clone(), JobStatus::Running)
                    .with_started_at(now)
                    .with_backend_handle(handle);
                let transition = JobTransition::new(
                    tenant_id.clone(),
                    job_id.clone(),
                    Some(job.status),
                    JobStatus::Running,
                    None,
                );
                let written = self.store.update_job(update, transition).await?;
                info!(job_id = %job_id, "job accepted by execution backend");
                Ok(written)
            }
            Err(backend_err) => {
                let message = backend_err.to_string();
                error!(job_id = %job_id, error = %message, "execution backend rejected job");

                let now = Utc::now();
                let update = JobUpdate::new(tenant_id.clone(), job_id.clone(), JobStatus::Failed)
                    .with_completed_at(now)
                    .with_error_message(message.clone());
                let transition = JobTransition::new(
                    tenant_id.clone(),
                    job_id.clone(),
                    Some(job.status),
                    JobStatus::Failed,
                    Some(message),
                );
                match self.store.update_job(update, transition).await {
                    Ok(_) => Err(backend_err),
                    // A concurrent transition (e.g. cancellation) beat the
                    // failure mark; the backend error still wins as the
                    // caller-visible outcome.
                    Err(ConvoyError::InvalidTransition { .. }) => {
                        warn!(job_id = %job_id, "concurrent transition preempted the failure mark");
                        Err(backend_err)
                    }
                    // The FAILED record was not written; the job may still
                    // be PENDING, so the store error is what the caller
                    // must see.
                    Err(mark_err) => {
                        error!(job_id = %job_id, error = %mark_err, "failed to mark job FAILED");
                        Err(mark_err)
                    }
                }
            }
        }
    }

    /// Mark a RUNNING job successfully finished.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn complete(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.terminate(tenant_id, job_id, JobStatus::Completed, None)
            .await
    }

    /// Mark a job failed with an operator-supplied message.
    #[instrument(skip(self, message), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn fail(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
        message: &str,
    ) -> ConvoyResult<Job> {
        self.terminate(tenant_id, job_id, JobStatus::Failed, Some(message.to_string()))
            .await
    }

    /// Cancel a job before it reaches another terminal state.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, job_id = %job_id))]
    pub async fn cancel(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.terminate(tenant_id, job_id, JobStatus::Cancelled, None)
            .await
    }

    /// All jobs for a tenant, optionally filtered by status, newest first.
    pub async fn list(
        &self,
        tenant_id: &TenantId,
        status: Option<JobStatus>,
    ) -> ConvoyResult<Vec<Job>> {
        self.store.list_jobs(tenant_id, status).await
    }

    /// The audit trail for one job, newest first.
    pub async fn transitions(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> ConvoyResult<Vec<JobTransition>> {
        self.store.list_transitions(tenant_id, job_id).await
    }

    /// Fetch one job.
    pub async fn get(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.load(tenant_id, job_id).await
    }

    async fn load(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Job> {
        self.store
            .get_job(tenant_id, job_id)
            .await?
            .ok_or_else(|| ConvoyError::JobNotFound(job_id.to_string()))
    }

    fn check_edge(&self, job: &Job, to: JobStatus) -> ConvoyResult<()> {
        if !job.status.can_transition_to(to) {
            return Err(ConvoyError::InvalidTransition {
                from: job.status,
                to,
            });
        }
        Ok(())
    }

    async fn terminate(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
        to: JobStatus,
        message: Option<String>,
    ) -> ConvoyResult<Job> {
        let job = self.load(tenant_id, job_id).await?;
        self.check_edge(&job, to)?;

        let now = Utc::now();
        let mut update =
            JobUpdate::new(tenant_id.clone(), job_id.clone(), to).with_completed_at(now);
        if let Some(ref text) = message {
            update = update.with_error_message(text.clone());
        }
        let transition = JobTransition::new(
            tenant_id.clone(),
            job_id.clone(),
            Some(job.status),
            to,
            message,
        );
        let written = self.store.update_job(update, transition).await?;
        info!(job_id = %job_id, status = %to, "job reached terminal state");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convoy_store::MemoryStore;

    /// Backend double that accepts everything.
    struct AcceptingBackend;

    #[async_trait]
    impl crate::ExecutionBackend for AcceptingBackend {
        async fn submit(
            &self,
            job_id: &JobId,
            _image_uri: &str,
            _env_vars: &HashMap<String, String>,
        ) -> ConvoyResult<String> {
            Ok(format!("backend-{job_id}"))
        }
    }

    /// Backend double that rejects everything.
    struct RejectingBackend;

    #[async_trait]
    impl crate::ExecutionBackend for RejectingBackend {
        async fn submit(
            &self,
            _job_id: &JobId,
            _image_uri: &str,
            _env_vars: &HashMap<String, String>,
        ) -> ConvoyResult<String> {
            Err(ConvoyError::Backend("image pull denied".to_string()))
        }
    }

    /// Store double whose conditional update always fails with the rigged
    /// error while everything else delegates to a real in-memory store.
    struct RiggedUpdateStore {
        inner: MemoryStore,
        update_error: ConvoyError,
    }

    #[async_trait]
    impl Store for RiggedUpdateStore {
        async fn insert_tenant(&self, tenant: convoy_core::Tenant) -> ConvoyResult<()> {
            self.inner.insert_tenant(tenant).await
        }

        async fn get_tenant(
            &self,
            tenant_id: &TenantId,
        ) -> ConvoyResult<Option<convoy_core::Tenant>> {
            self.inner.get_tenant(tenant_id).await
        }

        async fn get_tenant_by_oauth(
            &self,
            provider: &str,
            oauth_user_id: &str,
        ) -> ConvoyResult<Option<convoy_core::Tenant>> {
            self.inner.get_tenant_by_oauth(provider, oauth_user_id).await
        }

        async fn delete_tenant(&self, tenant_id: &TenantId) -> ConvoyResult<()> {
            self.inner.delete_tenant(tenant_id).await
        }

        async fn insert_job(&self, job: Job, transition: JobTransition) -> ConvoyResult<()> {
            self.inner.insert_job(job, transition).await
        }

        async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<Option<Job>> {
            self.inner.get_job(tenant_id, job_id).await
        }

        async fn list_jobs(
            &self,
            tenant_id: &TenantId,
            status: Option<JobStatus>,
        ) -> ConvoyResult<Vec<Job>> {
            self.inner.list_jobs(tenant_id, status).await
        }

        async fn update_job(
            &self,
            _update: JobUpdate,
            _transition: JobTransition,
        ) -> ConvoyResult<Job> {
            Err(self.update_error.clone())
        }

        async fn list_transitions(
            &self,
            tenant_id: &TenantId,
            job_id: &JobId,
        ) -> ConvoyResult<Vec<JobTransition>> {
            self.inner.list_transitions(tenant_id, job_id).await
        }

        async fn delete_job(&self, tenant_id: &TenantId, job_id: &JobId) -> ConvoyResult<()> {
            self.inner.delete_job(tenant_id, job_id).await
        }
    }

    fn lifecycle_with(backend: Arc<dyn crate::ExecutionBackend>) -> (Arc<MemoryStore>, JobLifecycle) {
        let store = Arc::new(MemoryStore::new());
        let lifecycle = JobLifecycle::new(store.clone(), backend);
        (store, lifecycle)
    }

    fn tenant() -> TenantId {
        TenantId::from("tenant-under-test")
    }

    async fn create_job(lifecycle: &JobLifecycle) -> JobId {
        lifecycle
            .create(&tenant(), "gcr.io/acme/app:latest", vec![], HashMap::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_rejects_empty_image_uri() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let result = lifecycle.create(&tenant(), "", vec![], HashMap::new()).await;
        assert!(matches!(result, Err(ConvoyError::Validation(_))));
    }

    #[tokio::test]
    async fn successful_submit_runs_then_completes() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;

        let running = lifecycle.submit(&tenant(), &job_id).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.started_at.is_some());
        assert!(running.completed_at.is_none());
        assert_eq!(
            running.backend_handle,
            Some(format!("backend-{job_id}"))
        );

        let completed = lifecycle.complete(&tenant(), &job_id).await.unwrap();
        assert_eq!(completed.status, JobStatus::Completed);

        let completed_at = completed.completed_at.unwrap();
        let started_at = completed.started_at.unwrap();
        assert!(completed_at >= started_at);
        assert!(started_at >= completed.created_at);
    }

    #[tokio::test]
    async fn rejected_submit_leaves_a_durable_failed_job() {
        let (_, lifecycle) = lifecycle_with(Arc::new(RejectingBackend));
        let job_id = create_job(&lifecycle).await;

        let result = lifecycle.submit(&tenant(), &job_id).await;
        assert!(matches!(result, Err(ConvoyError::Backend(_))));

        let job = lifecycle.get(&tenant(), &job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.is_some());
        assert!(job.completed_at.is_some());

        // The audit trail never saw RUNNING.
        let trail = lifecycle.transitions(&tenant(), &job_id).await.unwrap();
        assert!(trail.iter().all(|t| t.to_status != JobStatus::Running));
        assert_eq!(trail[0].to_status, JobStatus::Failed);
        assert!(trail[0].reason.is_some());
    }

    #[tokio::test]
    async fn unwritable_failure_mark_surfaces_the_store_error() {
        let store = Arc::new(RiggedUpdateStore {
            inner: MemoryStore::new(),
            update_error: ConvoyError::Persistence("store unreachable".to_string()),
        });
        let lifecycle = JobLifecycle::new(store, Arc::new(RejectingBackend));
        let job_id = create_job(&lifecycle).await;

        // The backend rejected and the FAILED mark could not be written:
        // the caller must see the store error, not a backend error that
        // would imply a durable FAILED record.
        let result = lifecycle.submit(&tenant(), &job_id).await;
        assert!(matches!(result, Err(ConvoyError::Persistence(_))));

        let job = lifecycle.get(&tenant(), &job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn preempted_failure_mark_keeps_the_backend_error() {
        let store = Arc::new(RiggedUpdateStore {
            inner: MemoryStore::new(),
            update_error: ConvoyError::InvalidTransition {
                from: JobStatus::Cancelled,
                to: JobStatus::Failed,
            },
        });
        let lifecycle = JobLifecycle::new(store, Arc::new(RejectingBackend));
        let job_id = create_job(&lifecycle).await;

        // A concurrent transition won the conditional update; the backend
        // rejection is still the caller-visible outcome.
        let result = lifecycle.submit(&tenant(), &job_id).await;
        assert!(matches!(result, Err(ConvoyError::Backend(_))));
    }

    #[tokio::test]
    async fn terminal_jobs_reject_further_transitions() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;
        lifecycle.submit(&tenant(), &job_id).await.unwrap();
        lifecycle.complete(&tenant(), &job_id).await.unwrap();

        for attempt in [
            lifecycle.complete(&tenant(), &job_id).await,
            lifecycle.fail(&tenant(), &job_id, "too late").await,
            lifecycle.cancel(&tenant(), &job_id).await,
        ] {
            assert!(matches!(
                attempt,
                Err(ConvoyError::InvalidTransition { .. })
            ));
        }

        let job = lifecycle.get(&tenant(), &job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[tokio::test]
    async fn complete_requires_a_running_job() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;

        let result = lifecycle.complete(&tenant(), &job_id).await;
        assert!(matches!(
            result,
            Err(ConvoyError::InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Completed,
            })
        ));
    }

    #[tokio::test]
    async fn pending_job_can_be_cancelled() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;

        let cancelled = lifecycle.cancel(&tenant(), &job_id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        // Cancelled is terminal; submission is no longer possible.
        let result = lifecycle.submit(&tenant(), &job_id).await;
        assert!(matches!(
            result,
            Err(ConvoyError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn schedule_is_a_valid_admission_step() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;

        let scheduled = lifecycle.schedule(&tenant(), &job_id).await.unwrap();
        assert_eq!(scheduled.status, JobStatus::Scheduled);
        assert!(scheduled.scheduled_at.is_some());

        let running = lifecycle.submit(&tenant(), &job_id).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.scheduled_at.is_some());
        assert!(running.started_at.is_some());
    }

    #[tokio::test]
    async fn second_submit_observes_invalid_transition() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;

        lifecycle.submit(&tenant(), &job_id).await.unwrap();
        let second = lifecycle.submit(&tenant(), &job_id).await;
        assert!(matches!(
            second,
            Err(ConvoyError::InvalidTransition {
                from: JobStatus::Running,
                to: JobStatus::Running,
            })
        ));
    }

    #[tokio::test]
    async fn concurrent_submits_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let lifecycle = Arc::new(JobLifecycle::new(store, Arc::new(AcceptingBackend)));
        let job_id = create_job(&lifecycle).await;

        let a = {
            let lifecycle = lifecycle.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { lifecycle.submit(&tenant(), &job_id).await })
        };
        let b = {
            let lifecycle = lifecycle.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { lifecycle.submit(&tenant(), &job_id).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ConvoyError::InvalidTransition { .. }))));

        let job = lifecycle.get(&tenant(), &job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let first = create_job(&lifecycle).await;
        let second = create_job(&lifecycle).await;
        lifecycle.submit(&tenant(), &first).await.unwrap();

        let all = lifecycle.list(&tenant(), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let running = lifecycle
            .list(&tenant(), Some(JobStatus::Running))
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].job_id, first);

        let pending = lifecycle
            .list(&tenant(), Some(JobStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].job_id, second);
    }

    #[tokio::test]
    async fn audit_trail_orders_newest_first() {
        let (_, lifecycle) = lifecycle_with(Arc::new(AcceptingBackend));
        let job_id = create_job(&lifecycle).await;
        lifecycle.submit(&tenant(), &job_id).await.unwrap();
        lifecycle.complete(&tenant(), &job_id).await.unwrap();

        let trail = lifecycle.transitions(&tenant(), &job_id).await.unwrap();
        let statuses: Vec<JobStatus> = trail.iter().map(|t| t.to_status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Completed, JobStatus::Running, JobStatus::Pending]
        );
        assert_eq!(trail[2].from_status, None);
        assert_eq!(trail[1].from_status, Some(JobStatus::Pending));
        assert_eq!(trail[0].from_status, Some(JobStatus::Running));
    }
}
