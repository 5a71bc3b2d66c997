use std::collections::HashMap;

use async_trait::async_trait;

use convoy_core::{ConvoyResult, JobId};

/// Contract for the external system that actually runs a container image.
///
/// Submission is fire-and-forget: a successful call means the backend
/// accepted the job, not that it finished. Implementations wrap their own
/// failure detail into `ConvoyError::Backend`.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Start `image_uri` for `job_id`, returning the backend's opaque
    /// handle for the created job.
    async fn submit(
        &self,
        job_id: &JobId,
        image_uri: &str,
        env_vars: &HashMap<String, String>,
    ) -> ConvoyResult<String>;
}
