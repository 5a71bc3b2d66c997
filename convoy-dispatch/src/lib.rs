//! # convoy-dispatch: Gateway and Worker Coordinators
//!
//! The two process roles of the platform. The gateway coordinator resolves
//! caller identity from request metadata, routes the tenant to a worker over
//! the consistent-hash ring, and forwards the operation. The execution
//! coordinator runs on each worker and drives jobs through their lifecycle
//! against the shared store.
//!
//! Transport is abstracted behind [`WorkerClient`]; [`LocalWorkerClient`]
//! provides the in-process binding used by tests and single-node setups.

mod client;
mod gateway;
mod metadata;
mod worker;

pub use client::{LocalWorkerClient, SubmitJobRequest, SubmitJobResponse, WorkerClient};
pub use gateway::DispatchCoordinator;
pub use metadata::{
    principal_from_metadata, KEY_OAUTH_EMAIL, KEY_OAUTH_PROVIDER, KEY_OAUTH_USER_ID,
    KEY_TENANT_ID,
};
pub use worker::ExecutionCoordinator;
