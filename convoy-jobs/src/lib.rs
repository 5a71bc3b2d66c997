//! # convoy-jobs: Job Lifecycle Management
//!
//! Owns the permitted state transitions of a [`Job`](convoy_core::Job) and
//! their append-only audit trail, and mediates submission to the external
//! execution backend. Every status change pairs the row update with its
//! transition record in one atomic store write, and the store's conditional
//! update serializes concurrent transitions per job.
//!
//! The backend is fire-and-forget: nothing here polls it for completion, so
//! a RUNNING job only moves on through an explicit `complete`, `fail`, or
//! `cancel`.

pub mod backend;
pub mod lifecycle;

pub use backend::ExecutionBackend;
pub use lifecycle::{JobLifecycle, LifecycleConfig};
