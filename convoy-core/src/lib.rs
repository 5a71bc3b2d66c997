//! # convoy-core: Domain Types for the Convoy Platform
//!
//! Shared vocabulary for the Convoy multi-tenant job platform:
//!
//! - **Tenant identity**: [`TenantId`], [`Tenant`], and the external
//!   [`Principal`] claims presented per request.
//! - **Jobs**: [`JobId`], [`Job`], the [`JobStatus`] lifecycle enum, and the
//!   append-only [`JobTransition`] audit record.
//! - **Errors**: the [`ConvoyError`] taxonomy with its caller-visible
//!   [`Outcome`] classification.
//!
//! Everything here is plain data; the subsystems that act on it live in the
//! sibling crates (`convoy-ring`, `convoy-identity`, `convoy-jobs`,
//! `convoy-dispatch`).

pub mod error;
pub mod job;
pub mod principal;
pub mod tenant;

pub use error::{ConvoyError, ConvoyResult, Outcome};
pub use job::{Job, JobId, JobStatus, JobTransition, TransitionId};
pub use principal::Principal;
pub use tenant::{Tenant, TenantId};
