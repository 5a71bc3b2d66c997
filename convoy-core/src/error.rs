use thiserror::Error;

use crate::job::JobStatus;

/// Result type for Convoy operations
pub type ConvoyResult<T> = Result<T, ConvoyError>;

/// Error taxonomy shared by every Convoy subsystem.
///
/// Store and backend error text is wrapped into `Persistence`/`Backend`
/// variants at the boundary; raw infrastructure messages are never surfaced
/// verbatim to callers.
#[derive(Error, Debug, Clone)]
pub enum ConvoyError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No worker available: {0}")]
    Routing(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Execution backend rejected job: {0}")]
    Backend(String),

    #[error("Persistent store failure: {0}")]
    Persistence(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),
}

impl ConvoyError {
    /// Classify this error for the caller-facing surface.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Authentication(_) => Outcome::Unauthenticated,
            Self::Validation(_) | Self::InvalidTransition { .. } => Outcome::InvalidArgument,
            Self::JobNotFound(_) | Self::TenantNotFound(_) => Outcome::NotFound,
            Self::Routing(_) | Self::Persistence(_) => Outcome::Unavailable,
            Self::Conflict(_) | Self::Backend(_) => Outcome::Internal,
        }
    }

    /// True for errors the caller can fix by changing the request.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self.outcome(),
            Outcome::Unauthenticated | Outcome::InvalidArgument | Outcome::NotFound
        )
    }
}

/// Stable outcome category exposed on the caller-facing surface.
///
/// Transports map these onto their own status vocabulary (gRPC codes, HTTP
/// statuses); the taxonomy stays transport-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    Internal,
    Unavailable,
}

impl Outcome {
    /// Kebab-cased wire name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Unauthenticated => "unauthenticated",
            Outcome::InvalidArgument => "invalid-argument",
            Outcome::NotFound => "not-found",
            Outcome::Internal => "internal",
            Outcome::Unavailable => "unavailable",
        }
    }
}
