//! # convoy-identity: Principal to Tenant Resolution
//!
//! Maps authenticated OAuth principals to stable internal tenant ids,
//! provisioning a tenant exactly once per `(provider, external_user_id)`
//! pair no matter how many requests race for the first contact, across any
//! number of processes sharing the same store. The in-memory cache is a pure
//! read-through/write-through performance layer; the store's uniqueness
//! constraint is the arbiter of identity.

pub mod resolver;

pub use resolver::IdentityResolver;
