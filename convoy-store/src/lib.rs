//! # convoy-store: Persistence Contract for the Convoy Platform
//!
//! The narrow CRUD contract ([`Store`]) that the identity resolver and job
//! lifecycle consume, plus the in-memory reference backend ([`MemoryStore`])
//! used for tests and development. Any durable, strongly-consistent store can
//! stand behind the trait; the contract's two load-bearing guarantees are the
//! tenant uniqueness constraint on `(oauth_provider, oauth_user_id)` and the
//! atomic, status-conditional job update paired with its audit record.

pub mod contract;
pub mod memory;

pub use contract::{JobUpdate, Store};
pub use memory::MemoryStore;
