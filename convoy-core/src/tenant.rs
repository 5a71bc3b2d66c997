use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// Generate a new unique tenant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The internal identity representing one authenticated organization/user.
///
/// Created exactly once on first successful resolution of a principal and
/// never mutated afterwards. The `(oauth_provider, oauth_user_id)` pair maps
/// to exactly one tenant for the lifetime of the record; the persistent
/// store's uniqueness constraint is the arbiter of that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: TenantId,
    pub user_email: String,
    pub oauth_provider: String,
    pub oauth_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a tenant record for a freshly generated id.
    pub fn new(
        tenant_id: TenantId,
        user_email: impl Into<String>,
        oauth_provider: impl Into<String>,
        oauth_user_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            user_email: user_email.into(),
            oauth_provider: oauth_provider.into(),
            oauth_user_id: oauth_user_id.into(),
            created_at: Utc::now(),
        }
    }
}
