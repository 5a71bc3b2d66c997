use serde::{Deserialize, Serialize};

use crate::error::{ConvoyError, ConvoyResult};

/// External identity claims presented with each request.
///
/// Claims are verified and supplied out-of-band by the transport layer;
/// Convoy only checks that the required fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// OAuth provider name (e.g. "google", "github")
    pub provider: String,

    /// Stable user identifier issued by the provider
    pub user_id: String,

    /// Email address asserted by the provider
    pub email: String,
}

impl Principal {
    pub fn new(
        provider: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            user_id: user_id.into(),
            email: email.into(),
        }
    }

    /// Reject principals with any empty required claim.
    pub fn validate(&self) -> ConvoyResult<()> {
        if self.provider.is_empty() || self.user_id.is_empty() || self.email.is_empty() {
            return Err(ConvoyError::Authentication(
                "missing required OAuth claims".to_string(),
            ));
        }
        Ok(())
    }
}
