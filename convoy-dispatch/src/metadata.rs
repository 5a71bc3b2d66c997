use std::collections::HashMap;

use convoy_core::{ConvoyError, ConvoyResult, Principal};

/// Metadata key carrying the email asserted by the OAuth proxy.
pub const KEY_OAUTH_EMAIL: &str = "x-oauth-email";

/// Metadata key carrying the provider-issued stable user id.
pub const KEY_OAUTH_USER_ID: &str = "x-oauth-userid";

/// Metadata key carrying the OAuth provider name.
pub const KEY_OAUTH_PROVIDER: &str = "x-oauth-provider";

/// Metadata key remote transports use to carry the resolved tenant id from
/// the gateway to a worker. The in-process client passes the id directly.
pub const KEY_TENANT_ID: &str = "x-tenant-id";

/// Extract the authenticated principal from request metadata.
///
/// The transport in front of the gateway verifies the OAuth session and
/// injects these keys; here they are only checked for presence. Missing or
/// empty claims surface as an authentication error.
pub fn principal_from_metadata(metadata: &HashMap<String, String>) -> ConvoyResult<Principal> {
    let claim = |key: &str| {
        metadata
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| ConvoyError::Authentication(format!("missing metadata key {key}")))
    };

    let principal = Principal::new(
        claim(KEY_OAUTH_PROVIDER)?,
        claim(KEY_OAUTH_USER_ID)?,
        claim(KEY_OAUTH_EMAIL)?,
    );
    principal.validate()?;
    Ok(principal)
}
