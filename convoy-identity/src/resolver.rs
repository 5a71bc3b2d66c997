use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use convoy_core::{ConvoyError, ConvoyResult, Principal, Tenant, TenantId};
use convoy_store::Store;

type OAuthKey = (String, String);

/// Resolves an authenticated principal to its tenant id, creating the tenant
/// on first contact.
///
/// One resolver is constructed per process and passed to callers explicitly;
/// it owns its cache and lock. The exclusive section deliberately spans the
/// store insert: the insert's uniqueness constraint is the cross-process
/// serialization point, and the lock only keeps threads of this process from
/// issuing redundant inserts.
pub struct IdentityResolver {
    store: Arc<dyn Store>,
    /// (provider, external_user_id) -> tenant_id, write-through
    cache: RwLock<HashMap<OAuthKey, TenantId>>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `principal` to its stable tenant id.
    ///
    /// Fast path is a shared-lock cache hit. On miss the store is consulted;
    /// on first contact a tenant row is inserted, and a losing race against
    /// another process is recovered by adopting the id that won.
    #[instrument(skip(self), fields(provider = %principal.provider, email = %principal.email))]
    pub async fn resolve(&self, principal: &Principal) -> ConvoyResult<TenantId> {
        let key = (principal.provider.clone(), principal.user_id.clone());

        // Fast path: shared read lock.
        if let Some(tenant_id) = self.cache.read().await.get(&key) {
            debug!(tenant_id = %tenant_id, "resolved tenant from cache");
            return Ok(tenant_id.clone());
        }

        // Not cached; another process may have provisioned the tenant.
        if let Some(tenant) = self
            .store
            .get_tenant_by_oauth(&principal.provider, &principal.user_id)
            .await?
        {
            let tenant_id = tenant.tenant_id;
            self.cache.write().await.insert(key, tenant_id.clone());
            debug!(tenant_id = %tenant_id, "resolved tenant from store");
            return Ok(tenant_id);
        }

        // First contact. Take the exclusive lock and re-check: another task
        // in this process may have finished provisioning while we queried.
        let mut cache = self.cache.write().await;
        if let Some(tenant_id) = cache.get(&key) {
            debug!(tenant_id = %tenant_id, "tenant provisioned by concurrent request");
            return Ok(tenant_id.clone());
        }

        let tenant_id = TenantId::new();
        let tenant = Tenant::new(
            tenant_id.clone(),
            principal.email.clone(),
            principal.provider.clone(),
            principal.user_id.clone(),
        );

        match self.store.insert_tenant(tenant).await {
            Ok(()) => {
                cache.insert(key, tenant_id.clone());
                info!(tenant_id = %tenant_id, "provisioned new tenant");
                Ok(tenant_id)
            }
            Err(ConvoyError::Conflict(_)) => {
                // Another process won the insert race. Adopt the canonical
                // id rather than the one we generated.
                warn!("tenant insert raced with another process, adopting winner");
                let winner = self
                    .store
                    .get_tenant_by_oauth(&principal.provider, &principal.user_id)
                    .await?
                    .ok_or_else(|| {
                        ConvoyError::Conflict(
                            "tenant insert conflicted but no canonical row found".to_string(),
                        )
                    })?;
                cache.insert(key, winner.tenant_id.clone());
                Ok(winner.tenant_id)
            }
            Err(err) => Err(err),
        }
    }
}
