use super::ProviderAdapter;
use crate::error::GatewayError;
use dashmap::DashMap;
use std::sync::Arc;

/// Keyed by `(tenantId, providerId)` per spec.md §4.13, backed by
/// `dashmap` alongside the JWKS cache and rate limiter as the process's
/// shared concurrent maps (spec.md §5).
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: DashMap<(String, String), Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tenant_id: &str, adapter: Arc<dyn ProviderAdapter>) {
        let key = (tenant_id.to_string(), adapter.provider_id().to_string());
        self.adapters.insert(key, adapter);
    }

    pub fn get(&self, tenant_id: &str, provider_id: &str) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        self.adapters
            .get(&(tenant_id.to_string(), provider_id.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| {
                GatewayError::Provider(format!(
                    "no adapter registered for tenant '{tenant_id}' provider '{provider_id}'"
                ))
            })
    }
}
