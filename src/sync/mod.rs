//! Sync engine & reconciler (C14): periodically compares canonical state
//! against each configured provider, records drift/conflicts, and can
//! reconcile them per the tenant's configured sync direction. No direct
//! teacher/example grounding exists for this component; it follows this
//! crate's own concurrency model (spec.md §5: per-(tenantId,providerId)
//! mutex-guarded tasks).

mod drift;
mod reconcile;

pub use drift::{detect_drift, DriftReport};
pub use reconcile::{reconcile, ConflictReport, ReconcileOutcome};

use crate::adapters::AdapterRegistry;
use crate::config::SyncDirection;
use crate::repository::ScimRepository;
use crate::retry::RetryConfig;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One lock per (tenantId, providerId) pair, created lazily, so
/// concurrent sync cycles for different providers never block each other
/// while each provider's own cycle runs serially (spec.md §5).
pub struct SyncCoordinator {
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
    retry: RetryConfig,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a coordinator whose adapter calls retry per `retry_config`
    /// instead of the default policy, for deployments that tune backoff
    /// per downstream provider's rate limits.
    pub fn with_retry_config(retry_config: RetryConfig) -> Self {
        Self {
            locks: DashMap::new(),
            retry: retry_config,
        }
    }

    fn lock_for(&self, tenant_id: &str, provider_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((tenant_id.to_string(), provider_id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs one sync cycle for a tenant/provider pair, holding that pair's
    /// lock for the duration so a slow cycle can't overlap with the next
    /// scheduled one.
    pub async fn run_cycle(
        &self,
        tenant_id: &str,
        provider_id: &str,
        direction: SyncDirection,
        repository: &dyn ScimRepository,
        adapters: &AdapterRegistry,
    ) -> Result<(DriftReport, ReconcileOutcome), crate::error::GatewayError> {
        let lock = self.lock_for(tenant_id, provider_id);
        let _guard = lock.lock().await;
        let adapter = adapters.get(tenant_id, provider_id)?;
        let report = detect_drift(tenant_id, repository, adapter.as_ref(), &self.retry).await?;
        let outcome = reconcile(tenant_id, direction, &report, repository, adapter.as_ref(), &self.retry).await?;
        Ok((report, outcome))
    }
}
