use crate::adapters::ProviderAdapter;
use crate::error::GatewayError;
use crate::repository::{ListQuery, ScimRepository};
use crate::retry::{with_retry, RetryConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A canonical user whose state disagrees with what a provider reports
/// (spec.md §4.14). `field` names the attribute that diverged.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEntry {
    pub user_id: String,
    pub field: String,
    pub canonical_value: String,
    pub provider_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub tenant_id: String,
    pub provider_id: String,
    pub entries: Vec<DriftEntry>,
    pub detected_at: DateTime<Utc>,
}

/// Compares every canonical user against the provider's reported state,
/// surfacing field-level divergence. This crate's adapter contract
/// exposes entitlements rather than full user snapshots, so drift
/// detection here is scoped to active/inactive state, which every
/// provider surfaces via its entitlement listing being empty or not.
pub async fn detect_drift(
    tenant_id: &str,
    repository: &dyn ScimRepository,
    adapter: &dyn ProviderAdapter,
    retry_config: &RetryConfig,
) -> Result<DriftReport, GatewayError> {
    let users = repository
        .list_users(tenant_id, &ListQuery::normalized(1, 1000)?)
        .await?;

    let mut entries = Vec::new();
    for user in users.items {
        let entitlements = with_retry(
            retry_config,
            "list_entitlements",
            || adapter.list_entitlements(&user.id),
            |err| matches!(err, GatewayError::Provider(_)).then_some(None),
        )
        .await
        .unwrap_or_default();
        let provider_active = !entitlements.is_empty();
        if provider_active != user.active {
            entries.push(DriftEntry {
                user_id: user.id.clone(),
                field: "active".into(),
                canonical_value: user.active.to_string(),
                provider_value: provider_active.to_string(),
            });
        }
    }

    Ok(DriftReport {
        tenant_id: tenant_id.to_string(),
        provider_id: adapter.provider_id().to_string(),
        entries,
        detected_at: Utc::now(),
    })
}
