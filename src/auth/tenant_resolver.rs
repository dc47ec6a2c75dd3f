use crate::error::GatewayError;
use crate::model::Tenant;
use async_trait::async_trait;
use dashmap::DashMap;

/// Resolves a tenant id claim to its onboarded [`Tenant`] record.
/// Grounded on the teacher's `TenantResolver` trait in `multi_tenant::resolver`.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(&self, tenant_id: &str) -> Result<Tenant, GatewayError>;
}

/// A resolver backed by a fixed, admin-configured tenant table — the
/// gateway doesn't discover tenants dynamically (spec.md §1 Non-goals
/// excludes self-service tenant onboarding).
pub struct StaticTenantResolver {
    tenants: DashMap<String, Tenant>,
}

impl StaticTenantResolver {
    pub fn new(tenants: Vec<Tenant>) -> Self {
        let map = DashMap::new();
        for t in tenants {
            map.insert(t.tenant_id.clone(), t);
        }
        StaticTenantResolver { tenants: map }
    }
}

#[async_trait]
impl TenantResolver for StaticTenantResolver {
    async fn resolve(&self, tenant_id: &str) -> Result<Tenant, GatewayError> {
        self.tenants
            .get(tenant_id)
            .map(|t| t.clone())
            .ok_or_else(|| GatewayError::Tenant(format!("unknown tenant '{tenant_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_tenant() {
        let resolver = StaticTenantResolver::new(vec![Tenant {
            tenant_id: "t1".into(),
            display_name: "Contoso".into(),
            allowed_audiences: vec!["api://gateway".into()],
            provider_ids: vec![],
        }]);
        let tenant = resolver.resolve("t1").await.unwrap();
        assert_eq!(tenant.display_name, "Contoso");
    }

    #[tokio::test]
    async fn unknown_tenant_is_tenant_error() {
        let resolver = StaticTenantResolver::new(vec![]);
        let result = resolver.resolve("ghost").await;
        assert!(matches!(result, Err(GatewayError::Tenant(_))));
    }
}
