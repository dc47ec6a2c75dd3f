//! Provider adapter contract (C13): the capability every downstream SaaS
//! provider integration implements, plus a registry keyed by
//! `(tenantId, providerId)`. Grounded on the teacher's
//! `SingleTenantAdapter`/`ToSingleTenant` naming and wired with retry
//! (C15) the way `hadrian`'s provider layer wraps HTTP calls.

mod registry;

pub use registry::AdapterRegistry;

use crate::error::GatewayError;
use crate::model::{ScimGroup, ScimUser};
use async_trait::async_trait;

/// An opaque reference to a downstream credential. Resolving it to an
/// actual secret is the `SecretResolver`'s job (SPEC_FULL.md §9.6); the
/// gateway itself never stores or logs the resolved value.
#[derive(Debug, Clone)]
pub struct SecretRef(pub String);

#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, reference: &SecretRef) -> Result<String, GatewayError>;
}

/// One entitlement (group membership, role, license) as reported by a
/// downstream provider.
#[derive(Debug, Clone)]
pub struct Entitlement {
    pub provider_id: String,
    pub name: String,
}

/// The contract every provider adapter implements (spec.md §4.13).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn create_user(&self, user: &ScimUser) -> Result<String, GatewayError>;
    async fn get_user(&self, provider_user_id: &str) -> Result<ScimUser, GatewayError>;
    async fn update_user(&self, provider_user_id: &str, user: &ScimUser) -> Result<(), GatewayError>;
    async fn delete_user(&self, provider_user_id: &str) -> Result<(), GatewayError>;

    async fn create_group(&self, group: &ScimGroup) -> Result<String, GatewayError>;
    async fn add_user_to_group(&self, provider_group_id: &str, provider_user_id: &str) -> Result<(), GatewayError>;
    async fn remove_user_from_group(&self, provider_group_id: &str, provider_user_id: &str) -> Result<(), GatewayError>;

    async fn list_entitlements(&self, provider_user_id: &str) -> Result<Vec<Entitlement>, GatewayError>;
}
