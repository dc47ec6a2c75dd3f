//! Repository contract (C7): the tenant-scoped async trait every SCIM
//! handler operates through, plus an in-memory implementation used by
//! tests and local development. Grounded on the teacher's
//! `DatabaseResourceProvider`/`InMemoryDatabase` pairing, generalized to
//! this crate's concrete `ScimUser`/`ScimGroup` types instead of a
//! generic `Value`-backed resource.

mod in_memory;

pub use in_memory::InMemoryRepository;

use crate::error::{GatewayError, ValidationError};
use crate::model::{ScimGroup, ScimUser};
use async_trait::async_trait;

/// Pagination/filter parameters shared by both resource List operations.
pub struct ListQuery {
    pub start_index: usize,
    pub count: usize,
    pub filter: Option<String>,
}

impl ListQuery {
    /// `count` is clamped to 1000 on the high end (spec.md §4.7); a
    /// `startIndex` below 1 or a negative `count` is rejected outright with
    /// 400 `invalidValue` rather than silently normalized (spec.md §8
    /// boundary behavior).
    pub fn normalized(start_index: i64, count: i64) -> Result<Self, GatewayError> {
        if start_index < 1 {
            return Err(GatewayError::Validation(ValidationError::Custom(format!(
                "startIndex must be >= 1, got {start_index}"
            ))));
        }
        if count < 0 {
            return Err(GatewayError::Validation(ValidationError::Custom(format!(
                "count must be >= 0, got {count}"
            ))));
        }
        Ok(ListQuery {
            start_index: start_index as usize,
            count: count.min(1000) as usize,
            filter: None,
        })
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }
}

pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// A tenant-scoped repository for SCIM Users and Groups. Every method
/// takes `tenant_id` explicitly rather than relying on implicit state, so
/// cross-tenant leakage is a type-level impossibility to forget, not just
/// a runtime check.
#[async_trait]
pub trait ScimRepository: Send + Sync {
    async fn create_user(&self, tenant_id: &str, user: ScimUser) -> Result<ScimUser, GatewayError>;
    async fn get_user(&self, tenant_id: &str, id: &str) -> Result<ScimUser, GatewayError>;
    async fn list_users(&self, tenant_id: &str, query: &ListQuery) -> Result<ListResult<ScimUser>, GatewayError>;
    async fn replace_user(&self, tenant_id: &str, id: &str, user: ScimUser) -> Result<ScimUser, GatewayError>;
    async fn delete_user(&self, tenant_id: &str, id: &str) -> Result<(), GatewayError>;

    async fn create_group(&self, tenant_id: &str, group: ScimGroup) -> Result<ScimGroup, GatewayError>;
    async fn get_group(&self, tenant_id: &str, id: &str) -> Result<ScimGroup, GatewayError>;
    async fn list_groups(&self, tenant_id: &str, query: &ListQuery) -> Result<ListResult<ScimGroup>, GatewayError>;
    async fn replace_group(&self, tenant_id: &str, id: &str, group: ScimGroup) -> Result<ScimGroup, GatewayError>;
    async fn delete_group(&self, tenant_id: &str, id: &str) -> Result<(), GatewayError>;

    /// Case-insensitive uniqueness check for `displayName` within a tenant
    /// (spec.md §3), excluding `exclude_id` so a group can keep its own
    /// name on update.
    async fn group_display_name_taken(
        &self,
        tenant_id: &str,
        display_name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, GatewayError>;

    /// Case-insensitive uniqueness check for `userName` within a tenant
    /// (spec.md §3/§4.7/§8), excluding `exclude_id` so a user can keep its
    /// own name on update.
    async fn user_name_taken(
        &self,
        tenant_id: &str,
        user_name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, GatewayError>;
}
