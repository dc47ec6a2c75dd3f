use super::{ListQuery, ListResult, ScimRepository};
use crate::concurrency::ResourceVersion;
use crate::error::GatewayError;
use crate::filter::{evaluate_filter, FilterParser};
use crate::model::{ScimGroup, ScimUser};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

/// An in-process, tenant-partitioned store backed by `dashmap`, matching
/// the concurrency model in spec.md §5 (shared resources behind a
/// concurrent map rather than a single global lock).
#[derive(Default)]
pub struct InMemoryRepository {
    users: DashMap<(String, String), ScimUser>,
    groups: DashMap<(String, String), ScimGroup>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn stamp_version(meta: &mut crate::model::ResourceMeta, bytes: &[u8]) {
        meta.version = ResourceVersion::from_content(bytes).to_http_header();
        meta.last_modified = Utc::now();
    }
}

#[async_trait]
impl ScimRepository for InMemoryRepository {
    async fn create_user(&self, tenant_id: &str, mut user: ScimUser) -> Result<ScimUser, GatewayError> {
        if self.user_name_taken(tenant_id, &user.user_name, None).await? {
            return Err(GatewayError::Conflict(format!(
                "userName '{}' already exists",
                user.user_name
            )));
        }
        user.id = self.next_id();
        user.meta.created = Utc::now();
        let bytes = serde_json::to_vec(&user).unwrap_or_default();
        Self::stamp_version(&mut user.meta, &bytes);
        self.users
            .insert((tenant_id.to_string(), user.id.clone()), user.clone());
        Ok(user)
    }

    async fn get_user(&self, tenant_id: &str, id: &str) -> Result<ScimUser, GatewayError> {
        self.users
            .get(&(tenant_id.to_string(), id.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| GatewayError::not_found("User", id))
    }

    async fn list_users(&self, tenant_id: &str, query: &ListQuery) -> Result<ListResult<ScimUser>, GatewayError> {
        let parsed_filter = query
            .filter
            .as_deref()
            .map(FilterParser::parse)
            .transpose()?;
        let mut matched: Vec<ScimUser> = self
            .users
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.value().clone())
            .filter(|u| {
                parsed_filter
                    .as_ref()
                    .map(|f| {
                        let value = serde_json::to_value(u).unwrap_or_default();
                        evaluate_filter(f, &value)
                    })
                    .unwrap_or(true)
            })
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let total = matched.len();
        let start = query.start_index.saturating_sub(1);
        let page = matched.into_iter().skip(start).take(query.count).collect();
        Ok(ListResult { items: page, total })
    }

    async fn replace_user(&self, tenant_id: &str, id: &str, mut user: ScimUser) -> Result<ScimUser, GatewayError> {
        if self.user_name_taken(tenant_id, &user.user_name, Some(id)).await? {
            return Err(GatewayError::Conflict(format!(
                "userName '{}' already exists",
                user.user_name
            )));
        }
        let key = (tenant_id.to_string(), id.to_string());
        let existing = self
            .users
            .get(&key)
            .ok_or_else(|| GatewayError::not_found("User", id))?;
        user.id = id.to_string();
        user.meta.created = existing.meta.created;
        drop(existing);
        let bytes = serde_json::to_vec(&user).unwrap_or_default();
        Self::stamp_version(&mut user.meta, &bytes);
        self.users.insert(key, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, tenant_id: &str, id: &str) -> Result<(), GatewayError> {
        self.users
            .remove(&(tenant_id.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found("User", id))
    }

    async fn create_group(&self, tenant_id: &str, mut group: ScimGroup) -> Result<ScimGroup, GatewayError> {
        if self
            .group_display_name_taken(tenant_id, &group.display_name, None)
            .await?
        {
            return Err(GatewayError::Conflict(format!(
                "group displayName '{}' already exists",
                group.display_name
            )));
        }
        group.id = self.next_id();
        group.meta.created = Utc::now();
        let bytes = serde_json::to_vec(&group).unwrap_or_default();
        Self::stamp_version(&mut group.meta, &bytes);
        self.groups
            .insert((tenant_id.to_string(), group.id.clone()), group.clone());
        Ok(group)
    }

    async fn get_group(&self, tenant_id: &str, id: &str) -> Result<ScimGroup, GatewayError> {
        self.groups
            .get(&(tenant_id.to_string(), id.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| GatewayError::not_found("Group", id))
    }

    async fn list_groups(&self, tenant_id: &str, query: &ListQuery) -> Result<ListResult<ScimGroup>, GatewayError> {
        let mut matched: Vec<ScimGroup> = self
            .groups
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.value().clone())
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let total = matched.len();
        let start = query.start_index.saturating_sub(1);
        let page = matched.into_iter().skip(start).take(query.count).collect();
        Ok(ListResult { items: page, total })
    }

    async fn replace_group(&self, tenant_id: &str, id: &str, mut group: ScimGroup) -> Result<ScimGroup, GatewayError> {
        if self
            .group_display_name_taken(tenant_id, &group.display_name, Some(id))
            .await?
        {
            return Err(GatewayError::Conflict(format!(
                "group displayName '{}' already exists",
                group.display_name
            )));
        }
        let key = (tenant_id.to_string(), id.to_string());
        let existing = self
            .groups
            .get(&key)
            .ok_or_else(|| GatewayError::not_found("Group", id))?;
        group.id = id.to_string();
        group.meta.created = existing.meta.created;
        drop(existing);
        let bytes = serde_json::to_vec(&group).unwrap_or_default();
        Self::stamp_version(&mut group.meta, &bytes);
        self.groups.insert(key, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, tenant_id: &str, id: &str) -> Result<(), GatewayError> {
        self.groups
            .remove(&(tenant_id.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found("Group", id))
    }

    async fn group_display_name_taken(
        &self,
        tenant_id: &str,
        display_name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let lower = display_name.to_ascii_lowercase();
        Ok(self.groups.iter().any(|e| {
            e.key().0 == tenant_id
                && e.value().display_name.to_ascii_lowercase() == lower
                && exclude_id.map(|x| x != e.key().1).unwrap_or(true)
        }))
    }

    async fn user_name_taken(
        &self,
        tenant_id: &str,
        user_name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let lower = user_name.to_ascii_lowercase();
        Ok(self.users.iter().any(|e| {
            e.key().0 == tenant_id
                && e.value().user_name.to_ascii_lowercase() == lower
                && exclude_id.map(|x| x != e.key().1).unwrap_or(true)
        }))
    }
}
