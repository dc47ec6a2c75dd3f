use super::{record_audit, ScimState};
use crate::audit::AuditEventType;
use crate::concurrency::{validate_if_match, ResourceVersion};
use crate::error::{GatewayError, MappedError};
use crate::model::{PatchOpKind, ResourceMeta, ScimGroup, ScimGroupMember, ScimListResponse};
use crate::pipeline::RequestContext;
use crate::repository::ListQuery;
use crate::schema::validate_group;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsQuery {
    #[serde(default = "default_start_index")]
    pub start_index: i64,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_start_index() -> i64 {
    1
}

fn default_count() -> i64 {
    100
}

fn mapped(ctx: &RequestContext, err: GatewayError) -> MappedError {
    MappedError::new(err, Some(ctx.correlation_id.clone()))
}

pub async fn create_group(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(mut group): Json<ScimGroup>,
) -> Result<impl IntoResponse, MappedError> {
    validate_group(&group).map_err(|e| mapped(&ctx, e.into()))?;
    group.meta = ResourceMeta {
        resource_type: "Group".into(),
        created: Utc::now(),
        last_modified: Utc::now(),
        version: String::new(),
    };
    let created = state
        .repository
        .create_group(&ctx.tenant.tenant_id, group)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimGroupCreated,
        "Group",
        &created.id,
        "create",
        None,
        serde_json::to_value(&created).ok(),
    );

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_group(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MappedError> {
    let group = state
        .repository
        .get_group(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    Ok(Json(group))
}

pub async fn list_groups(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListGroupsQuery>,
) -> Result<impl IntoResponse, MappedError> {
    let list_query = ListQuery::normalized(query.start_index, query.count).map_err(|e| mapped(&ctx, e))?;
    let result = state
        .repository
        .list_groups(&ctx.tenant.tenant_id, &list_query)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    Ok(Json(ScimListResponse::new(
        result.items,
        result.total,
        list_query.start_index,
    )))
}

pub async fn replace_group(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(group): Json<ScimGroup>,
) -> Result<impl IntoResponse, MappedError> {
    validate_group(&group).map_err(|e| mapped(&ctx, e.into()))?;
    let current = state
        .repository
        .get_group(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    check_if_match(&headers, &current.meta.version, &ctx)?;

    let old_value = serde_json::to_value(&current).ok();
    let updated = state
        .repository
        .replace_group(&ctx.tenant.tenant_id, &id, group)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimGroupUpdated,
        "Group",
        &updated.id,
        "replace",
        old_value,
        serde_json::to_value(&updated).ok(),
    );

    Ok(Json(updated))
}

/// Group PATCH uses `members` set semantics (spec.md §3): `add` unions in
/// the given members, `remove` subtracts them, independent of order or
/// duplicates in the request.
pub async fn patch_group(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<crate::model::PatchRequest>,
) -> Result<impl IntoResponse, MappedError> {
    super::validate_patch_request(&patch).map_err(|e| mapped(&ctx, e))?;

    let mut current = state
        .repository
        .get_group(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    check_if_match(&headers, &current.meta.version, &ctx)?;
    let old_value = serde_json::to_value(&current).ok();

    for op in &patch.operations {
        let is_members_path = op
            .path
            .as_deref()
            .map(|p| p.eq_ignore_ascii_case("members"))
            .unwrap_or(false);
        if !is_members_path {
            continue;
        }
        let members: Vec<ScimGroupMember> = op
            .value
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| mapped(&ctx, e.into()))?
            .unwrap_or_default();
        match op.op {
            PatchOpKind::Add => {
                for m in members {
                    current.add_member(m);
                }
            }
            PatchOpKind::Remove => {
                for m in members {
                    current.remove_member(&m.value);
                }
            }
            PatchOpKind::Replace => {
                current.members = members;
            }
        }
    }

    let updated = state
        .repository
        .replace_group(&ctx.tenant.tenant_id, &id, current)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimGroupPatched,
        "Group",
        &updated.id,
        "patch",
        old_value,
        serde_json::to_value(&patch.operations).ok(),
    );

    Ok(Json(updated))
}

pub async fn delete_group(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MappedError> {
    state
        .repository
        .delete_group(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimGroupDeleted,
        "Group",
        &id,
        "delete",
        None,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
}

fn check_if_match(headers: &HeaderMap, current_version: &str, ctx: &RequestContext) -> Result<(), MappedError> {
    let Some(raw) = headers.get("if-match").and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };
    if raw.trim() == "*" {
        return Ok(());
    }
    let expected = ResourceVersion::parse_http_header(raw)
        .map_err(|e| mapped(ctx, GatewayError::PreconditionFailed(e.to_string())))?;
    let current = ResourceVersion::parse_http_header(current_version)
        .map_err(|e| mapped(ctx, GatewayError::Internal(e.to_string())))?;
    match validate_if_match(Some(&expected), &current) {
        crate::concurrency::ConditionalResult::Success(()) => Ok(()),
        crate::concurrency::ConditionalResult::VersionMismatch(conflict) => {
            Err(mapped(ctx, GatewayError::PreconditionFailed(conflict.standard_message())))
        }
    }
}
