use super::{record_audit, ScimState};
use crate::audit::AuditEventType;
use crate::concurrency::{validate_if_match, ResourceVersion};
use crate::error::{GatewayError, MappedError};
use crate::model::{ResourceMeta, ScimListResponse, ScimUser};
use crate::pipeline::RequestContext;
use crate::repository::ListQuery;
use crate::schema::validate_user;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[serde(default = "default_start_index")]
    pub start_index: i64,
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub filter: Option<String>,
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

pub async fn create_user(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(mut user): Json<ScimUser>,
) -> Result<impl IntoResponse, MappedError> {
    validate_user(&user).map_err(|e| mapped(&ctx, e.into()))?;
    user.meta = ResourceMeta {
        resource_type: "User".into(),
        created: Utc::now(),
        last_modified: Utc::now(),
        version: String::new(),
    };
    let created = state
        .repository
        .create_user(&ctx.tenant.tenant_id, user)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimUserCreated,
        "User",
        &created.id,
        "create",
        None,
        serde_json::to_value(&created).ok(),
    );

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_user(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MappedError> {
    let user = state
        .repository
        .get_user(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, MappedError> {
    let list_query = ListQuery::normalized(query.start_index, query.count)
        .map_err(|e| mapped(&ctx, e))?
        .with_filter(query.filter);
    let result = state
        .repository
        .list_users(&ctx.tenant.tenant_id, &list_query)
        .await
        .map_err(|e| mapped(&ctx, e))?;
    Ok(Json(ScimListResponse::new(
        result.items,
        result.total,
        list_query.start_index,
    )))
}

pub async fn replace_user(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(user): Json<ScimUser>,
) -> Result<impl IntoResponse, MappedError> {
    validate_user(&user).map_err(|e| mapped(&ctx, e.into()))?;
    let current = state
        .repository
        .get_user(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    check_if_match(&headers, &current.meta.version, &ctx)?;

    let old_value = serde_json::to_value(&current).ok();
    let updated = state
        .repository
        .replace_user(&ctx.tenant.tenant_id, &id, user)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimUserUpdated,
        "User",
        &updated.id,
        "replace",
        old_value,
        serde_json::to_value(&updated).ok(),
    );

    Ok(Json(updated))
}

pub async fn patch_user(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<crate::model::PatchRequest>,
) -> Result<impl IntoResponse, MappedError> {
    super::validate_patch_request(&patch).map_err(|e| mapped(&ctx, e))?;

    let current = state
        .repository
        .get_user(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    check_if_match(&headers, &current.meta.version, &ctx)?;

    let old_value = serde_json::to_value(&current).ok();
    let mut value = serde_json::to_value(&current).map_err(|e| mapped(&ctx, e.into()))?;
    super::apply_patch(&mut value, &patch).map_err(|e| mapped(&ctx, e))?;
    let patched: ScimUser = serde_json::from_value(value).map_err(|e| mapped(&ctx, e.into()))?;
    validate_user(&patched).map_err(|e| mapped(&ctx, e.into()))?;

    let updated = state
        .repository
        .replace_user(&ctx.tenant.tenant_id, &id, patched)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimUserPatched,
        "User",
        &updated.id,
        "patch",
        old_value,
        serde_json::to_value(&patch.operations).ok(),
    );

    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<Arc<ScimState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MappedError> {
    state
        .repository
        .delete_user(&ctx.tenant.tenant_id, &id)
        .await
        .map_err(|e| mapped(&ctx, e))?;

    record_audit(
        &state,
        &ctx,
        AuditEventType::ScimUserDeleted,
        "User",
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
