//! Admin API (C16): read/write endpoints over drift and conflict state,
//! using the same axum handler idiom as the SCIM resource handlers (C11)
//! and the same pagination rule (SPEC_FULL.md §10).

use crate::error::MappedError;
use crate::pipeline::RequestContext;
use crate::repository::ListQuery;
use crate::sync::{ConflictReport, DriftReport};
use axum::extract::{Extension, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::Mutex;

/// In-memory store of the most recent drift/conflict reports per tenant,
/// populated by the sync engine (C14) and read by these endpoints.
#[derive(Default)]
pub struct AdminState {
    drift: Mutex<Vec<DriftReport>>,
    conflicts: Mutex<Vec<ConflictReport>>,
}

impl AdminState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_drift(&self, report: DriftReport) {
        self.drift.lock().unwrap().push(report);
    }

    pub fn record_conflicts(&self, reports: Vec<ConflictReport>) {
        self.conflicts.lock().unwrap().extend(reports);
    }

    pub fn resolve_conflict(&self, tenant_id: &str, user_id: &str, field: &str) -> bool {
        let mut conflicts = self.conflicts.lock().unwrap();
        let before = conflicts.len();
        conflicts.retain(|c| !(c.tenant_id == tenant_id && c.user_id == user_id && c.field == field));
        conflicts.len() != before
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListQuery {
    #[serde(default = "default_start_index")]
    pub start_index: i64,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_start_index() -> i64 {
    1
}

fn default_count() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse<T> {
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "startIndex")]
    pub start_index: usize,
    pub items: Vec<T>,
}

fn page<T: Clone>(items: &[T], query: &ListQuery) -> AdminListResponse<T> {
    let start = query.start_index.saturating_sub(1);
    let paged = items.iter().skip(start).take(query.count).cloned().collect();
    AdminListResponse {
        total_results: items.len(),
        start_index: query.start_index,
        items: paged,
    }
}

pub async fn list_drift(
    State(state): State<Arc<AdminState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponse<DriftReport>>, MappedError> {
    let list_query = ListQuery::normalized(query.start_index, query.count)
        .map_err(|e| MappedError::new(e, Some(ctx.correlation_id.clone())))?;
    let drift = state.drift.lock().unwrap();
    let tenant_scoped: Vec<DriftReport> = drift
        .iter()
        .filter(|d| d.tenant_id == ctx.tenant.tenant_id)
        .cloned()
        .collect();
    Ok(Json(page(&tenant_scoped, &list_query)))
}

pub async fn list_conflicts(
    State(state): State<Arc<AdminState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponse<ConflictReport>>, MappedError> {
    let list_query = ListQuery::normalized(query.start_index, query.count)
        .map_err(|e| MappedError::new(e, Some(ctx.correlation_id.clone())))?;
    let conflicts = state.conflicts.lock().unwrap();
    let tenant_scoped: Vec<ConflictReport> = conflicts
        .iter()
        .filter(|c| c.tenant_id == ctx.tenant.tenant_id)
        .cloned()
        .collect();
    Ok(Json(page(&tenant_scoped, &list_query)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveConflictRequest {
    pub user_id: String,
    pub field: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveConflictResponse {
    pub resolved: bool,
}

pub async fn resolve_conflict(
    State(state): State<Arc<AdminState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<ResolveConflictRequest>,
) -> Json<ResolveConflictResponse> {
    let resolved = state.resolve_conflict(&ctx.tenant.tenant_id, &request.user_id, &request.field);
    Json(ResolveConflictResponse { resolved })
}
