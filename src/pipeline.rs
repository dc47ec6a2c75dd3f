//! Request pipeline (C10): the middleware stack every SCIM request passes
//! through, in order — correlation id assignment, authentication/tenant
//! resolution, rate limiting, then the resource handler. Layered with
//! `tower`/`tower-http` the way `auth9-core` and `hadrian` compose their
//! middleware stacks.

use crate::audit::{ActorType, AuditEntry, AuditEventType, AuditSink};
use crate::auth::{TenantContext, TokenValidator};
use crate::error::{GatewayError, MappedError};
use crate::ratelimit::{RateLimitKey, RateLimiter};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Resolved per-request context threaded from the pipeline into handlers
/// via an axum extension. `audited` is a shared flag a handler flips when
/// it records its own detailed audit entry (spec.md §4.6); the audit
/// bracket (C10) checks it to avoid double-auditing a request a handler
/// already covered.
#[derive(Clone)]
pub struct RequestContext {
    pub tenant: TenantContext,
    pub correlation_id: String,
    pub audited: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn new(tenant: TenantContext, correlation_id: impl Into<String>) -> Self {
        RequestContext {
            tenant,
            correlation_id: correlation_id.into(),
            audited: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct PipelineState {
    pub validator: Arc<TokenValidator>,
    pub resolver: Arc<dyn crate::auth::TenantResolver>,
    pub rate_limiter: Arc<RateLimiter>,
    pub audit_sink: Arc<dyn AuditSink>,
}

/// Emits a single audit entry for a request denied before it ever reaches a
/// resource handler (missing/invalid token, tenant mismatch), so §4.6's
/// "every request produces exactly one audit entry" holds even for
/// rejections the handler layer never sees.
fn audit_denied(
    state: &PipelineState,
    tenant_id: &str,
    actor_id: &str,
    actor_type: ActorType,
    correlation_id: &str,
    reason: &str,
) {
    let entry = AuditEntry::builder(AuditEventType::RequestDenied, tenant_id, actor_id, actor_type, correlation_id)
        .action(reason)
        .build();
    crate::audit::dispatch(state.audit_sink.clone(), entry);
}

fn audit_rate_limited(
    state: &PipelineState,
    tenant_id: &str,
    actor_id: &str,
    actor_type: ActorType,
    correlation_id: &str,
    retry_after_secs: u64,
) {
    let entry = AuditEntry::builder(
        AuditEventType::RequestRateLimited,
        tenant_id,
        actor_id,
        actor_type,
        correlation_id,
    )
    .action("rateLimited")
    .new_value(serde_json::json!({ "retryAfterSecs": retry_after_secs }))
    .build();
    crate::audit::dispatch(state.audit_sink.clone(), entry);
}

/// Reads `X-Request-Id`/`X-Correlation-ID`, generating one if absent, so
/// every downstream log line and audit entry can be tied back to the
/// inbound call (spec.md §6).
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get("x-correlation-id")
        .or_else(|| headers.get("x-request-id"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(GatewayError::MissingBearerToken)
}

/// Enforces spec.md §4.8's cross-tenant check: when a caller supplies an
/// explicit tenant segment (via `X-Tenant-Id`, since this gateway's routes
/// carry no tenant path segment of their own), it must match the token's
/// `tid` case-insensitively, or the request is forbidden outright rather
/// than silently operating on the token's tenant.
fn check_tenant_segment(headers: &HeaderMap, token_tenant_id: &str) -> Result<(), GatewayError> {
    let Some(requested) = headers.get("x-tenant-id").and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };
    if requested.eq_ignore_ascii_case(token_tenant_id) {
        Ok(())
    } else {
        Err(GatewayError::Forbidden(format!(
            "tenant segment '{requested}' does not match token tenant"
        )))
    }
}

/// Authentication + tenant resolution + rate limiting, composed as one
/// middleware function (axum's `from_fn_with_state` idiom).
pub async fn auth_and_rate_limit(
    State(state): State<Arc<PipelineState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, MappedError> {
    let headers = request.headers().clone();
    let correlation_id = correlation_id(&headers);

    let tenant = match bearer_token(&headers) {
        Ok(token) => match state.validator.validate(token, state.resolver.as_ref()).await {
            Ok(tenant) => tenant,
            Err(e) => {
                audit_denied(&state, "unknown", "unknown", ActorType::System, &correlation_id, "authFailed");
                return Err(MappedError::new(e, Some(correlation_id)));
            }
        },
        Err(e) => {
            audit_denied(
                &state,
                "unknown",
                "unknown",
                ActorType::System,
                &correlation_id,
                "missingBearerToken",
            );
            return Err(MappedError::new(e, Some(correlation_id)));
        }
    };

    if let Err(e) = check_tenant_segment(&headers, &tenant.tenant_id) {
        audit_denied(
            &state,
            &tenant.tenant_id,
            &tenant.actor_id,
            tenant.actor_type,
            &correlation_id,
            "tenantSegmentMismatch",
        );
        return Err(MappedError::new(e, Some(correlation_id)));
    }

    let key = RateLimitKey {
        tenant_id: tenant.tenant_id.clone(),
        actor_id: tenant.actor_id.clone(),
    };
    let outcome = state.rate_limiter.check(key);
    if !outcome.allowed {
        audit_rate_limited(
            &state,
            &tenant.tenant_id,
            &tenant.actor_id,
            tenant.actor_type,
            &correlation_id,
            outcome.retry_after_secs,
        );
        return Err(MappedError::new(
            GatewayError::RateLimited {
                retry_after_secs: outcome.retry_after_secs,
            },
            Some(correlation_id),
        ));
    }

    request
        .extensions_mut()
        .insert(RequestContext::new(tenant, correlation_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn correlation_id_falls_back_to_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-123"));
        assert_eq!(correlation_id(&headers), "req-123");
    }

    #[test]
    fn correlation_id_prefers_explicit_correlation_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-123"));
        headers.insert("x-correlation-id", HeaderValue::from_static("corr-456"));
        assert_eq!(correlation_id(&headers), "corr-456");
    }

    #[test]
    fn missing_bearer_token_is_auth_error() {
        let headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(GatewayError::MissingBearerToken)));
    }

    #[test]
    fn tenant_segment_absent_is_allowed() {
        let headers = HeaderMap::new();
        assert!(check_tenant_segment(&headers, "tenant-a").is_ok());
    }

    #[test]
    fn tenant_segment_matching_token_case_insensitively_is_allowed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("Tenant-A"));
        assert!(check_tenant_segment(&headers, "tenant-a").is_ok());
    }

    #[test]
    fn tenant_segment_mismatch_is_forbidden() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("tenant-b"));
        assert!(matches!(
            check_tenant_segment(&headers, "tenant-a"),
            Err(GatewayError::Forbidden(_))
        ));
    }
}
