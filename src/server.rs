//! Router wiring: assembles the axum app from the pipeline middleware
//! (C10) and the resource/admin handlers (C11/C16), following the
//! `tower::ServiceBuilder` layering used across this corpus. Axum
//! handlers each extract the one piece of state they need via
//! `FromRef<AppState>`, rather than threading every handler's state type
//! through route-group routers separately.

use crate::adapters::AdapterRegistry;
use crate::admin::{self, AdminState};
use crate::auth::{JwksCache, StaticTenantResolver, TenantResolver, TokenValidator};
use crate::config::GatewayConfig;
use crate::handlers::{self, ScimState};
use crate::model::Tenant;
use crate::handlers::audit_bracket;
use crate::pipeline::{auth_and_rate_limit, PipelineState};
use crate::ratelimit::{RateLimitRule, RateLimiter};
use crate::repository::{InMemoryRepository, ScimRepository};
use crate::sync::SyncCoordinator;
use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub scim: Arc<ScimState>,
    pub admin: Arc<AdminState>,
}

impl FromRef<AppState> for Arc<ScimState> {
    fn from_ref(state: &AppState) -> Self {
        state.scim.clone()
    }
}

impl FromRef<AppState> for Arc<AdminState> {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

pub fn build_router(
    config: &GatewayConfig,
    tenants: Vec<Tenant>,
    repository: Arc<dyn ScimRepository>,
    audit_sink: Arc<dyn crate::audit::AuditSink>,
    adapters: Arc<AdapterRegistry>,
) -> Router {
    let jwks = JwksCache::new(
        config.token_validation.jwks_uri.clone(),
        Duration::from_secs(config.token_validation.jwks_cache_ttl_secs),
    );
    let validator = Arc::new(TokenValidator::new(jwks, config.token_validation.expected_issuer.clone()));
    let tenants_for_sync = tenants.clone();
    let resolver: Arc<dyn TenantResolver> = Arc::new(StaticTenantResolver::new(tenants));
    let rate_limiter = Arc::new(RateLimiter::new(RateLimitRule {
        capacity: config.rate_limit.capacity,
        refill_per_sec: config.rate_limit.refill_per_sec,
    }));

    let pipeline_state = Arc::new(PipelineState {
        validator,
        resolver,
        rate_limiter,
        audit_sink: audit_sink.clone(),
    });

    let admin_state = Arc::new(AdminState::new());
    let scim_state = Arc::new(ScimState {
        repository: repository.clone(),
        audit_sink,
    });

    spawn_sync_loop(
        config,
        tenants_for_sync,
        repository,
        adapters,
        admin_state.clone(),
    );

    let app_state = AppState {
        scim: scim_state.clone(),
        admin: admin_state,
    };

    let protected = Router::new()
        .route(
            "/scim/v2/Users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/scim/v2/Users/{id}",
            get(handlers::get_user)
                .put(handlers::replace_user)
                .patch(handlers::patch_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/scim/v2/Groups",
            post(handlers::create_group).get(handlers::list_groups),
        )
        .route(
            "/scim/v2/Groups/{id}",
            get(handlers::get_group)
                .put(handlers::replace_group)
                .patch(handlers::patch_group)
                .delete(handlers::delete_group),
        )
        .route("/api/drift", get(admin::list_drift))
        .route("/api/conflicts", get(admin::list_conflicts))
        .route("/api/conflicts/resolve", post(admin::resolve_conflict))
        .layer(middleware::from_fn_with_state(scim_state.clone(), audit_bracket))
        .layer(middleware::from_fn_with_state(pipeline_state.clone(), auth_and_rate_limit));

    let anonymous = Router::new()
        .route(
            "/scim/v2/ServiceProviderConfig",
            get(handlers::service_provider_config::service_provider_config),
        )
        .route("/health", get(handlers::service_provider_config::health));

    Router::new()
        .merge(protected)
        .merge(anonymous)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

/// Convenience constructor for local development / tests: an in-memory
/// repository and tracing-backed audit sink.
pub fn build_default_router(config: &GatewayConfig, tenants: Vec<Tenant>) -> Router {
    build_router(
        config,
        tenants,
        Arc::new(InMemoryRepository::new()),
        Arc::new(crate::audit::TracingAuditSink),
        Arc::new(AdapterRegistry::new()),
    )
}

/// Drives the sync engine (C14) on `config.sync.interval_secs`, feeding
/// every tenant's configured providers through one reconcile cycle and
/// recording the outcome into the admin API's state (C16). A tenant with
/// no adapter registered for a provider id is skipped silently; that's
/// the expected steady state until an operator wires a real adapter.
fn spawn_sync_loop(
    config: &GatewayConfig,
    tenants: Vec<Tenant>,
    repository: Arc<dyn ScimRepository>,
    adapters: Arc<AdapterRegistry>,
    admin: Arc<AdminState>,
) {
    let direction = config.sync.direction;
    let interval = Duration::from_secs(config.sync.interval_secs.max(1));
    let retry_config = config.retry.clone();
    tokio::spawn(async move {
        let coordinator = SyncCoordinator::with_retry_config(retry_config);
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for tenant in &tenants {
                for provider_id in &tenant.provider_ids {
                    match coordinator
                        .run_cycle(&tenant.tenant_id, provider_id, direction, repository.as_ref(), &adapters)
                        .await
                    {
                        Ok((report, outcome)) => {
                            if !report.entries.is_empty() {
                                admin.record_drift(report);
                            }
                            if !outcome.conflicts.is_empty() {
                                admin.record_conflicts(outcome.conflicts);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                tenant_id = %tenant.tenant_id,
                                provider_id = %provider_id,
                                error = %err,
                                "sync cycle failed"
                            );
                        }
                    }
                }
            }
        }
    });
}
