//! The anonymous `/scim/v2/ServiceProviderConfig` and `/health` routes
//! (SPEC_FULL.md §10), naming its response type after the teacher's
//! `ServiceProviderConfig` type.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SupportedFeature {
    pub supported: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceProviderConfig {
    pub schemas: Vec<&'static str>,
    pub patch: SupportedFeature,
    pub filter: SupportedFeature,
    pub sort: SupportedFeature,
    pub etag: SupportedFeature,
    pub bulk: SupportedFeature,
    #[serde(rename = "authenticationSchemes")]
    pub authentication_schemes: Vec<&'static str>,
}

pub async fn service_provider_config() -> Json<ServiceProviderConfig> {
    Json(ServiceProviderConfig {
        schemas: vec!["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
        patch: SupportedFeature { supported: true },
        filter: SupportedFeature { supported: true },
        sort: SupportedFeature { supported: false },
        etag: SupportedFeature { supported: true },
        bulk: SupportedFeature { supported: false },
        authentication_schemes: vec!["oauthbearertoken"],
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
