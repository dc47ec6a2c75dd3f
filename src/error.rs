//! Error taxonomy for the gateway and the mapping to wire-level SCIM error
//! documents.
//!
//! Every fallible operation in this crate returns `Result<T, GatewayError>`.
//! `GatewayError` is never constructed from a panic; it is the single type
//! that crosses module boundaries, and `error_mapper` is the only place that
//! turns one into an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The gateway's internal error taxonomy, matching the categories a caller
/// needs to distinguish: protocol-level mistakes, authentication and tenant
/// failures, not-found/conflict/precondition outcomes, rate limiting, and
/// failures surfaced from a downstream provider or from within the gateway
/// itself.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("missing bearer token")]
    MissingBearerToken,

    #[error("tenant error: {0}")]
    Tenant(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{resource_type} {id} not found")]
    NotFound { resource_type: String, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Schema / attribute validation failures (C4), nested under
/// [`GatewayError::Validation`].
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    #[error("attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidAttributeType {
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("attribute '{attribute}' has invalid value '{value}', allowed: {allowed:?}")]
    InvalidCanonicalValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("attribute '{attribute}' violates uniqueness constraint")]
    UniquenessViolation { attribute: String },

    #[error("resource has more than one primary {attribute}")]
    MultiplePrimary { attribute: String },

    #[error("unknown attribute '{attribute}'")]
    UnknownAttribute { attribute: String },

    #[error("invalid filter expression: {0}")]
    InvalidFilter(String),

    #[error("no target attribute '{attribute}'")]
    NoTarget { attribute: String },

    #[error("{0}")]
    Custom(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Protocol(format!("malformed JSON: {err}"))
    }
}

impl GatewayError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        GatewayError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// The HTTP status this error maps to, per the status table in the
    /// error handling design.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Protocol(_) => StatusCode::BAD_REQUEST,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::MissingBearerToken => StatusCode::UNAUTHORIZED,
            GatewayError::Tenant(_) => StatusCode::BAD_REQUEST,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The SCIM `scimType` token for 4xx errors that define one (RFC 7644
    /// §3.12 and spec.md §4.5's mapping table). Errors outside that table
    /// return `None`.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            GatewayError::Validation(ValidationError::InvalidFilter(_)) => Some("invalidFilter"),
            GatewayError::Validation(ValidationError::UniquenessViolation { .. }) => {
                Some("uniqueness")
            }
            GatewayError::Validation(ValidationError::NoTarget { .. }) => Some("noTarget"),
            GatewayError::Validation(_) => Some("invalidValue"),
            GatewayError::Protocol(_) => Some("invalidSyntax"),
            GatewayError::Auth(_) => Some("invalidToken"),
            GatewayError::Tenant(_) => Some("invalidTenant"),
            GatewayError::Forbidden(_) => Some("forbidden"),
            GatewayError::RateLimited { .. } => Some("tooManyRequests"),
            _ => None,
        }
    }
}

/// The wire-level SCIM error document (RFC 7644 §3.12): always has
/// `schemas`, `status`, and `detail`; never includes a stack trace. The
/// correlation id from the request is echoed back so a caller can match a
/// failure to its audit entry.
#[derive(Debug, Serialize)]
pub struct ScimErrorBody {
    pub schemas: Vec<&'static str>,
    pub status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<&'static str>,
    pub detail: String,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Carries a resolved correlation id alongside a [`GatewayError`] so the
/// error mapper can echo it without threading request context through every
/// call site.
#[derive(Debug)]
pub struct MappedError {
    pub error: GatewayError,
    pub correlation_id: Option<String>,
}

impl MappedError {
    pub fn new(error: GatewayError, correlation_id: Option<String>) -> Self {
        MappedError {
            error,
            correlation_id,
        }
    }
}

impl IntoResponse for MappedError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if matches!(self.error, GatewayError::Internal(_)) {
            tracing::error!(error = %self.error, correlation_id = ?self.correlation_id, "internal error");
        } else {
            tracing::warn!(error = %self.error, correlation_id = ?self.correlation_id, "request failed");
        }
        let body = ScimErrorBody {
            schemas: vec!["urn:ietf:params:scim:api:messages:2.0:Error"],
            status: status.as_u16().to_string(),
            scim_type: self.error.scim_type(),
            detail: scrub_detail(&self.error),
            correlation_id: self.correlation_id,
        };
        let mut response = (status, Json(body)).into_response();
        if let GatewayError::RateLimited { retry_after_secs } = self.error {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

/// Internal errors never leak implementation detail to the caller; every
/// other variant's `Display` is already caller-safe.
fn scrub_detail(error: &GatewayError) -> String {
    match error {
        GatewayError::Internal(_) => "an internal error occurred".to_string(),
        other => other.to_string(),
    }
}
