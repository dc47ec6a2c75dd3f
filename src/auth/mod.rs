//! Token validator + tenant resolver (C8). JWT/JWKS verification follows
//! `auth9-core`'s `JwtManager` idiom, trimmed to verification-only since
//! this gateway never issues tokens (spec.md §1 Non-goals). Tenant
//! resolution is grounded on the teacher's `TenantContext`/
//! `EnhancedRequestContext` shape from its multi-tenant module.

mod jwks;
mod tenant_resolver;

pub use jwks::JwksCache;
pub use tenant_resolver::{StaticTenantResolver, TenantResolver};

use crate::error::GatewayError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Required claims per spec.md §6: `tid` (tenant id), `oid` (object id of
/// the caller), plus the standard `aud`/`iss`/`exp`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayClaims {
    #[serde(default)]
    pub tid: Option<String>,
    pub oid: String,
    pub aud: String,
    pub iss: String,
    pub exp: usize,
    #[serde(default)]
    pub appid: Option<String>,
}

/// The resolved identity of the caller plus the tenant they're scoped to,
/// threaded through the request pipeline (C10) into every handler.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub actor_id: String,
    pub actor_type: crate::audit::ActorType,
}

pub struct TokenValidator {
    jwks: JwksCache,
    expected_issuer: String,
}

impl TokenValidator {
    pub fn new(jwks: JwksCache, expected_issuer: impl Into<String>) -> Self {
        TokenValidator {
            jwks,
            expected_issuer: expected_issuer.into(),
        }
    }

    /// Verifies a bearer token's signature and standard claims, then
    /// cross-checks the token's `tid` against the tenant the caller is
    /// trying to act on — a tenant's token used against another tenant's
    /// resources is rejected here, before it ever reaches a handler.
    pub async fn validate(
        &self,
        bearer_token: &str,
        resolver: &dyn TenantResolver,
    ) -> Result<TenantContext, GatewayError> {
        let header = decode_header(bearer_token)
            .map_err(|e| GatewayError::Auth(format!("malformed token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| GatewayError::Auth("token missing kid".into()))?;
        let key = self.jwks.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.expected_issuer]);
        validation.validate_aud = false;

        let token = decode::<GatewayClaims>(bearer_token, &key, &validation)
            .map_err(|e| GatewayError::Auth(format!("token verification failed: {e}")))?;
        let claims = token.claims;
        let tid = claims
            .tid
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::Tenant("token is missing a tid claim".into()))?;

        let tenant = resolver.resolve(&tid).await?;
        if !tenant.owns_audience(&claims.aud) {
            return Err(GatewayError::Auth("audience not allowed for tenant".into()));
        }

        let actor_type = if claims.appid.is_some() {
            crate::audit::ActorType::ServicePrincipal
        } else {
            crate::audit::ActorType::User
        };

        Ok(TenantContext {
            tenant_id: tid,
            actor_id: claims.oid,
            actor_type,
        })
    }
}

/// Builds a verification key directly from a PEM-encoded RSA public key,
/// for deployments that pin a key rather than fetch JWKS. Kept as a
/// standalone helper so tests don't need a running JWKS endpoint.
pub fn decoding_key_from_pem(pem: &str) -> Result<DecodingKey, GatewayError> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| GatewayError::Internal(format!("invalid signing key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_type_is_service_principal_when_appid_present() {
        let claims = GatewayClaims {
            tid: Some("t1".into()),
            oid: "o1".into(),
            aud: "api://gateway".into(),
            iss: "https://issuer".into(),
            exp: 0,
            appid: Some("app-1".into()),
        };
        let actor_type = if claims.appid.is_some() {
            crate::audit::ActorType::ServicePrincipal
        } else {
            crate::audit::ActorType::User
        };
        assert!(matches!(actor_type, crate::audit::ActorType::ServicePrincipal));
    }
}
