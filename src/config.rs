//! Runtime configuration (SPEC_FULL.md §9.4): a typed tree covering every
//! option enumerated in spec.md §6, loaded with the `config` crate the way
//! `auth9-core` layers env vars over defaults.

use crate::retry::RetryConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenValidationConfig {
    pub jwks_uri: String,
    pub expected_issuer: String,
    pub jwks_cache_ttl_secs: u64,
}

impl Default for TokenValidationConfig {
    fn default() -> Self {
        TokenValidationConfig {
            jwks_uri: "https://login.microsoftonline.com/common/discovery/v2.0/keys".into(),
            expected_issuer: "https://login.microsoftonline.com/common/v2.0".into(),
            jwks_cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub capacity: u64,
    pub refill_per_sec: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            capacity: 100,
            refill_per_sec: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connect_ms: u64,
    pub request_ms: u64,
    pub total_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        TimeoutSettings {
            connect_ms: 2_000,
            request_ms: 10_000,
            total_ms: 30_000,
        }
    }
}

impl TimeoutSettings {
    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncDirection {
    EntraToSaas,
    SaasToEntra,
    Bidirectional,
}

impl Default for SyncDirection {
    fn default() -> Self {
        SyncDirection::Bidirectional
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub direction: SyncDirection,
    pub interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            direction: SyncDirection::Bidirectional,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub sink: AuditSinkKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    Tracing,
    InMemory,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            sink: AuditSinkKind::Tracing,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub token_validation: TokenValidationConfig,
    pub rate_limit: RateLimitSettings,
    pub timeouts: TimeoutSettings,
    pub retry: RetryConfig,
    pub audit: AuditSettings,
    pub sync: SyncSettings,
    /// Path prefixes that bypass authentication (spec.md §6:
    /// `ServiceProviderConfig` and `/health`).
    pub anonymous_prefixes: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            bind_addr: "0.0.0.0:8080".into(),
            token_validation: TokenValidationConfig::default(),
            rate_limit: RateLimitSettings::default(),
            timeouts: TimeoutSettings::default(),
            retry: RetryConfig::default(),
            audit: AuditSettings::default(),
            sync: SyncSettings::default(),
            anonymous_prefixes: vec![
                "/scim/v2/ServiceProviderConfig".into(),
                "/health".into(),
            ],
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from `config/default.toml` (optional) layered
    /// with `GATEWAY_*` environment variables, falling back to
    /// [`Default`] when neither source is present.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(::config::Environment::with_prefix("GATEWAY").separator("__"));
        match builder.build() {
            Ok(built) => built.try_deserialize().or_else(|_| Ok(Self::default())),
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_anonymous_prefixes() {
        let config = GatewayConfig::default();
        assert!(config
            .anonymous_prefixes
            .contains(&"/health".to_string()));
    }
}
