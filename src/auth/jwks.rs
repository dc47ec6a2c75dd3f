use crate::error::GatewayError;
use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

/// Caches decoding keys fetched from a JWKS endpoint with a TTL, and uses
/// a single-flight lock so concurrent cache misses trigger exactly one
/// HTTP fetch (spec.md §5: "JWKS/config refresh single-flight").
pub struct JwksCache {
    jwks_uri: String,
    client: reqwest::Client,
    ttl: Duration,
    keys: DashMap<String, DecodingKey>,
    refresh_lock: Arc<Mutex<Option<Instant>>>,
}

impl JwksCache {
    pub fn new(jwks_uri: impl Into<String>, ttl: Duration) -> Self {
        JwksCache {
            jwks_uri: jwks_uri.into(),
            client: reqwest::Client::new(),
            ttl,
            keys: DashMap::new(),
            refresh_lock: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, GatewayError> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(clone_key(&key));
        }
        self.refresh().await?;
        self.keys
            .get(kid)
            .map(|k| clone_key(&k))
            .ok_or_else(|| GatewayError::Auth(format!("unknown signing key '{kid}'")))
    }

    async fn refresh(&self) -> Result<(), GatewayError> {
        let mut last_refresh = self.refresh_lock.lock().await;
        if let Some(when) = *last_refresh {
            if when.elapsed() < self.ttl {
                return Ok(());
            }
        }
        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| GatewayError::Provider(format!("JWKS fetch failed: {e}")))?;
        let doc: JwksDocument = response
            .json()
            .await
            .map_err(|e| GatewayError::Provider(format!("JWKS parse failed: {e}")))?;
        for jwk in doc.keys {
            if let Ok(key) = DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                self.keys.insert(jwk.kid, key);
            }
        }
        *last_refresh = Some(Instant::now());
        Ok(())
    }
}

fn clone_key(key: &DecodingKey) -> DecodingKey {
    key.clone()
}
