//! Optimistic concurrency control (C3): weak ETags and the `If-Match`
//! contract. Adapted from the teacher's resource-versioning module, made
//! resource-agnostic so both the SCIM resource handlers and the admin API
//! can share one version type.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// A weak entity tag, serialized as `W/"<opaque>"` per RFC 7232. The opaque
/// token is URL-safe base64, matching the teacher's version encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceVersion {
    opaque: String,
}

impl ResourceVersion {
    /// Derives a version from the canonical JSON bytes of a resource. Two
    /// calls with byte-identical content produce the same version, which is
    /// what makes this form useful in tests.
    pub fn from_content(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let opaque = URL_SAFE_NO_PAD.encode(&digest[..8]);
        ResourceVersion { opaque }
    }

    /// A random opaque version, for stores that mint a new token on every
    /// write rather than hashing content (e.g. a database sequence number).
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        ResourceVersion {
            opaque: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }

    pub fn to_http_header(&self) -> String {
        format!("W/\"{}\"", self.opaque)
    }

    /// Parses an `If-Match` header value, accepting both weak (`W/"..."`)
    /// and bare quoted forms.
    pub fn parse_http_header(value: &str) -> Result<Self, VersionError> {
        let trimmed = value.trim();
        let inner = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let inner = inner.strip_prefix('"').unwrap_or(inner);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        if inner.is_empty() {
            return Err(VersionError::InvalidEtagFormat(value.to_string()));
        }
        Ok(ResourceVersion {
            opaque: inner.to_string(),
        })
    }

    pub fn matches(&self, other: &Self) -> bool {
        self.opaque == other.opaque
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_http_header())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("invalid ETag format: {0}")]
    InvalidEtagFormat(String),
}

/// Outcome of validating a caller-supplied `If-Match` version against the
/// resource's current version.
#[derive(Debug)]
pub enum ConditionalResult<T> {
    Success(T),
    VersionMismatch(VersionConflict),
}

impl<T> ConditionalResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ConditionalResult::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            ConditionalResult::Success(v) => Some(v),
            ConditionalResult::VersionMismatch(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub expected: ResourceVersion,
    pub current: ResourceVersion,
}

impl VersionConflict {
    pub fn new(expected: ResourceVersion, current: ResourceVersion) -> Self {
        VersionConflict { expected, current }
    }

    pub fn standard_message(&self) -> String {
        format!(
            "If-Match version {} does not match current version {}",
            self.expected.to_http_header(),
            self.current.to_http_header()
        )
    }
}

/// Validates an `If-Match` precondition. On mismatch the caller's resource
/// is left untouched; this function performs no mutation itself, it only
/// decides whether the caller is allowed to proceed.
pub fn validate_if_match(
    if_match: Option<&ResourceVersion>,
    current: &ResourceVersion,
) -> ConditionalResult<()> {
    match if_match {
        None => ConditionalResult::Success(()),
        Some(expected) if expected.matches(current) => ConditionalResult::Success(()),
        Some(expected) => ConditionalResult::VersionMismatch(VersionConflict::new(
            expected.clone(),
            current.clone(),
        )),
    }
}
