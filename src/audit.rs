//! Audit pipeline (C6): an append-only, fire-and-forget log of every
//! mutation, redacted before it leaves the pipeline. Builder idiom follows
//! the `AuditLogEntry::builder(...)` shape used elsewhere in this corpus.

use crate::redact::redact_json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditEventType {
    ScimUserCreated,
    ScimUserUpdated,
    ScimUserPatched,
    ScimUserDeleted,
    ScimGroupCreated,
    ScimGroupUpdated,
    ScimGroupPatched,
    ScimGroupDeleted,
    SyncDriftDetected,
    SyncConflictDetected,
    SyncReconciled,
    /// A read (GET/List) or an admin-API call that succeeded without a
    /// handler staging its own detailed entry.
    ResourceRead,
    /// A request that reached a resource handler but failed there (not
    /// found, conflict, precondition failed, validation, PATCH `noTarget`,
    /// ...), audited generically since the handler never got to record a
    /// specific entry.
    RequestFailed,
    /// A request rejected before reaching a handler at all: missing/invalid
    /// bearer token, or a tenant-segment mismatch.
    RequestDenied,
    /// A request rejected by the rate limiter (429).
    RequestRateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActorType {
    User,
    ServicePrincipal,
    System,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub event_type: AuditEventType,
    pub tenant_id: String,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub resource_type: String,
    pub resource_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditEntryBuilder {
    event_type: AuditEventType,
    tenant_id: String,
    actor_id: String,
    actor_type: ActorType,
    resource_type: String,
    resource_id: String,
    action: String,
    old_value: Option<Value>,
    new_value: Option<Value>,
    correlation_id: String,
}

impl AuditEntry {
    pub fn builder(
        event_type: AuditEventType,
        tenant_id: impl Into<String>,
        actor_id: impl Into<String>,
        actor_type: ActorType,
        correlation_id: impl Into<String>,
    ) -> AuditEntryBuilder {
        AuditEntryBuilder {
            event_type,
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
            actor_type,
            resource_type: String::new(),
            resource_id: String::new(),
            action: String::new(),
            old_value: None,
            new_value: None,
            correlation_id: correlation_id.into(),
        }
    }
}

impl AuditEntryBuilder {
    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = resource_id.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Values are redacted here, not by the caller — every entry that goes
    /// through the builder is guaranteed PII-free regardless of what it's
    /// constructed from (full snapshot or a PATCH `value` fragment).
    pub fn old_value(mut self, value: Value) -> Self {
        self.old_value = Some(redact_json(&value));
        self
    }

    pub fn new_value(mut self, value: Value) -> Self {
        self.new_value = Some(redact_json(&value));
        self
    }

    pub fn build(self) -> AuditEntry {
        AuditEntry {
            event_type: self.event_type,
            tenant_id: self.tenant_id,
            actor_id: self.actor_id,
            actor_type: self.actor_type,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            action: self.action,
            old_value: self.old_value,
            new_value: self.new_value,
            correlation_id: self.correlation_id,
            timestamp: Utc::now(),
        }
    }
}

/// Where audit entries go. Append-only: no method removes or mutates a
/// previously written entry.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emits one structured `tracing` event per entry; the default sink in
/// production.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            event_type = ?entry.event_type,
            tenant_id = %entry.tenant_id,
            actor_id = %entry.actor_id,
            resource_type = %entry.resource_type,
            resource_id = %entry.resource_id,
            correlation_id = %entry.correlation_id,
            "audit"
        );
    }
}

/// Keeps entries in memory; used by tests that assert on the audit trail.
#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: std::sync::Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

/// Fire-and-forget dispatch: the caller hands off an entry and moves on
/// without waiting on the sink, matching spec.md §4.6's non-blocking
/// requirement.
pub fn dispatch(sink: Arc<dyn AuditSink>, entry: AuditEntry) {
    tokio::spawn(async move {
        sink.record(entry);
    });
}
