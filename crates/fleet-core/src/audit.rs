//! Audit events, one record per state-changing action.
//!
//! The controller does not own the audit store. Components hand events to
//! an injected [`AuditSink`]; the default sink forwards them to `tracing`
//! under the `audit` target so any subscriber can route them.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::epoch_millis;

/// Component that performed the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Actor {
    Lifecycle,
    HealthMonitor,
    StorageGateway,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Lifecycle => f.write_str("lifecycle"),
            Actor::HealthMonitor => f.write_str("health-monitor"),
            Actor::StorageGateway => f.write_str("storage-gateway"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    NodeStarting,
    NodeStarted,
    NodeStartFailed,
    NodeStopping,
    NodeStopped,
    NodeStopFailed,
    HealthChanged,
    FileCreated,
    FileCreateFailed,
    FileRead,
    FileReadFailed,
    FileUpdated,
    FileUpdateFailed,
    FileDeleted,
    FileDeleteFailed,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::NodeStarting => "NODE_STARTING",
            AuditAction::NodeStarted => "NODE_STARTED",
            AuditAction::NodeStartFailed => "NODE_START_FAILED",
            AuditAction::NodeStopping => "NODE_STOPPING",
            AuditAction::NodeStopped => "NODE_STOPPED",
            AuditAction::NodeStopFailed => "NODE_STOP_FAILED",
            AuditAction::HealthChanged => "HEALTH_CHANGED",
            AuditAction::FileCreated => "FILE_CREATED",
            AuditAction::FileCreateFailed => "FILE_CREATE_FAILED",
            AuditAction::FileRead => "FILE_READ",
            AuditAction::FileReadFailed => "FILE_READ_FAILED",
            AuditAction::FileUpdated => "FILE_UPDATED",
            AuditAction::FileUpdateFailed => "FILE_UPDATE_FAILED",
            AuditAction::FileDeleted => "FILE_DELETED",
            AuditAction::FileDeleteFailed => "FILE_DELETE_FAILED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: Actor,
    pub action: AuditAction,
    pub detail: String,
    /// Unix epoch milliseconds when the event was produced.
    pub at: u64,
}

impl AuditEvent {
    pub fn new(actor: Actor, action: AuditAction, detail: impl Into<String>) -> Self {
        Self {
            actor,
            action,
            detail: detail.into(),
            at: epoch_millis(),
        }
    }
}

/// Receives audit events. Implementations must not block for long; the
/// caller is usually in the middle of a request.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Shared handle to an audit sink.
pub type SharedAudit = Arc<dyn AuditSink>;

/// Forwards audit events to `tracing` under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            actor = %event.actor,
            action = %event.action,
            detail = %event.detail,
            at = event.at,
            "audit event"
        );
    }
}

/// Keeps audit events in memory (for tests and diagnostics).
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded actions, oldest first.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().into_iter().map(|e| e.action).collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
