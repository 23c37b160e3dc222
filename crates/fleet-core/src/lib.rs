//! fleet-core — shared vocabulary for the storage fleet controller.
//!
//! Every other fleet crate speaks in these terms: node identifiers and the
//! closed set of node statuses, the error taxonomy surfaced to callers, the
//! audit events emitted for each state-changing action, and the `fleet.toml`
//! configuration supplied at startup.

pub mod audit;
pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use audit::{Actor, AuditAction, AuditEvent, AuditSink, MemoryAudit, SharedAudit, TracingAudit};
pub use config::FleetConfig;
pub use duration::parse_duration;
pub use error::{FleetError, FleetResult};
pub use types::*;
