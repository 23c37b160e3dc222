//! fleet-health — health checking for the storage fleet.
//!
//! Probes every registered node through the runtime client and folds the
//! result into the node registry. The monitor runs one background task that
//! sweeps the whole fleet on a fixed interval, independent of request
//! traffic.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── Background polling task (interval + watch shutdown)
//!   │   └── sweep() → check_node() per node, concurrently
//!   │       ├── probe() → HealthRecord
//!   │       └── reconcile(prior, result) under the registry lock
//!   └── AuditSink (one HEALTH_CHANGED event per status change)
//! ```
//!
//! # Reconciliation
//!
//! A probe never overrides a lifecycle transition in flight, with one
//! exception: a `Starting` node seen alive is promoted to `Running`. Probe
//! failures (timeouts, runtime errors) mark the node `Unreachable`; they are
//! soft and retried on the next sweep, never surfaced to callers.

pub mod checker;
pub mod monitor;

pub use checker::{HealthRecord, ProbeResult, reconcile};
pub use monitor::HealthMonitor;
