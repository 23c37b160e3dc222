//! fleet-state — the node registry for the storage fleet.
//!
//! The registry is the only shared mutable state in the controller. It holds
//! the fleet's membership in registration order, each node's status and last
//! probe time, and the round-robin cursor used by the load balancer.
//!
//! # Concurrency
//!
//! `NodeRegistry` is `Clone` + `Send` + `Sync` (backed by `Arc<Mutex<_>>`).
//! Every read-modify-write happens under the one lock, so a status check and
//! the change that depends on it are atomic, and readers always get a
//! consistent snapshot copy rather than a live handle.

pub mod registry;
pub mod types;

pub use registry::NodeRegistry;
pub use types::*;
