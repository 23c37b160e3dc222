//! fleet-scheduler — decides where work goes and drives node transitions.
//!
//! # Components
//!
//! - **`LoadBalancer`**: picks the next `Running` node in round-robin order
//! - **`LifecycleController`**: start/stop state machine over the runtime
//!
//! # Flow
//!
//! ```text
//! select_node() → registry.select_round_robin(Running) → node id
//!
//! start(id) → Starting → runtime start → Running
//!                                      └→ Stopped (+ re-probe) on failure
//! stop(id)  → Stopping → runtime stop  → Stopped
//!                                      └→ Unreachable (+ re-probe) on failure
//! ```

pub mod lifecycle;
pub mod load_balancer;

pub use lifecycle::LifecycleController;
pub use load_balancer::LoadBalancer;
