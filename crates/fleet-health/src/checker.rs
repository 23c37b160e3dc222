//! Health probe logic and the status reconciliation policy.

use tracing::debug;

use fleet_core::{NodeId, NodeStatus, epoch_millis};
use fleet_runtime::{Runtime, RuntimeError};

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The runtime reports the node alive.
    Reachable,
    /// The runtime reports the node absent or stopped.
    Absent,
    /// The probe timed out or the runtime could not answer.
    Failed,
}

/// Outcome of one probe, consumed immediately by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub node_id: NodeId,
    pub result: ProbeResult,
    /// Unix epoch milliseconds when the probe completed.
    pub observed_at: u64,
}

impl HealthRecord {
    pub fn reachable(&self) -> bool {
        self.result == ProbeResult::Reachable
    }
}

/// Probe a node's liveness through the runtime.
///
/// The runtime handle carries the probe timeout; a timeout is reported as
/// `Failed` like any other runtime error.
pub async fn probe(runtime: &Runtime, node_id: &str) -> HealthRecord {
    let result = match runtime.probe_status(node_id).await {
        Ok(true) => ProbeResult::Reachable,
        Ok(false) => ProbeResult::Absent,
        Err(RuntimeError::Timeout(after)) => {
            debug!(%node_id, ?after, "health probe timed out");
            ProbeResult::Failed
        }
        Err(e) => {
            debug!(%node_id, error = %e, "health probe failed");
            ProbeResult::Failed
        }
    };

    HealthRecord {
        node_id: node_id.to_string(),
        result,
        observed_at: epoch_millis(),
    }
}

/// Decide a node's next status from its current one and a probe result.
///
/// Returns `None` when the status must stay as it is.
pub fn reconcile(prior: NodeStatus, result: ProbeResult) -> Option<NodeStatus> {
    use NodeStatus::*;

    match (prior, result) {
        // Starting is the one transitional state a probe may resolve.
        (Starting, ProbeResult::Reachable) => Some(Running),
        (Starting | Stopping, _) => None,

        (Running, ProbeResult::Reachable) => None,
        (Stopped | Unreachable, ProbeResult::Reachable) => Some(Running),

        (Stopped, ProbeResult::Absent) => None,
        (Running | Unreachable, ProbeResult::Absent) => Some(Stopped),

        (Unreachable, ProbeResult::Failed) => None,
        (Running | Stopped, ProbeResult::Failed) => Some(Unreachable),
    }
}
