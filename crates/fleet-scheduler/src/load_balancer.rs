//! Round-robin load balancer.
//!
//! Selection and cursor advance happen under the registry lock, so
//! concurrent callers never observe the same cursor position twice.

use tracing::{debug, warn};

use fleet_core::{FleetError, FleetResult, NodeId};
use fleet_state::NodeRegistry;

/// Selects the next `Running` node, scanning from the shared cursor.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    registry: NodeRegistry,
}

impl LoadBalancer {
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    /// Pick a node for the next unit of work.
    ///
    /// Fails with `NoHealthyNode` when no registered node is `Running`,
    /// including when the fleet is empty. Never blocks and never falls back
    /// to a node in any other status.
    pub fn select_node(&self) -> FleetResult<NodeId> {
        match self.registry.select_round_robin(|node| node.status.is_running()) {
            Ok(Some(node)) => {
                debug!(node_id = %node.id, "selected node");
                Ok(node.id)
            }
            Ok(None) | Err(FleetError::EmptyFleet) => {
                warn!(nodes = self.registry.len(), "no running node available");
                Err(FleetError::NoHealthyNode)
            }
            Err(e) => Err(e),
        }
    }

    /// Successful selections since startup.
    pub fn selections(&self) -> u64 {
        self.registry.selections()
    }
}
