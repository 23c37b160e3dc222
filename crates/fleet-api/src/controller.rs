//! The operations upstream callers consume.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use fleet_core::{FleetConfig, FleetResult, NodeId, SharedAudit};
use fleet_health::HealthMonitor;
use fleet_runtime::{Runtime, RuntimeClient};
use fleet_scheduler::{LifecycleController, LoadBalancer};
use fleet_state::{Node, NodeRegistry};
use fleet_storage::StorageGateway;

/// Point-in-time fleet statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub running: usize,
    /// Successful node selections since startup.
    pub selections: u64,
}

/// Facade over every fleet component. Cheap to clone.
#[derive(Clone)]
pub struct FleetController {
    registry: NodeRegistry,
    balancer: LoadBalancer,
    lifecycle: LifecycleController,
    monitor: HealthMonitor,
    gateway: Arc<StorageGateway>,
}

impl FleetController {
    /// Wire the fleet described by `config` over a runtime client.
    ///
    /// Every node starts `Stopped` until the first probe sweep; the health
    /// monitor is created but not started.
    pub fn new(config: &FleetConfig, client: Arc<dyn RuntimeClient>, audit: SharedAudit) -> Self {
        let registry = NodeRegistry::new(config.fleet.nodes.iter().cloned());
        let runtime = Runtime::new(client, config.runtime_timeout());

        let monitor = HealthMonitor::new(
            registry.clone(),
            runtime.with_timeout(config.health_timeout()),
            audit.clone(),
            config.health_interval(),
        );
        let lifecycle = LifecycleController::new(
            registry.clone(),
            runtime.clone(),
            monitor.clone(),
            audit.clone(),
        );
        let gateway = StorageGateway::new(registry.clone(), runtime, audit)
            .with_storage_path(config.runtime.storage_path.clone())
            .with_staging_dir(config.staging.dir.clone());

        info!(nodes = registry.len(), "fleet controller ready");

        Self {
            balancer: LoadBalancer::new(registry.clone()),
            registry,
            lifecycle,
            monitor,
            gateway: Arc::new(gateway),
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    // ── Nodes ──────────────────────────────────────────────────────

    pub fn select_node(&self) -> FleetResult<NodeId> {
        self.balancer.select_node()
    }

    pub async fn start_node(&self, node_id: &str) -> FleetResult<()> {
        self.lifecycle.start(node_id).await
    }

    pub async fn stop_node(&self, node_id: &str) -> FleetResult<()> {
        self.lifecycle.stop(node_id).await
    }

    /// Every node with its status, in registration order.
    pub fn get_fleet_status(&self) -> Vec<Node> {
        self.registry.list_nodes()
    }

    pub fn get_node(&self, node_id: &str) -> FleetResult<Node> {
        self.registry.get(node_id)
    }

    pub fn stats(&self) -> FleetStats {
        let nodes = self.registry.list_nodes();
        FleetStats {
            total: nodes.len(),
            running: nodes.iter().filter(|n| n.status.is_running()).count(),
            selections: self.balancer.selections(),
        }
    }

    /// Probe every node once and apply the results.
    pub async fn refresh(&self) -> usize {
        self.monitor.sweep().await
    }

    // ── Files ──────────────────────────────────────────────────────

    pub async fn create_file(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        self.gateway.create(filename, content).await
    }

    pub async fn read_file(&self, filename: &str) -> FleetResult<Vec<u8>> {
        self.gateway.read(filename).await
    }

    pub async fn update_file(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        self.gateway.update(filename, content).await
    }

    pub async fn delete_file(&self, filename: &str) -> FleetResult<()> {
        self.gateway.delete(filename).await
    }
}

impl std::fmt::Debug for FleetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetController")
            .field("registry", &self.registry)
            .field("monitor", &self.monitor)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
