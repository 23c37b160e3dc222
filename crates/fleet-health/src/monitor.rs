//! Background task that keeps node statuses current.
//!
//! The `HealthMonitor` owns one polling task for the whole fleet. Each cycle
//! probes every registered node concurrently and folds the results into the
//! registry; a slow node only delays its own probe, bounded by the probe
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use fleet_core::{Actor, AuditAction, AuditEvent, FleetResult, NodeStatus, SharedAudit};
use fleet_runtime::Runtime;
use fleet_state::{NodeRegistry, StatusChange, StatusSource};

use crate::checker::{probe, reconcile};

/// Running polling task.
struct MonitorSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Periodically probes every node and reconciles the registry.
#[derive(Clone)]
pub struct HealthMonitor {
    registry: NodeRegistry,
    /// Runtime handle bounded by the probe timeout.
    runtime: Runtime,
    audit: SharedAudit,
    interval: Duration,
    slot: Arc<Mutex<Option<MonitorSlot>>>,
}

impl HealthMonitor {
    /// Create a monitor. `runtime` should already carry the probe timeout.
    pub fn new(
        registry: NodeRegistry,
        runtime: Runtime,
        audit: SharedAudit,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            runtime,
            audit,
            interval,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probe one node and apply the result.
    ///
    /// Used by the polling loop and by the lifecycle controller after a
    /// failed command.
    pub async fn check_node(&self, node_id: &str) -> FleetResult<StatusChange> {
        let record = probe(&self.runtime, node_id).await;
        let change = self.registry.update_status(
            node_id,
            StatusSource::Probe {
                observed_at: record.observed_at,
            },
            |prior| reconcile(prior, record.result),
        )?;

        if change.changed() {
            if change.current == NodeStatus::Unreachable {
                warn!(%node_id, from = %change.previous, "node unreachable");
            } else {
                info!(%node_id, from = %change.previous, to = %change.current, "node health changed");
            }
            self.audit.record(AuditEvent::new(
                Actor::HealthMonitor,
                AuditAction::HealthChanged,
                format!("{node_id}: {} -> {}", change.previous, change.current),
            ));
        } else {
            debug!(%node_id, result = ?record.result, status = %change.current, "health probe");
        }

        Ok(change)
    }

    /// Probe every registered node once, concurrently.
    ///
    /// Returns the number of nodes whose status changed. Failures are logged
    /// and never abort the sweep.
    pub async fn sweep(&self) -> usize {
        let mut probes = JoinSet::new();
        for node in self.registry.list_nodes() {
            let monitor = self.clone();
            probes.spawn(async move { monitor.check_node(&node.id).await });
        }

        let mut changed = 0;
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(Ok(change)) if change.changed() => changed += 1,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "health check failed"),
                Err(e) => error!(error = %e, "health check task panicked"),
            }
        }
        changed
    }

    /// Start the background polling task. A running task is replaced.
    pub async fn start(&self) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            monitor.run_health_loop(shutdown_rx).await;
        });

        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.replace(MonitorSlot {
            handle,
            shutdown_tx,
        }) {
            let _ = old.shutdown_tx.send(true);
            old.handle.abort();
        }

        info!(interval = ?self.interval, nodes = self.registry.len(), "health monitor started");
    }

    /// Stop the polling task and wait for an in-progress sweep to finish.
    pub async fn stop(&self) {
        let Some(slot) = self.slot.lock().await.take() else {
            return;
        };
        let _ = slot.shutdown_tx.send(true);
        match slot.handle.await {
            Err(e) if !e.is_cancelled() => error!(error = %e, "health monitor task failed"),
            _ => {}
        }
        info!("health monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    async fn run_health_loop(&self, mut shutdown: watch::Receiver<bool>) {
        // A zero period would make the ticker panic.
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(interval = ?self.interval, "health loop starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let changed = self.sweep().await;
                    debug!(changed, "health sweep complete");
                }
                _ = shutdown.changed() => {
                    debug!("health loop shutting down");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}
