//! Start/stop state machine for storage nodes.
//!
//! The transitional status is written before the runtime call is issued, so
//! the load balancer stops routing to a node the moment a stop begins and
//! does not route to a starting node until its start has completed.

use tracing::{info, warn};

use fleet_core::{
    Actor, AuditAction, AuditEvent, FleetError, FleetResult, LifecycleAction, NodeStatus,
    SharedAudit,
};
use fleet_health::HealthMonitor;
use fleet_runtime::{Runtime, RuntimeCommand, RuntimeError};
use fleet_state::{NodeRegistry, StatusSource};

/// Shape of one lifecycle transition.
struct Transition {
    command: RuntimeCommand,
    allowed_from: &'static [NodeStatus],
    via: NodeStatus,
    to: NodeStatus,
    /// Status left behind when the runtime rejects the command.
    on_failure: NodeStatus,
    begun: AuditAction,
    done: AuditAction,
    failed: AuditAction,
}

impl Transition {
    fn of(action: LifecycleAction) -> Self {
        match action {
            LifecycleAction::Start => Transition {
                command: RuntimeCommand::Start,
                allowed_from: &[NodeStatus::Stopped, NodeStatus::Unreachable],
                via: NodeStatus::Starting,
                to: NodeStatus::Running,
                on_failure: NodeStatus::Stopped,
                begun: AuditAction::NodeStarting,
                done: AuditAction::NodeStarted,
                failed: AuditAction::NodeStartFailed,
            },
            LifecycleAction::Stop => Transition {
                command: RuntimeCommand::Stop,
                allowed_from: &[NodeStatus::Running, NodeStatus::Unreachable],
                via: NodeStatus::Stopping,
                to: NodeStatus::Stopped,
                // Whether the node is still up is unknown; force a re-check.
                on_failure: NodeStatus::Unreachable,
                begun: AuditAction::NodeStopping,
                done: AuditAction::NodeStopped,
                failed: AuditAction::NodeStopFailed,
            },
        }
    }
}

/// Drives explicit start/stop requests through the runtime.
#[derive(Clone)]
pub struct LifecycleController {
    registry: NodeRegistry,
    runtime: Runtime,
    monitor: HealthMonitor,
    audit: SharedAudit,
}

impl LifecycleController {
    pub fn new(
        registry: NodeRegistry,
        runtime: Runtime,
        monitor: HealthMonitor,
        audit: SharedAudit,
    ) -> Self {
        Self {
            registry,
            runtime,
            monitor,
            audit,
        }
    }

    /// Boot a stopped (or unreachable) node.
    pub async fn start(&self, node_id: &str) -> FleetResult<()> {
        self.transition(node_id, LifecycleAction::Start).await
    }

    /// Shut down a running (or unreachable) node.
    pub async fn stop(&self, node_id: &str) -> FleetResult<()> {
        self.transition(node_id, LifecycleAction::Stop).await
    }

    async fn transition(&self, node_id: &str, action: LifecycleAction) -> FleetResult<()> {
        let t = Transition::of(action);

        // Check and claim the node in one registry operation.
        let claim = self
            .registry
            .update_status(node_id, StatusSource::Lifecycle, |current| {
                t.allowed_from.contains(&current).then_some(t.via)
            })?;
        if !claim.applied {
            return Err(FleetError::InvalidTransition {
                node_id: node_id.to_string(),
                action,
                status: claim.previous,
            });
        }

        info!(%node_id, %action, from = %claim.previous, "lifecycle transition started");
        self.record(t.begun, format!("{node_id}: {} -> {}", claim.previous, t.via));

        let reason = match self.runtime.execute(node_id, &t.command).await {
            Ok(code) if code.success() => {
                let status = self.settle(node_id, &t, t.to)?;
                info!(%node_id, %action, %status, "lifecycle transition complete");
                self.record(t.done, format!("{node_id}: {} -> {status}", t.via));
                return Ok(());
            }
            Ok(code) => code.to_string(),
            Err(RuntimeError::Timeout(after)) => {
                // The command may still complete; the next sweep reconciles.
                self.settle(node_id, &t, NodeStatus::Unreachable)?;
                warn!(%node_id, %action, ?after, "lifecycle command timed out");
                self.record(t.failed, format!("{node_id}: timed out after {after:?}"));
                return Err(FleetError::Timeout {
                    node_id: node_id.to_string(),
                    after,
                });
            }
            Err(e) => e.to_string(),
        };

        let status = self.settle(node_id, &t, t.on_failure)?;
        warn!(%node_id, %action, %reason, %status, "lifecycle command failed");
        self.record(t.failed, format!("{node_id}: {reason}"));

        if let Err(e) = self.monitor.check_node(node_id).await {
            warn!(%node_id, %action, error = %e, "re-probe after failed command failed");
        }

        Err(FleetError::LifecycleCommand {
            node_id: node_id.to_string(),
            action,
            reason,
        })
    }

    /// Write the outcome of a runtime call, but only while the node is still
    /// in the transitional status this transition claimed. Returns the status
    /// the node is left in.
    ///
    /// A probe may resolve `Starting` to `Running` mid-call, after which a
    /// stop may claim the node; such later writes are not overwritten.
    fn settle(
        &self,
        node_id: &str,
        t: &Transition,
        outcome: NodeStatus,
    ) -> FleetResult<NodeStatus> {
        let change = self
            .registry
            .update_status(node_id, StatusSource::Lifecycle, |current| {
                (current == t.via).then_some(outcome)
            })?;
        if !change.applied && change.current != outcome {
            warn!(
                %node_id,
                status = %change.current,
                intended = %outcome,
                "status moved while lifecycle command ran; left unchanged"
            );
        }
        Ok(change.current)
    }

    fn record(&self, action: AuditAction, detail: String) {
        self.audit
            .record(AuditEvent::new(Actor::Lifecycle, action, detail));
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}
