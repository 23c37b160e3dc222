//! Domain types held by the node registry.

use serde::{Deserialize, Serialize};

use fleet_core::{NodeId, NodeStatus};

/// A storage backend instance as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub status: NodeStatus,
    /// Unix epoch milliseconds of the most recent health probe, if any.
    pub last_checked: Option<u64>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            status: NodeStatus::Stopped,
            last_checked: None,
        }
    }
}

/// Where a status write originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// A health probe observed the node at the given epoch milliseconds.
    Probe { observed_at: u64 },
    /// The lifecycle controller is driving a transition.
    Lifecycle,
}

/// Outcome of an atomic status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: NodeStatus,
    pub current: NodeStatus,
    /// Whether the update rule accepted the change.
    pub applied: bool,
}

impl StatusChange {
    /// Whether the node's status actually moved.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}
