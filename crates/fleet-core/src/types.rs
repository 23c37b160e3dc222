//! Shared types used across the fleet crates.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Runtime-assigned name that addresses a storage node.
pub type NodeId = String;

/// Lifecycle status of a storage node.
///
/// The set is closed: every transition between these states goes through
/// the registry, and the lifecycle controller rejects anything outside its
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Unreachable,
}

impl NodeStatus {
    /// Whether a lifecycle command is in flight for this node.
    pub fn is_transitional(self) -> bool {
        matches!(self, NodeStatus::Starting | NodeStatus::Stopping)
    }

    /// Whether the node may receive file traffic.
    pub fn is_running(self) -> bool {
        self == NodeStatus::Running
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeStatus::Stopped => "stopped",
            NodeStatus::Starting => "starting",
            NodeStatus::Running => "running",
            NodeStatus::Stopping => "stopping",
            NodeStatus::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle commands the controller can issue against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Start => f.write_str("start"),
            LifecycleAction::Stop => f.write_str("stop"),
        }
    }
}

/// File operations served by the storage gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::Create => f.write_str("create"),
            FileOperation::Read => f.write_str("read"),
            FileOperation::Update => f.write_str("update"),
            FileOperation::Delete => f.write_str("delete"),
        }
    }
}

/// Current Unix epoch in milliseconds.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
