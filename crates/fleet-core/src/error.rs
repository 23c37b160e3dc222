//! Error taxonomy surfaced by the fleet controller.

use std::time::Duration;

use thiserror::Error;

use crate::types::{FileOperation, LifecycleAction, NodeId, NodeStatus};

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors returned to callers of the fleet controller.
///
/// Each variant is specific enough for a caller to decide whether a retry
/// makes sense; see [`FleetError::is_retryable`].
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("fleet has no registered nodes")]
    EmptyFleet,

    #[error("no healthy node available")]
    NoHealthyNode,

    #[error("cannot {action} node {node_id} while it is {status}")]
    InvalidTransition {
        node_id: NodeId,
        action: LifecycleAction,
        status: NodeStatus,
    },

    #[error("{action} command failed on node {node_id}: {reason}")]
    LifecycleCommand {
        node_id: NodeId,
        action: LifecycleAction,
        reason: String,
    },

    #[error("{operation} of {filename} on node {node_id} failed: {reason}")]
    Transfer {
        node_id: NodeId,
        operation: FileOperation,
        filename: String,
        reason: String,
    },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("runtime call to node {node_id} timed out after {after:?}")]
    Timeout { node_id: NodeId, after: Duration },

    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("staging area error: {0}")]
    Staging(#[from] std::io::Error),
}

impl FleetError {
    /// Whether retrying the same request later could succeed.
    ///
    /// A different node may become healthy, or a slow runtime may recover.
    /// Missing files, unknown nodes and rejected transitions are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FleetError::NoHealthyNode | FleetError::Timeout { .. } | FleetError::Transfer { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(FleetError::NoHealthyNode.is_retryable());
        assert!(
            FleetError::Timeout {
                node_id: "n1".into(),
                after: Duration::from_secs(1),
            }
            .is_retryable()
        );
        assert!(!FleetError::NotFound("a.txt".into()).is_retryable());
        assert!(!FleetError::AlreadyExists("a.txt".into()).is_retryable());
        assert!(!FleetError::UnknownNode("n9".into()).is_retryable());
        assert!(
            !FleetError::InvalidTransition {
                node_id: "n1".into(),
                action: LifecycleAction::Start,
                status: NodeStatus::Running,
            }
            .is_retryable()
        );
    }

    #[test]
    fn messages_name_the_node() {
        let err = FleetError::LifecycleCommand {
            node_id: "file-server-2".into(),
            action: LifecycleAction::Stop,
            reason: "exit status 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "stop command failed on node file-server-2: exit status 1"
        );
    }
}
