//! Serialized access to fleet membership and status.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use fleet_core::{FleetError, FleetResult, NodeId, NodeStatus};

use crate::types::{Node, StatusChange, StatusSource};

/// Registry contents. Only reachable through the registry's lock.
#[derive(Debug)]
struct FleetState {
    /// Registration order determines round-robin sequencing.
    nodes: Vec<Node>,
    /// node id → position in `nodes`.
    index: HashMap<NodeId, usize>,
    /// Next round-robin offset; taken modulo `nodes.len()` on every read.
    cursor: usize,
    /// Successful round-robin selections since startup.
    selections: u64,
}

impl FleetState {
    fn position(&self, id: &str) -> FleetResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| FleetError::UnknownNode(id.to_string()))
    }
}

/// Thread-safe registry of the fleet's nodes.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    inner: Arc<Mutex<FleetState>>,
}

impl NodeRegistry {
    /// Create a registry with fixed membership. Every node starts `Stopped`
    /// until a probe or lifecycle command says otherwise.
    ///
    /// Duplicate ids keep their first registration position.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        for id in ids {
            let id = id.into();
            if index.contains_key(&id) {
                warn!(node_id = %id, "duplicate node id ignored");
                continue;
            }
            index.insert(id.clone(), nodes.len());
            nodes.push(Node::new(id));
        }
        debug!(nodes = nodes.len(), "node registry created");
        Self {
            inner: Arc::new(Mutex::new(FleetState {
                nodes,
                index,
                cursor: 0,
                selections: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// Snapshot of all nodes in registration order.
    pub fn list_nodes(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    /// Snapshot of a single node.
    pub fn get(&self, id: &str) -> FleetResult<Node> {
        let state = self.lock();
        let pos = state.position(id)?;
        Ok(state.nodes[pos].clone())
    }

    pub fn get_status(&self, id: &str) -> FleetResult<NodeStatus> {
        let state = self.lock();
        let pos = state.position(id)?;
        Ok(state.nodes[pos].status)
    }

    /// Unconditionally set a node's status. Returns the previous status.
    ///
    /// Probe-originated writes also refresh `last_checked`.
    pub fn set_status(
        &self,
        id: &str,
        status: NodeStatus,
        source: StatusSource,
    ) -> FleetResult<NodeStatus> {
        self.update_status(id, source, |_| Some(status))
            .map(|change| change.previous)
    }

    /// Atomically read a node's status and decide its next one.
    ///
    /// `rule` sees the current status and returns the new status, or `None`
    /// to leave it alone. The decision and the write happen under one lock,
    /// so no other writer can slip in between.
    pub fn update_status<F>(
        &self,
        id: &str,
        source: StatusSource,
        rule: F,
    ) -> FleetResult<StatusChange>
    where
        F: FnOnce(NodeStatus) -> Option<NodeStatus>,
    {
        let mut state = self.lock();
        let pos = state.position(id)?;
        let node = &mut state.nodes[pos];

        if let StatusSource::Probe { observed_at } = source {
            node.last_checked = Some(observed_at);
        }

        let previous = node.status;
        let next = rule(previous);
        if let Some(status) = next {
            node.status = status;
            if status != previous {
                debug!(node_id = %id, from = %previous, to = %status, ?source, "node status changed");
            }
        }

        Ok(StatusChange {
            previous,
            current: node.status,
            applied: next.is_some(),
        })
    }

    /// Return the node at the cursor and advance the cursor by one.
    pub fn next_round_robin(&self) -> FleetResult<Node> {
        self.select_round_robin(|_| true)?
            .ok_or(FleetError::EmptyFleet)
    }

    /// Scan circularly from the cursor for the first node accepted by
    /// `eligible`, examining every node at most once.
    ///
    /// On a hit the cursor moves one past the selected position. When no
    /// node qualifies the cursor is left where it was and `None` is returned.
    pub fn select_round_robin<F>(&self, eligible: F) -> FleetResult<Option<Node>>
    where
        F: Fn(&Node) -> bool,
    {
        let mut state = self.lock();
        let len = state.nodes.len();
        if len == 0 {
            return Err(FleetError::EmptyFleet);
        }

        let start = state.cursor % len;
        for offset in 0..len {
            let pos = (start + offset) % len;
            if eligible(&state.nodes[pos]) {
                state.cursor = (pos + 1) % len;
                state.selections += 1;
                return Ok(Some(state.nodes[pos].clone()));
            }
        }

        state.cursor = start;
        Ok(None)
    }

    /// Current round-robin offset (for diagnostics).
    pub fn cursor(&self) -> usize {
        let state = self.lock();
        match state.nodes.len() {
            0 => 0,
            len => state.cursor % len,
        }
    }

    /// Successful round-robin selections since startup.
    pub fn selections(&self) -> u64 {
        self.lock().selections
    }
}
