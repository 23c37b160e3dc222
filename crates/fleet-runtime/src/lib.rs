//! fleet-runtime — the container runtime boundary.
//!
//! Storage nodes are containers managed by an external runtime CLI. This
//! crate defines the capability the controller consumes and the handle that
//! bounds every call with a timeout:
//!
//! - **`RuntimeClient`**: object-safe trait over `execute`, `copy_in`,
//!   `copy_out` and `probe_status`
//! - **`DockerRuntime`**: shells out to `docker` (or a compatible CLI)
//! - **`FakeRuntime`**: deterministic in-memory runtime for tests
//! - **`Runtime`**: shared handle that applies the call timeout
//!
//! # Architecture
//!
//! ```text
//! Runtime (Arc<dyn RuntimeClient> + timeout)
//!   ├── DockerRuntime → tokio::process::Command
//!   └── FakeRuntime   → scripted liveness, exit codes, hangs, file store
//! ```
//!
//! A call that exceeds its bound surfaces as `RuntimeError::Timeout`. The
//! underlying process is not cancelled; it may still finish in the
//! background and the next status probe reconciles what actually happened.

pub mod client;
pub mod docker;
pub mod fake;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub use client::{
    ExitCode, RuntimeClient, RuntimeCommand, RuntimeError, RuntimeFuture, RuntimeResult,
};
pub use docker::DockerRuntime;
pub use fake::{FakeCall, FakeOp, FakeRuntime};

/// Shared, timeout-bounded handle to a runtime client.
#[derive(Clone)]
pub struct Runtime {
    client: Arc<dyn RuntimeClient>,
    timeout: Duration,
}

impl Runtime {
    pub fn new(client: Arc<dyn RuntimeClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The same client with a different call bound.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, node_id: &str, command: &RuntimeCommand) -> RuntimeResult<ExitCode> {
        self.bounded(node_id, "execute", self.client.execute(node_id, command))
            .await
    }

    pub async fn copy_in(&self, node_id: &str, local: &Path, remote: &str) -> RuntimeResult<ExitCode> {
        self.bounded(node_id, "copy_in", self.client.copy_in(node_id, local, remote))
            .await
    }

    pub async fn copy_out(&self, node_id: &str, remote: &str, local: &Path) -> RuntimeResult<ExitCode> {
        self.bounded(node_id, "copy_out", self.client.copy_out(node_id, remote, local))
            .await
    }

    pub async fn probe_status(&self, node_id: &str) -> RuntimeResult<bool> {
        self.bounded(node_id, "probe_status", self.client.probe_status(node_id))
            .await
    }

    async fn bounded<T>(
        &self,
        node_id: &str,
        call: &'static str,
        fut: RuntimeFuture<'_, T>,
    ) -> RuntimeResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%node_id, call, timeout = ?self.timeout, "runtime call timed out");
                Err(RuntimeError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
