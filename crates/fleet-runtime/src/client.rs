//! The runtime client capability: the boundary to the container runtime.
//!
//! Every call is an out-of-process command whose exit status is the only
//! failure signal. Implementations are injected so the controller's state
//! machine can be exercised against a deterministic fake.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for runtime calls.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Boxed future returned by [`RuntimeClient`] methods.
pub type RuntimeFuture<'a, T> = Pin<Box<dyn Future<Output = RuntimeResult<T>> + Send + 'a>>;

/// Errors raised at the runtime boundary, as opposed to a command that ran
/// and exited non-zero.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime call timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("runtime error: {0}")]
    Other(String),
}

/// Process-style exit status of a runtime command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    pub fn success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit status {}", self.0)
    }
}

/// Commands executed against a node through [`RuntimeClient::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    /// Boot the node.
    Start,
    /// Shut the node down.
    Stop,
    /// Remove a file from the node's storage area.
    Remove { path: String },
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeCommand::Start => f.write_str("start"),
            RuntimeCommand::Stop => f.write_str("stop"),
            RuntimeCommand::Remove { path } => write!(f, "remove {path}"),
        }
    }
}

/// Capability to drive nodes through an external container runtime.
///
/// Implementations are stateless from the controller's point of view and
/// must tolerate concurrent calls.
pub trait RuntimeClient: Send + Sync {
    /// Run a lifecycle or maintenance command against a node.
    fn execute<'a>(
        &'a self,
        node_id: &'a str,
        command: &'a RuntimeCommand,
    ) -> RuntimeFuture<'a, ExitCode>;

    /// Copy a local file into the node at `remote`.
    fn copy_in<'a>(
        &'a self,
        node_id: &'a str,
        local: &'a Path,
        remote: &'a str,
    ) -> RuntimeFuture<'a, ExitCode>;

    /// Copy `remote` out of the node into a local file.
    fn copy_out<'a>(
        &'a self,
        node_id: &'a str,
        remote: &'a str,
        local: &'a Path,
    ) -> RuntimeFuture<'a, ExitCode>;

    /// Whether the runtime reports the node as alive.
    ///
    /// `Ok(false)` means the node is absent or stopped; `Err` means the
    /// runtime could not answer.
    fn probe_status<'a>(&'a self, node_id: &'a str) -> RuntimeFuture<'a, bool>;
}
