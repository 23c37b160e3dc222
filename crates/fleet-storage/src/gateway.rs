//! Create, read and delete files on storage nodes.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use fleet_core::{
    Actor, AuditAction, AuditEvent, FileOperation, FleetError, FleetResult, NodeId, SharedAudit,
};
use fleet_runtime::{ExitCode, Runtime, RuntimeCommand, RuntimeError, RuntimeResult};
use fleet_scheduler::LoadBalancer;
use fleet_state::NodeRegistry;

use crate::locks::FileLocks;
use crate::ownership::{OwnershipMap, content_digest};
use crate::staging::Staging;

/// Default in-node directory for stored files.
pub const DEFAULT_STORAGE_PATH: &str = "/files/";

/// Reject names that could escape the storage directory.
pub fn validate_filename(filename: &str) -> FleetResult<()> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if bad {
        return Err(FleetError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Routes file operations onto storage nodes through the runtime.
pub struct StorageGateway {
    registry: NodeRegistry,
    balancer: LoadBalancer,
    runtime: Runtime,
    audit: SharedAudit,
    staging: Staging,
    storage_path: String,
    owners: OwnershipMap,
    locks: FileLocks,
}

impl StorageGateway {
    pub fn new(registry: NodeRegistry, runtime: Runtime, audit: SharedAudit) -> Self {
        Self {
            balancer: LoadBalancer::new(registry.clone()),
            registry,
            runtime,
            audit,
            staging: Staging::default(),
            storage_path: DEFAULT_STORAGE_PATH.to_string(),
            owners: OwnershipMap::new(),
            locks: FileLocks::new(),
        }
    }

    /// In-node directory files are written to.
    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Parent directory for local staging areas.
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging = Staging::new(dir);
        self
    }

    pub fn owners(&self) -> &OwnershipMap {
        &self.owners
    }

    /// Path of `filename` inside a node.
    pub fn remote_path(&self, filename: &str) -> String {
        format!("{}/{filename}", self.storage_path.trim_end_matches('/'))
    }

    /// Store `content` as a new file `filename` on the next running node.
    ///
    /// Returns the node that now holds the file. Existing names are rejected;
    /// use [`StorageGateway::update`] to replace contents.
    pub async fn create(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        validate_filename(filename)?;
        let _guard = self.locks.acquire(filename).await;

        let result = self.create_locked(filename, content).await;
        match &result {
            Ok(node_id) => {
                info!(%filename, %node_id, bytes = content.len(), "file created");
                self.record(AuditAction::FileCreated, format!("{filename} on {node_id}"));
            }
            Err(e) => {
                warn!(%filename, error = %e, "file create failed");
                self.record(AuditAction::FileCreateFailed, format!("{filename}: {e}"));
            }
        }
        result
    }

    /// Fetch the contents of `filename` from the node that holds it.
    ///
    /// The bytes are checked against the digest recorded when the file was
    /// last written; a mismatch is a transfer failure.
    pub async fn read(&self, filename: &str) -> FleetResult<Vec<u8>> {
        validate_filename(filename)?;
        let _guard = self.locks.acquire(filename).await;

        let result = self.read_locked(filename).await;
        match &result {
            Ok(content) => {
                debug!(%filename, bytes = content.len(), "file read");
                self.record(AuditAction::FileRead, filename.to_string());
            }
            Err(e) => {
                warn!(%filename, error = %e, "file read failed");
                self.record(AuditAction::FileReadFailed, format!("{filename}: {e}"));
            }
        }
        result
    }

    /// Replace the contents of an existing file on the node that holds it.
    pub async fn update(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        validate_filename(filename)?;
        let _guard = self.locks.acquire(filename).await;

        let result = self.update_locked(filename, content).await;
        match &result {
            Ok(node_id) => {
                info!(%filename, %node_id, bytes = content.len(), "file updated");
                self.record(AuditAction::FileUpdated, format!("{filename} on {node_id}"));
            }
            Err(e) => {
                warn!(%filename, error = %e, "file update failed");
                self.record(AuditAction::FileUpdateFailed, format!("{filename}: {e}"));
            }
        }
        result
    }

    /// Remove `filename` from the node that holds it.
    pub async fn delete(&self, filename: &str) -> FleetResult<()> {
        validate_filename(filename)?;
        let _guard = self.locks.acquire(filename).await;

        let result = self.delete_locked(filename).await;
        match &result {
            Ok(node_id) => {
                info!(%filename, %node_id, "file deleted");
                self.record(AuditAction::FileDeleted, format!("{filename} on {node_id}"));
            }
            Err(e) => {
                warn!(%filename, error = %e, "file delete failed");
                self.record(AuditAction::FileDeleteFailed, format!("{filename}: {e}"));
            }
        }
        result.map(|_| ())
    }

    // ── Operations (caller holds the file lock) ────────────────────

    async fn create_locked(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        if self.owners.contains(filename) {
            return Err(FleetError::AlreadyExists(filename.to_string()));
        }
        let node_id = self.balancer.select_node()?;
        self.upload(&node_id, FileOperation::Create, filename, content)
            .await?;
        self.owners.record(filename, &node_id, content);
        Ok(node_id)
    }

    async fn read_locked(&self, filename: &str) -> FleetResult<Vec<u8>> {
        let node_id = self.running_owner(filename)?;
        let remote = self.remote_path(filename);

        let area = self.staging.area()?;
        let local = area.path_for(filename);
        match self.runtime.copy_out(&node_id, &remote, &local).await {
            Ok(code) if code.success() => {}
            // The runtime reports a missing remote file as a failed copy.
            Ok(code) => {
                debug!(%filename, %node_id, %code, "copy out failed");
                return Err(FleetError::NotFound(filename.to_string()));
            }
            Err(e) => check_transfer(&node_id, FileOperation::Read, filename, Err(e))?,
        }
        let content = tokio::fs::read(&local).await?;

        let expected = self.owners.get(filename).map(|f| f.sha256);
        let actual = content_digest(&content);
        if expected.as_deref().is_some_and(|d| d != actual) {
            return Err(FleetError::Transfer {
                node_id,
                operation: FileOperation::Read,
                filename: filename.to_string(),
                reason: format!("content digest mismatch (got sha256 {actual})"),
            });
        }
        Ok(content)
    }

    async fn update_locked(&self, filename: &str, content: &[u8]) -> FleetResult<NodeId> {
        let node_id = self.running_owner(filename)?;
        self.upload(&node_id, FileOperation::Update, filename, content)
            .await?;
        self.owners.record(filename, &node_id, content);
        Ok(node_id)
    }

    async fn delete_locked(&self, filename: &str) -> FleetResult<NodeId> {
        let node_id = self.running_owner(filename)?;
        let command = RuntimeCommand::Remove {
            path: self.remote_path(filename),
        };
        let removed = self.runtime.execute(&node_id, &command).await;
        check_transfer(&node_id, FileOperation::Delete, filename, removed)?;

        self.owners.forget(filename);
        Ok(node_id)
    }

    /// Owner of `filename`, provided it can currently serve traffic.
    fn running_owner(&self, filename: &str) -> FleetResult<NodeId> {
        let node_id = self
            .owners
            .owner(filename)
            .ok_or_else(|| FleetError::NotFound(filename.to_string()))?;
        let status = self.registry.get_status(&node_id)?;
        if !status.is_running() {
            debug!(%filename, %node_id, %status, "owning node is not running");
            return Err(FleetError::NoHealthyNode);
        }
        Ok(node_id)
    }

    /// Stage `content` locally and copy it onto `node_id`.
    async fn upload(
        &self,
        node_id: &str,
        operation: FileOperation,
        filename: &str,
        content: &[u8],
    ) -> FleetResult<()> {
        let area = self.staging.area()?;
        let local = area.path_for(filename);
        tokio::fs::write(&local, content).await?;
        let copied = self
            .runtime
            .copy_in(node_id, &local, &self.remote_path(filename))
            .await;
        check_transfer(node_id, operation, filename, copied)
    }

    fn record(&self, action: AuditAction, detail: String) {
        self.audit
            .record(AuditEvent::new(Actor::StorageGateway, action, detail));
    }
}

impl std::fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageGateway")
            .field("storage_path", &self.storage_path)
            .field("staging", &self.staging)
            .field("files", &self.owners.len())
            .finish_non_exhaustive()
    }
}

/// Map a runtime transfer outcome onto the fleet error taxonomy.
fn check_transfer(
    node_id: &str,
    operation: FileOperation,
    filename: &str,
    result: RuntimeResult<ExitCode>,
) -> FleetResult<()> {
    let reason = match result {
        Ok(code) if code.success() => return Ok(()),
        Ok(code) => code.to_string(),
        Err(RuntimeError::Timeout(after)) => {
            return Err(FleetError::Timeout {
                node_id: node_id.to_string(),
                after,
            });
        }
        Err(e) => e.to_string(),
    };
    Err(FleetError::Transfer {
        node_id: node_id.to_string(),
        operation,
        filename: filename.to_string(),
        reason,
    })
}
