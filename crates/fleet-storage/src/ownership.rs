//! Which node holds which file, and what it should contain.
//!
//! Process-scoped: the map starts empty and is lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use fleet_core::NodeId;

/// Hex-encoded SHA-256 of `content`.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Where a file lives and the digest of the bytes last written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub node_id: NodeId,
    pub sha256: String,
}

#[derive(Debug, Default)]
pub struct OwnershipMap {
    files: Mutex<HashMap<String, StoredFile>>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, filename: &str) -> Option<StoredFile> {
        self.lock().get(filename).cloned()
    }

    pub fn owner(&self, filename: &str) -> Option<NodeId> {
        self.lock().get(filename).map(|f| f.node_id.clone())
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.lock().contains_key(filename)
    }

    /// Record `filename` as held by `node_id` with contents `content`.
    /// Returns the previous record, if any.
    pub fn record(&self, filename: &str, node_id: &str, content: &[u8]) -> Option<StoredFile> {
        let stored = StoredFile {
            node_id: node_id.to_string(),
            sha256: content_digest(content),
        };
        self.lock().insert(filename.to_string(), stored)
    }

    pub fn forget(&self, filename: &str) -> Option<StoredFile> {
        self.lock().remove(filename)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Files held by `node_id`, sorted.
    pub fn files_on(&self, node_id: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, stored)| stored.node_id == node_id)
            .map(|(name, _)| name.clone())
            .collect();
        files.sort();
        files
    }
}
