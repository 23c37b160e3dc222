//! Per-filename async locks.
//!
//! Waiters queue FIFO on the file's mutex. Entries are dropped from the
//! table once no holder or waiter references them: on guard drop, and on
//! every acquire for entries left behind by cancelled waiters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Debug, Clone, Default)]
pub struct FileLocks {
    table: Arc<Mutex<LockTable>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for exclusive access to `filename`.
    pub async fn acquire(&self, filename: &str) -> FileLockGuard {
        let lock = {
            let mut table = self.table();
            table.retain(|name, lock| name == filename || Arc::strong_count(lock) > 1);
            table.entry(filename.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        FileLockGuard {
            filename: filename.to_string(),
            guard: Some(guard),
            locks: self.clone(),
        }
    }

    /// Filenames with a holder or waiter.
    pub fn active(&self) -> usize {
        self.table().len()
    }
}

/// Exclusive access to one filename until dropped.
#[derive(Debug)]
pub struct FileLockGuard {
    filename: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: FileLocks,
}

impl FileLockGuard {
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.locks.table();
        // New references are only handed out under the table lock, so a
        // count of one means nobody else holds or awaits this entry.
        if table
            .get(&self.filename)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.filename);
        }
    }
}
