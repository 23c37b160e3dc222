//! fleet-storage — file operations routed onto storage nodes.
//!
//! The gateway never touches node storage directly. Every byte goes through
//! a local staging directory and a runtime copy:
//!
//! ```text
//! create(name, bytes)
//!   → reject if ownership[name] exists
//!   → LoadBalancer::select_node()
//!   → staging/<tmp>/name  ──copy_in──▶  node:/files/name
//!   → ownership[name] = (node, sha256(bytes))
//!
//! update(name, bytes)
//!   → ownership[name].node  ──copy_in──▶  node:/files/name
//!   → ownership[name].sha256 = sha256(bytes)
//!
//! read(name)
//!   → ownership[name]
//!   → node:/files/name  ──copy_out──▶  staging/<tmp>/name → bytes
//!   → sha256(bytes) must match
//!
//! delete(name)
//!   → ownership[name] → exec rm /files/name → forget name
//! ```
//!
//! The staging directory is removed on every exit path. Operations on the
//! same filename are serialized; unrelated files proceed concurrently.

pub mod gateway;
pub mod locks;
pub mod ownership;
pub mod staging;

pub use gateway::{StorageGateway, validate_filename};
pub use locks::{FileLockGuard, FileLocks};
pub use ownership::{OwnershipMap, StoredFile, content_digest};
pub use staging::{Staging, StagingArea};
