//! Local staging area for file transfers.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fleet_core::FleetResult;

/// Factory for per-operation staging directories.
#[derive(Debug, Clone, Default)]
pub struct Staging {
    /// Parent for staging directories; the system temp dir when unset.
    root: Option<PathBuf>,
}

impl Staging {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Create a fresh, empty staging directory.
    ///
    /// The directory and everything in it are removed when the returned
    /// area is dropped.
    pub fn area(&self) -> FleetResult<StagingArea> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("fleet-stage-");
        let dir = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(StagingArea { dir })
    }
}

/// One operation's private staging directory.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Local path for a staged copy of `filename`.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }
}
