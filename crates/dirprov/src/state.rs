//! The on-disk directory the CLI works against.
//!
//! Each invocation loads a JSON snapshot into an in-memory directory,
//! runs one command through a fresh engine, and writes the snapshot back
//! if the command can have changed anything. Writes go to a sibling
//! temporary file first and are then renamed over the original.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dirprov_api::{DirectoryClient, MemoryDirectory, Snapshot};
use dirprov_core::{EngineConfig, Provisioning};
use tracing::debug;

use crate::error::CliError;

pub struct Session {
    path: PathBuf,
    directory: Arc<MemoryDirectory>,
    engine: Provisioning,
}

impl Session {
    /// Open the state file at `path`. A missing file is an empty directory.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self, CliError> {
        let directory = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| state_error(path, &e))?;
            let snapshot: Snapshot =
                serde_json::from_str(&raw).map_err(|e| state_error(path, &e))?;
            debug!(path = %path.display(), entries = snapshot.entries.len(), "state loaded");
            MemoryDirectory::from_snapshot(snapshot)
        } else {
            debug!(path = %path.display(), "no state file, starting empty");
            MemoryDirectory::new()
        };
        let directory = Arc::new(directory);
        let client: Arc<dyn DirectoryClient> = Arc::clone(&directory) as Arc<dyn DirectoryClient>;
        Ok(Self {
            path: path.to_path_buf(),
            engine: Provisioning::new(client, config),
            directory,
        })
    }

    pub fn engine(&self) -> &Provisioning {
        &self.engine
    }

    /// Persist the current directory contents.
    pub fn save(&self) -> Result<(), CliError> {
        let snapshot = self.directory.snapshot();
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| state_error(&self.path, &e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| state_error(&self.path, &e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| state_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| state_error(&self.path, &e))?;
        debug!(path = %self.path.display(), entries = snapshot.entries.len(), "state saved");
        Ok(())
    }
}

fn state_error(path: &Path, err: &impl std::fmt::Display) -> CliError {
    CliError::State {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
