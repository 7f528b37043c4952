//! Entry store implementations: a JSON file and an in-memory store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};

use crate::application::snapshot::Snapshot;
use crate::infrastructure::traits::{staging_path, EntryStore, FileSystem};

/// Forum state kept as one pretty-printed JSON document.
pub struct JsonFileStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }
}

impl EntryStore for JsonFileStore {
    fn location(&self) -> &Path {
        &self.path
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> io::Result<Snapshot> {
        if !self.fs.exists(&self.path) {
            debug!("no snapshot yet, starting empty");
            return Ok(Snapshot::default());
        }
        let content = self.fs.read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    #[instrument(level = "debug", skip(self, snapshot), fields(path = %self.path.display()))]
    fn save(&self, snapshot: &Snapshot) -> io::Result<()> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fs.ensure_parent(&self.path)?;
        // Write aside, then rename over the live file
        let staging = staging_path(&self.path);
        self.fs.write(&staging, &content)?;
        self.fs.rename(&staging, &self.path)
    }
}

/// Store that never touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl EntryStore for MemoryStore {
    fn location(&self) -> &Path {
        Path::new("<memory>")
    }

    fn load(&self) -> io::Result<Snapshot> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))
    }

    fn save(&self, snapshot: &Snapshot) -> io::Result<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))?;
        *guard = snapshot.clone();
        Ok(())
    }
}
