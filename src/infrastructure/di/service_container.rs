//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::ThreadService;
use crate::config::Settings;
use crate::infrastructure::store::JsonFileStore;
use crate::infrastructure::traits::{EntryStore, FileSystem, RealFileSystem};
use crate::infrastructure::{InfraError, InfraResult};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Forum state storage
    pub store: Arc<dyn EntryStore>,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured snapshot file.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        fs.ensure_parent(&settings.snapshot_path).map_err(|e| {
            InfraError::io(
                format!("create directory for {}", settings.snapshot_path.display()),
                e,
            )
        })?;
        let store = Arc::new(JsonFileStore::new(settings.snapshot_path.clone(), fs.clone()));
        debug!("snapshot store at {}", settings.snapshot_path.display());
        Ok(Self::with_deps(settings, fs, store))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            store,
        }
    }

    pub fn thread_service(&self) -> ThreadService {
        ThreadService::new(self.store.clone(), self.settings.scoring)
    }
}
