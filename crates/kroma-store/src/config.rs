//! Store configuration and backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clips::ClipStore;
use crate::credits::{CreditsLedger, CreditsService};
use crate::error::StoreResult;
use crate::file_repo::FileProjectRepository;
use crate::memory_repo::InMemoryProjectRepository;
use crate::repository::ProjectRepository;

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Some(StoreBackend::File),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::from_str(&value).unwrap_or_else(|| {
                warn!("Unknown STORE_BACKEND '{}', using file", value);
                StoreBackend::File
            }),
            Err(_) => StoreBackend::File,
        };

        Self {
            backend,
            data_dir: std::env::var("KROMA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// Open every store for the configured backend.
    pub async fn open(&self) -> StoreResult<Stores> {
        let stores = match self.backend {
            StoreBackend::File => Stores {
                projects: Arc::new(FileProjectRepository::open(&self.data_dir).await?),
                clips: Arc::new(ClipStore::open(&self.data_dir).await?),
                credits: Arc::new(CreditsLedger::open(&self.data_dir).await?),
            },
            StoreBackend::Memory => Stores::in_memory(),
        };

        info!(
            backend = stores.projects.backend(),
            data_dir = %self.data_dir.display(),
            "Opened stores"
        );
        Ok(stores)
    }
}

/// Handles to every store.
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<dyn ProjectRepository>,
    pub clips: Arc<ClipStore>,
    pub credits: Arc<dyn CreditsService>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            projects: Arc::new(InMemoryProjectRepository::new()),
            clips: Arc::new(ClipStore::in_memory()),
            credits: Arc::new(CreditsLedger::in_memory()),
        }
    }
}
