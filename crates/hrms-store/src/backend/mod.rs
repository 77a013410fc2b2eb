//! Repository backend selection

pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use hrms_core::{HrmsError, HrmsResult, StoreBackend, StoreConfig, WorkflowRepository};

use self::file::FileRepository;
use self::memory::InMemoryRepository;

/// Shared handle to whichever backend the host configured
pub struct WorkflowStore;

impl WorkflowStore {
    pub fn in_memory() -> Arc<dyn WorkflowRepository> {
        Arc::new(InMemoryRepository::new())
    }

    pub async fn file(path: impl Into<PathBuf>) -> HrmsResult<Arc<dyn WorkflowRepository>> {
        Ok(Arc::new(FileRepository::new(path).await?))
    }

    pub async fn from_config(config: &StoreConfig) -> HrmsResult<Arc<dyn WorkflowRepository>> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::File => {
                let path = config
                    .path
                    .clone()
                    .ok_or_else(|| HrmsError::config("File store backend requires a path"))?;
                Self::file(path).await
            }
        }
    }
}
