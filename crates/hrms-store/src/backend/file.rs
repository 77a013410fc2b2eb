//! File-based repository backend for persistent storage
//!
//! Stores workflow instances in a JSON file keyed by instance id. Every save
//! and delete is written through immediately, so instances survive process
//! restarts and serverless cold starts.

use async_trait::async_trait;
use hrms_core::{HrmsError, HrmsResult, InstanceQuery, WorkflowInstance, WorkflowRepository};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// File-based repository
///
/// ## Example
///
/// ```rust,no_run
/// use hrms_store::FileRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = FileRepository::new("./var/workflows.json").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileRepository {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory copy of the file contents
    cache: Arc<RwLock<HashMap<String, WorkflowInstance>>>,
    /// Held from snapshot to rename so snapshots reach disk in order
    writer: Arc<Mutex<()>>,
}

impl FileRepository {
    /// Open a repository at `path`
    ///
    /// If the file exists, loads existing instances. Otherwise starts empty;
    /// the file is created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> HrmsResult<Self> {
        let path = path.into();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    HrmsError::store(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let cache: HashMap<String, WorkflowInstance> = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                HrmsError::store(format!("Failed to read store file {}: {}", path.display(), e))
            })?;

            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    HrmsError::store(format!(
                        "Failed to parse store file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), instances = cache.len(), "Opened workflow store");

        Ok(Self {
            path,
            cache: Arc::new(RwLock::new(cache)),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Persist current cache to file
    ///
    /// The snapshot is written to a sibling temp file and renamed over the
    /// store, so an interrupted write leaves the previous contents in place.
    async fn persist(&self) -> HrmsResult<()> {
        let _writer = self.writer.lock().await;
        let content = {
            let cache = self.cache.read().await;
            serde_json::to_string_pretty(&*cache)?
        };

        let staging = self.staging_path();
        tokio::fs::write(&staging, content).await.map_err(|e| {
            HrmsError::store(format!(
                "Failed to write store file {}: {}",
                staging.display(),
                e
            ))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            HrmsError::store(format!(
                "Failed to replace store file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

#[async_trait]
impl WorkflowRepository for FileRepository {
    async fn get(&self, id: &str) -> HrmsResult<Option<WorkflowInstance>> {
        Ok(self.cache.read().await.get(id).cloned())
    }

    async fn save(&self, instance: &WorkflowInstance) -> HrmsResult<()> {
        {
            let mut cache = self.cache.write().await;
            cache.insert(instance.id.clone(), instance.clone());
        }
        self.persist().await
    }

    async fn delete(&self, id: &str) -> HrmsResult<()> {
        {
            let mut cache = self.cache.write().await;
            cache.remove(id);
        }
        self.persist().await
    }

    async fn list(&self, query: &InstanceQuery) -> HrmsResult<Vec<WorkflowInstance>> {
        let cache = self.cache.read().await;
        let matched = cache
            .values()
            .filter(|instance| query.matches(instance))
            .cloned()
            .collect();
        Ok(query.finish(matched))
    }
}
