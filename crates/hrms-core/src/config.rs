// HRMS Core - Engine configuration
//
// Loaded from YAML. Every field has a default, so an empty file (or no file)
// yields the behavior the HRMS frontend has always observed.
//
// Example:
// ```yaml
// assignment: legacy
// notify: actor
// completionNotices: false
// store:
//   backend: file
//   path: ./var/workflows.json
// ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HrmsError, HrmsResult};

/// How `assigned_to` is recomputed after a transition
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Role hand-off from the step the instance sits on
    /// (employee -> operations -> hr -> admin)
    #[default]
    Legacy,
    /// Role that owns the step the instance waits on
    NextStep,
}

/// Who receives approval/rejection notifications
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Role of the step that was just acted on
    #[default]
    Actor,
    /// The employee who submitted the request
    Requester,
}

/// Repository backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// JSON file path, required for the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Workflow engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub assignment: AssignmentPolicy,

    #[serde(default)]
    pub notify: NotifyPolicy,

    /// Emit an extra completion notice to the requester when a workflow
    /// runs out of steps
    #[serde(default)]
    pub completion_notices: bool,

    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Parse from YAML, reporting the offending field path on failure
    pub fn from_yaml(content: &str) -> HrmsResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let deserializer = serde_yaml::Deserializer::from_str(content);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            HrmsError::config(format!("Invalid engine config at '{}': {}", e.path(), e.inner()))
        })
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> HrmsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HrmsError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        debug!(
            path = %path.display(),
            assignment = ?config.assignment,
            notify = ?config.notify,
            backend = ?config.store.backend,
            "Loaded engine config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> HrmsResult<()> {
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            return Err(HrmsError::config("File store backend requires a path"));
        }
        Ok(())
    }
}
