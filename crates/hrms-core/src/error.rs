//! Error types shared by every HRMS workflow crate

use thiserror::Error;

/// Result alias used across the workspace
pub type HrmsResult<T> = Result<T, HrmsError>;

/// Errors raised by the workflow engine and its storage backends
///
/// Refused transitions (unknown workflow, forward from a non-operations
/// step) are not errors: the engine reports them as `None`.
#[derive(Debug, Error)]
pub enum HrmsError {
    /// Repository read/write failure
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed workflow data (unknown status, inconsistent instance)
    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HrmsError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn workflow(msg: impl Into<String>) -> Self {
        Self::Workflow(msg.into())
    }
}
