//! HRMS Store - Repository backends for workflow instances
//!
//! ## Backends
//!
//! - **InMemoryRepository**: concurrent map, cleared on restart
//! - **FileRepository**: JSON file, written through on every change
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hrms_store::WorkflowStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Ephemeral
//! let store = WorkflowStore::in_memory();
//!
//! // Survives restarts
//! let store = WorkflowStore::file("./var/workflows.json").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;

pub use backend::file::FileRepository;
pub use backend::memory::InMemoryRepository;
pub use backend::WorkflowStore;

pub use hrms_core::{InstanceQuery, WorkflowRepository};
