// HRMS Core - Foundation types and traits for the approval workflow engine
//
// This crate holds the static step tables for leave and salary advance
// requests, the runtime instance/history/notification records, and the
// repository trait that storage backends implement.

pub mod config;
pub mod error;
pub mod notification;
pub mod repository;
pub mod workflow;

// Re-export core types
pub use config::{AssignmentPolicy, EngineConfig, NotifyPolicy, StoreBackend, StoreConfig};
pub use error::{HrmsError, HrmsResult};
pub use notification::{NotificationEvent, NotificationType};
pub use repository::{InstanceQuery, WorkflowRepository};
pub use workflow::{
    RequestStatus, Role, StepAction, StepId, WorkflowDefinition, WorkflowHistoryEntry,
    WorkflowInstance, WorkflowStep, WorkflowType,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Actor recorded on history entries written by the engine itself
pub const SYSTEM_ACTOR: &str = "system";
