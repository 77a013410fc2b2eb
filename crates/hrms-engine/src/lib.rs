//! HRMS Engine - Multi-step approval workflows
//!
//! Routes leave and salary advance requests through
//! Employee -> Operations -> HR -> Disbursement, recording an audit trail
//! and emitting in-session notifications.
//!
//! The engine holds no instance state of its own. Every operation loads the
//! instance from an injected [`hrms_core::WorkflowRepository`], applies the
//! transition and saves it back before returning an owned snapshot.

pub mod engine;
pub mod notification;

pub use engine::{Decision, Reconciliation, TransitionRefusal, WorkflowEngine};
pub use notification::NotificationCenter;

pub use hrms_core::{
    AssignmentPolicy, EngineConfig, HrmsError, HrmsResult, NotificationEvent, NotificationType,
    NotifyPolicy, RequestStatus, Role, StepAction, StepId, WorkflowInstance, WorkflowType,
};
