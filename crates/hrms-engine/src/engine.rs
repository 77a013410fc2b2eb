//! Workflow Engine - approval state machine over a repository
//!
//! Creates workflow instances when a request is submitted, advances them
//! through the static step sequence of their request type, records history
//! and publishes notifications.
//!
//! Transitions on one workflow are serialized, so concurrent callers each
//! append exactly one history entry.
//!
//! Refused transitions keep the null-return contract the HRMS frontend
//! expects: `Ok(None)`, with the typed reason logged at debug level. `Err`
//! is reserved for repository failures.

use dashmap::DashMap;
use hrms_core::{
    AssignmentPolicy, EngineConfig, HrmsError, HrmsResult, InstanceQuery, NotificationEvent,
    NotificationType, NotifyPolicy, RequestStatus, Role, StepAction, StepId, WorkflowInstance,
    WorkflowRepository, WorkflowStep, WorkflowType,
};
use hrms_store::WorkflowStore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::notification::NotificationCenter;

/// Decision taken on the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn action(&self) -> StepAction {
        match self {
            Self::Approve => StepAction::Approve,
            Self::Reject => StepAction::Reject,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action().as_str())
    }
}

impl FromStr for Decision {
    type Err = HrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(HrmsError::workflow(format!("Unknown decision: {}", other))),
        }
    }
}

/// Why a transition was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionRefusal {
    #[error("workflow '{0}' not found")]
    UnknownWorkflow(String),

    /// The instance sits on `completed` or a step foreign to its type
    #[error("workflow '{workflow_id}' has no actionable step at '{step}'")]
    UnknownStep { workflow_id: String, step: StepId },

    #[error("workflow '{workflow_id}' is at a {role}-owned step; only operations may forward")]
    NotOperationsStep { workflow_id: String, role: Role },
}

/// Outcome of aligning an instance with a persisted request status
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No instance existed; one was rebuilt from the status
    Created(WorkflowInstance),
    /// The instance disagreed with the status and was realigned
    Realigned(WorkflowInstance),
    /// Already consistent
    Unchanged(WorkflowInstance),
}

impl Reconciliation {
    pub fn instance(&self) -> &WorkflowInstance {
        match self {
            Self::Created(i) | Self::Realigned(i) | Self::Unchanged(i) => i,
        }
    }

    pub fn into_instance(self) -> WorkflowInstance {
        match self {
            Self::Created(i) | Self::Realigned(i) | Self::Unchanged(i) => i,
        }
    }
}

/// Approval workflow engine
pub struct WorkflowEngine {
    repository: Arc<dyn WorkflowRepository>,
    notifications: NotificationCenter,
    config: EngineConfig,
    /// Read-modify-write guard per workflow id (and per request for reconcile)
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WorkflowEngine {
    /// Engine with default (legacy-compatible) policies
    pub fn new(repository: Arc<dyn WorkflowRepository>) -> Self {
        Self::with_config(repository, EngineConfig::default())
    }

    pub fn with_config(repository: Arc<dyn WorkflowRepository>, config: EngineConfig) -> Self {
        Self {
            repository,
            notifications: NotificationCenter::new(),
            config,
            locks: DashMap::new(),
        }
    }

    /// Build the configured repository and an engine on top of it
    pub async fn from_config(config: EngineConfig) -> HrmsResult<Self> {
        config.validate()?;
        let repository = WorkflowStore::from_config(&config.store).await?;
        Ok(Self::with_config(repository, config))
    }

    /// Forward every notification to `tx` as it is published
    pub fn with_notification_channel(mut self, tx: mpsc::Sender<NotificationEvent>) -> Self {
        self.notifications = self.notifications.with_event_channel(tx);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn repository(&self) -> &Arc<dyn WorkflowRepository> {
        &self.repository
    }

    fn assignment(&self) -> AssignmentPolicy {
        self.config.assignment
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Start the workflow for a newly submitted request
    pub async fn create_workflow(
        &self,
        workflow_type: WorkflowType,
        request_id: impl ToString,
        submitted_by: &str,
    ) -> HrmsResult<WorkflowInstance> {
        let instance = WorkflowInstance::submit(
            workflow_type,
            request_id.to_string(),
            submitted_by,
            self.assignment(),
        );
        self.store_created(instance).await
    }

    /// Start a workflow scoped to a branch
    pub async fn create_workflow_in_branch(
        &self,
        workflow_type: WorkflowType,
        request_id: impl ToString,
        submitted_by: &str,
        branch_id: &str,
    ) -> HrmsResult<WorkflowInstance> {
        let instance = WorkflowInstance::submit(
            workflow_type,
            request_id.to_string(),
            submitted_by,
            self.assignment(),
        )
        .with_branch(branch_id);
        self.store_created(instance).await
    }

    async fn store_created(&self, instance: WorkflowInstance) -> HrmsResult<WorkflowInstance> {
        self.repository.save(&instance).await?;
        info!(
            workflow = %instance.id,
            kind = %instance.workflow_type,
            request = %instance.request_id,
            assigned_to = ?instance.assigned_to,
            "Created workflow"
        );
        Ok(instance)
    }

    // ------------------------------------------------------------------
    // State machine lookups
    // ------------------------------------------------------------------

    pub fn get_current_step(&self, instance: &WorkflowInstance) -> Option<&'static WorkflowStep> {
        instance.current_step()
    }

    pub fn get_next_step(&self, instance: &WorkflowInstance, current: StepId) -> Option<StepId> {
        instance.next_step(current)
    }

    pub fn get_status_for_step(&self, workflow_type: WorkflowType, step: StepId) -> RequestStatus {
        workflow_type.definition().status_for_step(step)
    }

    /// Recompute `assigned_to` under the configured policy
    pub fn assign_to_next_role(&self, instance: &mut WorkflowInstance) {
        instance.assign(self.assignment());
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Approve or reject the step the workflow sits on.
    ///
    /// Approve moves to the next step (or `completed`). Reject sets status
    /// `rejected` and leaves the step unchanged. Publishes one approval or
    /// rejection notification.
    pub async fn progress_workflow(
        &self,
        workflow_id: &str,
        decision: Decision,
        performed_by: &str,
        comments: Option<&str>,
    ) -> HrmsResult<Option<WorkflowInstance>> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().await;
        let (mut instance, step) = match self.load_actionable(workflow_id).await? {
            Ok(found) => found,
            Err(refusal) => return Ok(self.refuse(refusal)),
        };
        let comments = comments.map(str::to_string);

        let notification_type = match decision {
            Decision::Approve => {
                instance.advance(
                    StepAction::Approve,
                    performed_by,
                    comments,
                    self.assignment(),
                );
                NotificationType::Approval
            }
            Decision::Reject => {
                instance.reject(performed_by, comments);
                NotificationType::Rejection
            }
        };

        self.repository.save(&instance).await?;
        info!(
            workflow = %instance.id,
            decision = %decision,
            by = performed_by,
            step = %instance.current_step,
            status = %instance.status,
            "Progressed workflow"
        );

        let recipient = match self.config.notify {
            NotifyPolicy::Actor => step.role,
            NotifyPolicy::Requester => Role::Employee,
        };
        let (title, verb) = match notification_type {
            NotificationType::Rejection => ("Request Rejected", "rejected"),
            _ => ("Request Approved", "approved"),
        };
        self.notifications
            .publish(NotificationEvent::new(
                notification_type,
                &instance.id,
                recipient,
                title,
                format!(
                    "{} request {} was {} by {} at {}",
                    display_type(instance.workflow_type),
                    instance.request_id,
                    verb,
                    performed_by,
                    step.name
                ),
            ))
            .await;
        self.publish_completion(&instance).await;

        Ok(Some(instance))
    }

    /// Operations hand-off: advance without deciding.
    ///
    /// Only valid while the workflow sits on an operations-owned step.
    /// Publishes one assignment notification to the role now owning the
    /// workflow (the requester if the sequence ran out).
    pub async fn forward_workflow(
        &self,
        workflow_id: &str,
        performed_by: &str,
        comments: Option<&str>,
    ) -> HrmsResult<Option<WorkflowInstance>> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().await;
        let (mut instance, step) = match self.load_actionable(workflow_id).await? {
            Ok(found) => found,
            Err(refusal) => return Ok(self.refuse(refusal)),
        };
        if let Err(refusal) = check_forward(workflow_id, step) {
            return Ok(self.refuse(refusal));
        }

        instance.advance(
            StepAction::Forward,
            performed_by,
            comments.map(str::to_string),
            self.assignment(),
        );
        self.repository.save(&instance).await?;
        info!(
            workflow = %instance.id,
            by = performed_by,
            step = %instance.current_step,
            status = %instance.status,
            "Forwarded workflow"
        );

        let recipient = instance
            .current_step()
            .map(|s| s.role)
            .unwrap_or(Role::Employee);
        let message = match instance.current_step() {
            Some(next) => format!(
                "{} request {} forwarded by {} for {}",
                display_type(instance.workflow_type),
                instance.request_id,
                performed_by,
                next.name
            ),
            None => format!(
                "{} request {} forwarded by {} and completed",
                display_type(instance.workflow_type),
                instance.request_id,
                performed_by
            ),
        };
        self.notifications
            .publish(NotificationEvent::new(
                NotificationType::Assignment,
                &instance.id,
                recipient,
                "New Assignment",
                message,
            ))
            .await;
        self.publish_completion(&instance).await;

        Ok(Some(instance))
    }

    async fn publish_completion(&self, instance: &WorkflowInstance) {
        if !self.config.completion_notices || !instance.is_completed() {
            return;
        }
        self.notifications
            .publish(NotificationEvent::new(
                NotificationType::Completion,
                &instance.id,
                Role::Employee,
                "Request Completed",
                format!(
                    "{} request {} is {}",
                    display_type(instance.workflow_type),
                    instance.request_id,
                    instance.status
                ),
            ))
            .await;
    }

    /// Load an instance together with the step it can be acted on at
    async fn load_actionable(
        &self,
        workflow_id: &str,
    ) -> HrmsResult<Result<(WorkflowInstance, &'static WorkflowStep), TransitionRefusal>> {
        let instance = match self.repository.get(workflow_id).await? {
            Some(instance) => instance,
            None => {
                return Ok(Err(TransitionRefusal::UnknownWorkflow(
                    workflow_id.to_string(),
                )))
            }
        };
        Ok(match instance.current_step() {
            Some(step) => Ok((instance, step)),
            None => Err(TransitionRefusal::UnknownStep {
                workflow_id: workflow_id.to_string(),
                step: instance.current_step,
            }),
        })
    }

    /// Reason a progress (or, with `forward`, a forward) call on
    /// `workflow_id` would currently be refused
    pub async fn refusal_for(
        &self,
        workflow_id: &str,
        forward: bool,
    ) -> HrmsResult<Option<TransitionRefusal>> {
        Ok(match self.load_actionable(workflow_id).await? {
            Err(refusal) => Some(refusal),
            Ok((_, step)) if forward => check_forward(workflow_id, step).err(),
            Ok(_) => None,
        })
    }

    fn refuse(&self, refusal: TransitionRefusal) -> Option<WorkflowInstance> {
        debug!("Transition refused: {}", refusal);
        None
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Align the workflow for a request with its authoritative persisted
    /// status, rebuilding the instance if none exists.
    pub async fn reconcile(
        &self,
        workflow_type: WorkflowType,
        request_id: impl ToString,
        persisted_status: RequestStatus,
        submitted_by: &str,
    ) -> HrmsResult<Reconciliation> {
        let request_id = request_id.to_string();
        let request_lock = self.lock_for(&format!("request:{}:{}", workflow_type, request_id));
        let _request_guard = request_lock.lock().await;
        let existing = self
            .repository
            .find_by_request(workflow_type, &request_id)
            .await?;
        match existing {
            None => {
                let instance = WorkflowInstance::restore(
                    workflow_type,
                    request_id,
                    persisted_status,
                    submitted_by,
                    self.assignment(),
                )?;
                self.repository.save(&instance).await?;
                info!(workflow = %instance.id, status = %persisted_status, "Restored workflow");
                Ok(Reconciliation::Created(instance))
            }
            Some(found) => {
                let lock = self.lock_for(&found.id);
                let _guard = lock.lock().await;
                // Re-read under the workflow lock; a transition may have landed
                let current = self.repository.get(&found.id).await?;
                let mut instance = current.unwrap_or(found);
                let previous = instance.status;
                if instance.realign(persisted_status, hrms_core::SYSTEM_ACTOR, self.assignment())? {
                    self.repository.save(&instance).await?;
                    info!(
                        workflow = %instance.id,
                        from = %previous,
                        to = %persisted_status,
                        "Realigned workflow with persisted status"
                    );
                    Ok(Reconciliation::Realigned(instance))
                } else {
                    Ok(Reconciliation::Unchanged(instance))
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get_workflow(&self, workflow_id: &str) -> HrmsResult<Option<WorkflowInstance>> {
        self.repository.get(workflow_id).await
    }

    pub async fn find_by_request(
        &self,
        workflow_type: WorkflowType,
        request_id: impl ToString,
    ) -> HrmsResult<Option<WorkflowInstance>> {
        self.repository
            .find_by_request(workflow_type, &request_id.to_string())
            .await
    }

    pub async fn list_workflows(&self, query: &InstanceQuery) -> HrmsResult<Vec<WorkflowInstance>> {
        self.repository.list(query).await
    }

    /// Workflows currently assigned to `role`, optionally within one branch
    pub async fn pending_for_role(
        &self,
        role: Role,
        branch_id: Option<&str>,
    ) -> HrmsResult<Vec<WorkflowInstance>> {
        let mut query = InstanceQuery::for_role(role);
        if let Some(branch_id) = branch_id {
            query = query.with_branch(branch_id);
        }
        self.repository.list(&query).await
    }

    pub async fn get_notifications_by_role(&self, role: Role) -> Vec<NotificationEvent> {
        self.notifications.by_role(role).await
    }
}

fn check_forward(workflow_id: &str, step: &WorkflowStep) -> Result<(), TransitionRefusal> {
    if step.role == Role::Operations {
        Ok(())
    } else {
        Err(TransitionRefusal::NotOperationsStep {
            workflow_id: workflow_id.to_string(),
            role: step.role,
        })
    }
}

fn display_type(workflow_type: WorkflowType) -> &'static str {
    match workflow_type {
        WorkflowType::Leave => "Leave",
        WorkflowType::SalaryAdvance => "Salary advance",
    }
}
