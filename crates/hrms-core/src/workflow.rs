// HRMS Core - Approval workflow types
//
// Static step sequences for leave and salary advance requests, plus the
// mutable instance record that tracks one request through its sequence.
// Each step carries the status an instance shows while parked on it, so the
// status mapping is derived from the sequence instead of kept beside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::AssignmentPolicy;
use crate::error::{HrmsError, HrmsResult};

/// Kind of request routed through a workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Leave request: operations decides directly
    Leave,
    /// Salary advance: operations forwards, HR decides, then disbursement
    SalaryAdvance,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::SalaryAdvance => "salary_advance",
        }
    }

    /// Static step sequence for this request type
    pub fn definition(&self) -> &'static WorkflowDefinition {
        WorkflowDefinition::for_type(*self)
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = HrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave" => Ok(Self::Leave),
            "salary_advance" | "salary-advance" => Ok(Self::SalaryAdvance),
            other => Err(HrmsError::workflow(format!("Unknown workflow type: {}", other))),
        }
    }
}

/// Actor category authorized to act at a step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Operations,
    Hr,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Operations => "operations",
            Self::Hr => "hr",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "operations" => Ok(Self::Operations),
            "hr" => Ok(Self::Hr),
            "admin" => Ok(Self::Admin),
            other => Err(HrmsError::workflow(format!("Unknown role: {}", other))),
        }
    }
}

/// Operation recorded against a step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Submit,
    Approve,
    Reject,
    Disburse,
    /// Operations hand-off that is not itself a decision
    Forward,
    /// Realignment with an authoritative persisted status
    Reconcile,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Disburse => "disburse",
            Self::Forward => "forward",
            Self::Reconcile => "reconcile",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step identifier; `Completed` stands for "no current step"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Submit,
    OpsReview,
    OpsForward,
    HrReview,
    Disburse,
    Completed,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::OpsReview => "ops_review",
            Self::OpsForward => "ops_forward",
            Self::HrReview => "hr_review",
            Self::Disburse => "disburse",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = HrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submit" => Ok(Self::Submit),
            "ops_review" => Ok(Self::OpsReview),
            "ops_forward" => Ok(Self::OpsForward),
            "hr_review" => Ok(Self::HrReview),
            "disburse" => Ok(Self::Disburse),
            "completed" => Ok(Self::Completed),
            other => Err(HrmsError::workflow(format!("Unknown step: {}", other))),
        }
    }
}

/// UI-facing request status. The literals are consumed as-is by badge
/// rendering and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingOps,
    PendingHr,
    Approved,
    Rejected,
    Disbursed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingOps => "pending_ops",
            Self::PendingHr => "pending_hr",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disbursed => "disbursed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = HrmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_ops" => Ok(Self::PendingOps),
            "pending_hr" => Ok(Self::PendingHr),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "disbursed" => Ok(Self::Disbursed),
            other => Err(HrmsError::workflow(format!("Unknown status: {}", other))),
        }
    }
}

/// One node in a request type's step sequence
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: StepId,
    pub name: &'static str,
    pub role: Role,
    pub action: StepAction,
    /// Absent on the terminal step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<StepId>,
    /// Status of an instance parked on this step
    pub status: RequestStatus,
}

/// Immutable step sequence for one request type
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub steps: &'static [WorkflowStep],
    /// Status once the sequence has run out
    pub completion_status: RequestStatus,
    /// Role hand-off table used by legacy assignment
    #[serde(skip)]
    handoffs: &'static [(Role, Role)],
}

static LEAVE_STEPS: [WorkflowStep; 2] = [
    WorkflowStep {
        id: StepId::Submit,
        name: "Submit Leave Request",
        role: Role::Employee,
        action: StepAction::Submit,
        next_step: Some(StepId::OpsReview),
        status: RequestStatus::PendingOps,
    },
    WorkflowStep {
        id: StepId::OpsReview,
        name: "Operations Manager Review",
        role: Role::Operations,
        action: StepAction::Approve,
        next_step: None,
        status: RequestStatus::PendingOps,
    },
];

static SALARY_ADVANCE_STEPS: [WorkflowStep; 4] = [
    WorkflowStep {
        id: StepId::Submit,
        name: "Submit Salary Advance Request",
        role: Role::Employee,
        action: StepAction::Submit,
        next_step: Some(StepId::OpsForward),
        status: RequestStatus::PendingOps,
    },
    WorkflowStep {
        id: StepId::OpsForward,
        name: "Operations Manager Forward",
        role: Role::Operations,
        action: StepAction::Approve,
        next_step: Some(StepId::HrReview),
        status: RequestStatus::PendingOps,
    },
    WorkflowStep {
        id: StepId::HrReview,
        name: "HR Review",
        role: Role::Hr,
        action: StepAction::Approve,
        next_step: Some(StepId::Disburse),
        status: RequestStatus::PendingHr,
    },
    WorkflowStep {
        id: StepId::Disburse,
        name: "Disbursement",
        role: Role::Hr,
        action: StepAction::Disburse,
        next_step: None,
        status: RequestStatus::Approved,
    },
];

static LEAVE: WorkflowDefinition = WorkflowDefinition {
    workflow_type: WorkflowType::Leave,
    steps: &LEAVE_STEPS,
    completion_status: RequestStatus::Approved,
    handoffs: &[(Role::Employee, Role::Operations)],
};

static SALARY_ADVANCE: WorkflowDefinition = WorkflowDefinition {
    workflow_type: WorkflowType::SalaryAdvance,
    steps: &SALARY_ADVANCE_STEPS,
    completion_status: RequestStatus::Disbursed,
    handoffs: &[
        (Role::Employee, Role::Operations),
        (Role::Operations, Role::Hr),
        (Role::Hr, Role::Admin),
    ],
};

impl WorkflowDefinition {
    pub fn for_type(workflow_type: WorkflowType) -> &'static WorkflowDefinition {
        match workflow_type {
            WorkflowType::Leave => &LEAVE,
            WorkflowType::SalaryAdvance => &SALARY_ADVANCE,
        }
    }

    /// Look up a step by id; `None` for `Completed` and foreign ids
    pub fn step(&self, id: StepId) -> Option<&'static WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Id of the step following `current`, or `None` if `current` is last
    pub fn next_step(&self, current: StepId) -> Option<StepId> {
        self.step(current).and_then(|s| s.next_step)
    }

    /// Step an instance parks on once its submission is recorded
    pub fn review_entry(&self) -> StepId {
        self.next_step(StepId::Submit).unwrap_or(StepId::Completed)
    }

    /// Status for an instance sitting at `id`. Ids outside this sequence
    /// fall back to `pending_ops`.
    pub fn status_for_step(&self, id: StepId) -> RequestStatus {
        if id == StepId::Completed {
            return self.completion_status;
        }
        self.step(id)
            .map(|s| s.status)
            .unwrap_or(RequestStatus::PendingOps)
    }

    /// Step an instance with the given persisted status sits on.
    /// `rejected` maps to the first review step; statuses this type never
    /// reaches map to `None`.
    pub fn step_for_status(&self, status: RequestStatus) -> Option<StepId> {
        if status == RequestStatus::Rejected {
            return Some(self.review_entry());
        }
        if status == self.completion_status {
            return Some(StepId::Completed);
        }
        self.steps
            .iter()
            .filter(|s| s.id != StepId::Submit)
            .find(|s| s.status == status)
            .map(|s| s.id)
    }

    /// Legacy hand-off: role that takes over from a step owned by `from`
    pub fn handoff(&self, from: Role) -> Option<Role> {
        self.handoffs
            .iter()
            .find(|(role, _)| *role == from)
            .map(|(_, to)| *to)
    }
}

/// Runtime record for one request's journey through its workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: String,

    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,

    /// Foreign key into the leave/salary advance store
    pub request_id: String,

    pub current_step: StepId,

    pub status: RequestStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Role>,

    /// Requester
    pub submitted_by: String,

    /// Branch the request belongs to, for branch-scoped listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Append-only, chronological
    #[serde(default)]
    pub history: Vec<WorkflowHistoryEntry>,
}

/// One immutable audit line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowHistoryEntry {
    pub step_id: StepId,
    pub action: StepAction,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub previous_status: RequestStatus,
    pub new_status: RequestStatus,
}

impl WorkflowInstance {
    /// Build the instance for a freshly submitted request.
    ///
    /// The submit entry is recorded and assignment evaluated while the
    /// instance is still at `submit`; the instance then parks on the first
    /// review step.
    pub fn submit(
        workflow_type: WorkflowType,
        request_id: impl Into<String>,
        submitted_by: impl Into<String>,
        assignment: AssignmentPolicy,
    ) -> Self {
        let request_id = request_id.into();
        let submitted_by = submitted_by.into();
        let definition = workflow_type.definition();
        let now = Utc::now();
        let initial_status = definition.status_for_step(StepId::Submit);

        let mut instance = Self {
            id: Self::generate_id(workflow_type, &request_id, now),
            workflow_type,
            request_id,
            current_step: StepId::Submit,
            status: initial_status,
            assigned_to: None,
            submitted_by: submitted_by.clone(),
            branch_id: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };

        instance.history.push(WorkflowHistoryEntry {
            step_id: StepId::Submit,
            action: StepAction::Submit,
            performed_by: submitted_by,
            performed_at: now,
            comments: None,
            previous_status: initial_status,
            new_status: initial_status,
        });

        if assignment == AssignmentPolicy::Legacy {
            instance.assign(assignment);
        }
        instance.current_step = definition.review_entry();
        if assignment == AssignmentPolicy::NextStep {
            instance.assign(assignment);
        }

        instance
    }

    /// Rebuild an instance from an authoritative persisted status.
    ///
    /// History holds a single reconcile entry since the real trail lives with
    /// the persisted record.
    pub fn restore(
        workflow_type: WorkflowType,
        request_id: impl Into<String>,
        status: RequestStatus,
        submitted_by: impl Into<String>,
        assignment: AssignmentPolicy,
    ) -> HrmsResult<Self> {
        let request_id = request_id.into();
        let definition = workflow_type.definition();
        let step = definition.step_for_status(status).ok_or_else(|| {
            HrmsError::workflow(format!(
                "Status '{}' is not reachable by {} workflows",
                status, workflow_type
            ))
        })?;
        let now = Utc::now();

        let mut instance = Self {
            id: Self::generate_id(workflow_type, &request_id, now),
            workflow_type,
            request_id,
            current_step: step,
            status,
            assigned_to: None,
            submitted_by: submitted_by.into(),
            branch_id: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };
        instance.history.push(WorkflowHistoryEntry {
            step_id: step,
            action: StepAction::Reconcile,
            performed_by: crate::SYSTEM_ACTOR.to_string(),
            performed_at: now,
            comments: None,
            previous_status: status,
            new_status: status,
        });
        if status != RequestStatus::Rejected {
            instance.assign(assignment);
        }

        Ok(instance)
    }

    /// Synthetic id: type, request id, creation millis, random suffix
    pub fn generate_id(workflow_type: WorkflowType, request_id: &str, at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}_{}",
            workflow_type.as_str(),
            request_id,
            at.timestamp_millis(),
            &suffix[..8]
        )
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn definition(&self) -> &'static WorkflowDefinition {
        self.workflow_type.definition()
    }

    /// Step definition the instance sits on; `None` once completed
    pub fn current_step(&self) -> Option<&'static WorkflowStep> {
        self.definition().step(self.current_step)
    }

    pub fn next_step(&self, current: StepId) -> Option<StepId> {
        self.definition().next_step(current)
    }

    pub fn is_completed(&self) -> bool {
        self.current_step == StepId::Completed
    }

    /// Recompute `assigned_to`.
    ///
    /// Legacy hands off from the role of the step the instance sits on
    /// (after HR review of a salary advance this yields `admin`, not the
    /// `hr`-owned disbursement step). NextStep assigns the role owning the
    /// current step.
    pub fn assign(&mut self, policy: AssignmentPolicy) {
        let definition = self.definition();
        self.assigned_to = match policy {
            AssignmentPolicy::Legacy => self
                .current_step()
                .and_then(|step| definition.handoff(step.role)),
            AssignmentPolicy::NextStep => self.current_step().map(|step| step.role),
        };
    }

    /// Move to the successor of the current step, recording `action`.
    /// Returns the new step id (`Completed` when the sequence ran out).
    pub fn advance(
        &mut self,
        action: StepAction,
        performed_by: impl Into<String>,
        comments: Option<String>,
        assignment: AssignmentPolicy,
    ) -> StepId {
        let acted_on = self.current_step;
        let next = self.next_step(acted_on);
        let target = next.unwrap_or(StepId::Completed);
        let new_status = self.definition().status_for_step(target);

        self.current_step = target;
        self.record(acted_on, action, performed_by.into(), comments, new_status);

        match assignment {
            AssignmentPolicy::Legacy if next.is_some() => self.assign(assignment),
            AssignmentPolicy::Legacy => {}
            AssignmentPolicy::NextStep => self.assign(assignment),
        }

        target
    }

    /// Mark the request rejected. The current step is left where it was.
    pub fn reject(&mut self, performed_by: impl Into<String>, comments: Option<String>) {
        let acted_on = self.current_step;
        self.record(
            acted_on,
            StepAction::Reject,
            performed_by.into(),
            comments,
            RequestStatus::Rejected,
        );
    }

    /// Align step and status with an authoritative persisted status.
    /// Returns `false` when already aligned.
    pub fn realign(
        &mut self,
        status: RequestStatus,
        performed_by: impl Into<String>,
        assignment: AssignmentPolicy,
    ) -> HrmsResult<bool> {
        if self.status == status {
            return Ok(false);
        }
        let step = self.definition().step_for_status(status).ok_or_else(|| {
            HrmsError::workflow(format!(
                "Status '{}' is not reachable by {} workflows",
                status, self.workflow_type
            ))
        })?;

        // Rejection never moves the step
        if status != RequestStatus::Rejected {
            self.current_step = step;
        }
        self.record(
            self.current_step,
            StepAction::Reconcile,
            performed_by.into(),
            None,
            status,
        );
        if status != RequestStatus::Rejected {
            self.assign(assignment);
        }
        Ok(true)
    }

    fn record(
        &mut self,
        step_id: StepId,
        action: StepAction,
        performed_by: String,
        comments: Option<String>,
        new_status: RequestStatus,
    ) {
        let now = Utc::now();
        let previous_status = std::mem::replace(&mut self.status, new_status);
        self.updated_at = now;
        self.history.push(WorkflowHistoryEntry {
            step_id,
            action,
            performed_by,
            performed_at: now,
            comments,
            previous_status,
            new_status,
        });
    }
}
