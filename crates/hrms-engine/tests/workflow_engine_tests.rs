//! Workflow Engine Integration Tests
//!
//! Drives leave and salary advance requests end to end through the engine
//! and verifies:
//! - status derivation and step sequencing
//! - history chaining and notification counts
//! - forward restrictions and null-return refusals
//! - assignment/notification policies
//! - reconciliation against persisted statuses and file-backed persistence

use std::sync::Arc;

use async_trait::async_trait;
use hrms_core::{InstanceQuery, WorkflowRepository};
use hrms_engine::{
    AssignmentPolicy, Decision, EngineConfig, HrmsError, HrmsResult, NotificationType,
    NotifyPolicy, Reconciliation, RequestStatus, Role, StepAction, StepId, WorkflowEngine,
    WorkflowInstance, WorkflowType,
};
use hrms_store::{FileRepository, InMemoryRepository};

fn create_engine() -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(InMemoryRepository::new()))
}

fn create_engine_with(config: EngineConfig) -> WorkflowEngine {
    WorkflowEngine::with_config(Arc::new(InMemoryRepository::new()), config)
}

async fn total_notifications(engine: &WorkflowEngine) -> usize {
    let mut total = 0;
    for role in [Role::Employee, Role::Operations, Role::Hr, Role::Admin] {
        total += engine.get_notifications_by_role(role).await.len();
    }
    total
}

fn assert_history_chained(instance: &WorkflowInstance) {
    for pair in instance.history.windows(2) {
        assert_eq!(pair[1].previous_status, pair[0].new_status);
    }
    assert_eq!(
        instance.history.last().map(|e| e.new_status),
        Some(instance.status)
    );
}

// ============================================================================
// Status derivation and sequencing
// ============================================================================

#[test]
fn test_status_for_reachable_steps() {
    let engine = create_engine();
    let cases = [
        (WorkflowType::Leave, StepId::OpsReview, RequestStatus::PendingOps),
        (WorkflowType::Leave, StepId::Completed, RequestStatus::Approved),
        (WorkflowType::SalaryAdvance, StepId::OpsForward, RequestStatus::PendingOps),
        (WorkflowType::SalaryAdvance, StepId::HrReview, RequestStatus::PendingHr),
        (WorkflowType::SalaryAdvance, StepId::Disburse, RequestStatus::Approved),
        (WorkflowType::SalaryAdvance, StepId::Completed, RequestStatus::Disbursed),
    ];
    for (workflow_type, step, expected) in cases {
        assert_eq!(
            engine.get_status_for_step(workflow_type, step),
            expected,
            "{} at {}",
            workflow_type,
            step
        );
    }
}

#[tokio::test]
async fn test_terminal_steps_have_no_successor() {
    let engine = create_engine();
    let leave = engine
        .create_workflow(WorkflowType::Leave, 1, "alice")
        .await
        .unwrap();
    let advance = engine
        .create_workflow(WorkflowType::SalaryAdvance, 2, "carol")
        .await
        .unwrap();

    assert_eq!(engine.get_next_step(&leave, StepId::OpsReview), None);
    assert_eq!(engine.get_next_step(&advance, StepId::Disburse), None);
    assert_eq!(
        engine.get_next_step(&advance, StepId::OpsForward),
        Some(StepId::HrReview)
    );
}

#[tokio::test]
async fn test_create_workflow() {
    let engine = create_engine();
    let instance = engine
        .create_workflow(WorkflowType::Leave, 101, "alice")
        .await
        .unwrap();

    assert_eq!(instance.status, RequestStatus::PendingOps);
    assert_eq!(instance.current_step, StepId::OpsReview);
    assert_eq!(instance.assigned_to, Some(Role::Operations));
    assert_eq!(instance.request_id, "101");
    assert_eq!(instance.submitted_by, "alice");
    assert_eq!(instance.history.len(), 1);
    assert_eq!(instance.history[0].action, StepAction::Submit);
    assert_eq!(instance.history[0].performed_by, "alice");

    let step = engine.get_current_step(&instance).unwrap();
    assert_eq!(step.role, Role::Operations);

    let stored = engine.get_workflow(&instance.id).await.unwrap();
    assert_eq!(stored, Some(instance));
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_leave_happy_path() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::Leave, 101, "alice")
        .await
        .unwrap();

    let approved = engine
        .progress_workflow(&created.id, Decision::Approve, "ops_mgr_bob", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.current_step, StepId::Completed);
    assert_eq!(approved.history.len(), 2);
    assert_eq!(approved.history[1].action, StepAction::Approve);
    assert_eq!(approved.history[1].step_id, StepId::OpsReview);
    assert_history_chained(&approved);
    // Legacy assignment is not recomputed once the sequence runs out
    assert_eq!(approved.assigned_to, Some(Role::Operations));
}

#[tokio::test]
async fn test_leave_rejection() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::Leave, 101, "alice")
        .await
        .unwrap();

    let rejected = engine
        .progress_workflow(
            &created.id,
            Decision::Reject,
            "ops_mgr_bob",
            Some("insufficient balance"),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.current_step, created.current_step);
    assert_eq!(
        rejected.history[1].comments.as_deref(),
        Some("insufficient balance")
    );
    assert_history_chained(&rejected);
}

#[tokio::test]
async fn test_salary_advance_full_chain() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    assert_eq!(created.current_step, StepId::OpsForward);

    let forwarded = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.status, RequestStatus::PendingHr);
    assert_eq!(forwarded.current_step, StepId::HrReview);
    assert_eq!(forwarded.history[1].action, StepAction::Forward);

    let approved = engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.current_step, StepId::Disburse);

    let disbursed = engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(disbursed.status, RequestStatus::Disbursed);
    assert_eq!(disbursed.current_step, StepId::Completed);
    assert_eq!(disbursed.history.len(), 4);
    assert_history_chained(&disbursed);
}

// ============================================================================
// History and notification properties
// ============================================================================

#[tokio::test]
async fn test_history_grows_by_one_per_transition() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 9, "carol")
        .await
        .unwrap();

    let mut expected_len = created.history.len();
    let forwarded = engine
        .forward_workflow(&created.id, "ops", Some("looks fine"))
        .await
        .unwrap()
        .unwrap();
    expected_len += 1;
    assert_eq!(forwarded.history.len(), expected_len);

    let rejected = engine
        .progress_workflow(&created.id, Decision::Reject, "hr", Some("cap exceeded"))
        .await
        .unwrap()
        .unwrap();
    expected_len += 1;
    assert_eq!(rejected.history.len(), expected_len);
    assert_history_chained(&rejected);
}

#[tokio::test]
async fn test_one_notification_per_transition() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    assert_eq!(total_notifications(&engine).await, 0);

    engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total_notifications(&engine).await, 1);

    engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total_notifications(&engine).await, 2);

    engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total_notifications(&engine).await, 3);

    // Refused calls publish nothing
    engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap();
    assert_eq!(total_notifications(&engine).await, 3);
}

#[tokio::test]
async fn test_notification_recipients_default_to_actor_role() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();

    engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap();
    let hr = engine.get_notifications_by_role(Role::Hr).await;
    assert_eq!(hr.len(), 1);
    assert_eq!(hr[0].notification_type, NotificationType::Assignment);
    assert_eq!(hr[0].workflow_id, created.id);

    engine
        .progress_workflow(&created.id, Decision::Reject, "hr_dana", None)
        .await
        .unwrap();
    // The role that acted is notified, not the requester
    let hr = engine.get_notifications_by_role(Role::Hr).await;
    assert_eq!(hr.len(), 2);
    assert_eq!(hr[1].notification_type, NotificationType::Rejection);
    assert!(engine
        .get_notifications_by_role(Role::Employee)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_requester_notify_policy() {
    let engine = create_engine_with(EngineConfig {
        notify: NotifyPolicy::Requester,
        ..Default::default()
    });
    let created = engine
        .create_workflow(WorkflowType::Leave, 3, "alice")
        .await
        .unwrap();
    engine
        .progress_workflow(&created.id, Decision::Approve, "bob", None)
        .await
        .unwrap();

    let employee = engine.get_notifications_by_role(Role::Employee).await;
    assert_eq!(employee.len(), 1);
    assert_eq!(employee[0].notification_type, NotificationType::Approval);
    assert!(engine
        .get_notifications_by_role(Role::Operations)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_completion_notices() {
    let engine = create_engine_with(EngineConfig {
        completion_notices: true,
        ..Default::default()
    });
    let created = engine
        .create_workflow(WorkflowType::Leave, 4, "alice")
        .await
        .unwrap();
    engine
        .progress_workflow(&created.id, Decision::Approve, "bob", None)
        .await
        .unwrap();

    let employee = engine.get_notifications_by_role(Role::Employee).await;
    assert_eq!(employee.len(), 1);
    assert_eq!(employee[0].notification_type, NotificationType::Completion);
    assert_eq!(total_notifications(&engine).await, 2);
}

#[tokio::test]
async fn test_notification_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let engine = create_engine().with_notification_channel(tx);
    let created = engine
        .create_workflow(WorkflowType::Leave, 5, "alice")
        .await
        .unwrap();
    engine
        .progress_workflow(&created.id, Decision::Approve, "bob", None)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.notification_type, NotificationType::Approval);
    assert_eq!(event.recipient_role, Role::Operations);
}

// ============================================================================
// Forward restrictions and refusals
// ============================================================================

#[tokio::test]
async fn test_forward_restricted_to_operations() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    let at_hr = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    let before = total_notifications(&engine).await;

    let refused = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap();
    assert!(refused.is_none());

    let stored = engine.get_workflow(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.updated_at, at_hr.updated_at);
    assert_eq!(stored.history.len(), at_hr.history.len());
    assert_eq!(total_notifications(&engine).await, before);
}

#[tokio::test]
async fn test_forward_on_leave_completes() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::Leave, 6, "alice")
        .await
        .unwrap();

    let forwarded = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.status, RequestStatus::Approved);
    assert!(forwarded.is_completed());

    // Nobody owns a completed workflow, the requester hears about it
    let employee = engine.get_notifications_by_role(Role::Employee).await;
    assert_eq!(employee.len(), 1);
    assert_eq!(employee[0].notification_type, NotificationType::Assignment);
}

#[tokio::test]
async fn test_unknown_workflow_returns_none() {
    let engine = create_engine();
    assert!(engine
        .progress_workflow("leave_0_0_deadbeef", Decision::Reject, "bob", None)
        .await
        .unwrap()
        .is_none());
    assert!(engine
        .forward_workflow("leave_0_0_deadbeef", "bob", None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_rejected_workflow_can_still_be_approved() {
    // Rejection does not advance the step, so the step stays actionable
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::Leave, 7, "alice")
        .await
        .unwrap();
    engine
        .progress_workflow(&created.id, Decision::Reject, "bob", None)
        .await
        .unwrap()
        .unwrap();
    let approved = engine
        .progress_workflow(&created.id, Decision::Approve, "bob", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.history[2].previous_status, RequestStatus::Rejected);
}

// ============================================================================
// Assignment policies
// ============================================================================

#[tokio::test]
async fn test_legacy_assignment_hands_off_to_admin() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    assert_eq!(created.assigned_to, Some(Role::Operations));

    let forwarded = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.assigned_to, Some(Role::Admin));

    let approved = engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.current_step().unwrap().role, Role::Hr);
    assert_eq!(approved.assigned_to, Some(Role::Admin));
}

#[tokio::test]
async fn test_next_step_assignment_policy() {
    let engine = create_engine_with(EngineConfig {
        assignment: AssignmentPolicy::NextStep,
        ..Default::default()
    });
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    assert_eq!(created.assigned_to, Some(Role::Operations));

    let forwarded = engine
        .forward_workflow(&created.id, "ops_mgr", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.assigned_to, Some(Role::Hr));

    let approved = engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.assigned_to, Some(Role::Hr));

    let done = engine
        .progress_workflow(&created.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.assigned_to, None);
}

#[tokio::test]
async fn test_assign_to_next_role() {
    let engine = create_engine();
    let mut instance = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    // Parked on ops_forward: operations hands off to hr
    engine.assign_to_next_role(&mut instance);
    assert_eq!(instance.assigned_to, Some(Role::Hr));
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_pending_for_role_with_branch() {
    let engine = create_engine_with(EngineConfig {
        assignment: AssignmentPolicy::NextStep,
        ..Default::default()
    });
    let north = engine
        .create_workflow_in_branch(WorkflowType::Leave, 1, "alice", "north")
        .await
        .unwrap();
    engine
        .create_workflow_in_branch(WorkflowType::Leave, 2, "erin", "south")
        .await
        .unwrap();
    let advance = engine
        .create_workflow_in_branch(WorkflowType::SalaryAdvance, 3, "carol", "north")
        .await
        .unwrap();
    engine
        .forward_workflow(&advance.id, "ops_mgr", None)
        .await
        .unwrap();

    let ops_all = engine.pending_for_role(Role::Operations, None).await.unwrap();
    assert_eq!(ops_all.len(), 2);

    let ops_north = engine
        .pending_for_role(Role::Operations, Some("north"))
        .await
        .unwrap();
    assert_eq!(ops_north.len(), 1);
    assert_eq!(ops_north[0].id, north.id);

    let hr_north = engine.pending_for_role(Role::Hr, Some("north")).await.unwrap();
    assert_eq!(hr_north.len(), 1);
    assert_eq!(hr_north[0].id, advance.id);
}

#[tokio::test]
async fn test_list_and_find_by_request() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 77, "carol")
        .await
        .unwrap();

    let found = engine
        .find_by_request(WorkflowType::SalaryAdvance, 77)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert!(engine
        .find_by_request(WorkflowType::Leave, 77)
        .await
        .unwrap()
        .is_none());

    let listed = engine
        .list_workflows(&InstanceQuery::default().with_status(RequestStatus::PendingOps))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_reconcile_restores_missing_instance() {
    let engine = create_engine();
    let outcome = engine
        .reconcile(WorkflowType::SalaryAdvance, 88, RequestStatus::PendingHr, "carol")
        .await
        .unwrap();

    let instance = match outcome {
        Reconciliation::Created(instance) => instance,
        other => panic!("expected Created, got {:?}", other),
    };
    assert_eq!(instance.current_step, StepId::HrReview);
    assert_eq!(instance.status, RequestStatus::PendingHr);

    // The restored instance is actionable
    let approved = engine
        .progress_workflow(&instance.id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.current_step, StepId::Disburse);
}

#[tokio::test]
async fn test_reconcile_realigns_diverged_instance() {
    let engine = create_engine();
    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();

    // Database moved on without the engine
    let outcome = engine
        .reconcile(WorkflowType::SalaryAdvance, 55, RequestStatus::Approved, "carol")
        .await
        .unwrap();
    let instance = match outcome {
        Reconciliation::Realigned(instance) => instance,
        other => panic!("expected Realigned, got {:?}", other),
    };
    assert_eq!(instance.id, created.id);
    assert_eq!(instance.current_step, StepId::Disburse);
    assert_eq!(instance.status, RequestStatus::Approved);
    let last = instance.history.last().unwrap();
    assert_eq!(last.action, StepAction::Reconcile);
    assert_eq!(last.performed_by, "system");
    assert_history_chained(&instance);

    let again = engine
        .reconcile(WorkflowType::SalaryAdvance, 55, RequestStatus::Approved, "carol")
        .await
        .unwrap();
    assert!(matches!(again, Reconciliation::Unchanged(_)));
    assert_eq!(again.instance().history.len(), instance.history.len());
}

#[tokio::test]
async fn test_reconcile_unreachable_status() {
    let engine = create_engine();
    let err = engine
        .reconcile(WorkflowType::Leave, 1, RequestStatus::PendingHr, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, HrmsError::Workflow(_)));
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_state_survives_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflows.json");

    let workflow_id = {
        let repo = Arc::new(FileRepository::new(&path).await.unwrap());
        let engine = WorkflowEngine::new(repo);
        let created = engine
            .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
            .await
            .unwrap();
        engine
            .forward_workflow(&created.id, "ops_mgr", None)
            .await
            .unwrap()
            .unwrap();
        created.id
    };

    let repo = Arc::new(FileRepository::new(&path).await.unwrap());
    let engine = WorkflowEngine::new(repo);
    let approved = engine
        .progress_workflow(&workflow_id, Decision::Approve, "hr_dana", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.history.len(), 3);
}

#[tokio::test]
async fn test_from_config_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        "store:\n  backend: file\n  path: {}\n",
        dir.path().join("wf.json").display()
    );
    let config = EngineConfig::from_yaml(&yaml).unwrap();
    let engine = WorkflowEngine::from_config(config).await.unwrap();
    engine
        .create_workflow(WorkflowType::Leave, 1, "alice")
        .await
        .unwrap();
    assert!(dir.path().join("wf.json").exists());
}

// ============================================================================
// Concurrent transitions
// ============================================================================

const CALLERS: usize = 8;

/// Run `CALLERS` copies of `call` released together, returning the results
async fn race<F, Fut, T>(call: F) -> Vec<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let barrier = barrier.clone();
            let fut = call();
            tokio::spawn(async move {
                barrier.wait().await;
                fut.await
            })
        })
        .collect();
    let mut results = Vec::with_capacity(CALLERS);
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rejects_each_record_history() {
    let engine = Arc::new(create_engine());

    for round in 0..50 {
        let created = engine
            .create_workflow(WorkflowType::Leave, round, "alice")
            .await
            .unwrap();
        let id = created.id.clone();

        let results = race(|| {
            let engine = engine.clone();
            let id = id.clone();
            async move {
                engine
                    .progress_workflow(&id, Decision::Reject, "ops_mgr", None)
                    .await
            }
        })
        .await;
        let succeeded = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();
        assert_eq!(succeeded, CALLERS);

        let stored = engine.get_workflow(&id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 1 + CALLERS, "round {}", round);
        assert_history_chained(&stored);

        let published = engine
            .notifications()
            .all()
            .await
            .into_iter()
            .filter(|n| n.workflow_id == id)
            .count();
        assert_eq!(published, CALLERS);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_complete_once() {
    let engine = Arc::new(create_engine());
    let created = engine
        .create_workflow(WorkflowType::Leave, 101, "alice")
        .await
        .unwrap();
    let id = created.id.clone();

    let results = race(|| {
        let engine = engine.clone();
        let id = id.clone();
        async move {
            engine
                .progress_workflow(&id, Decision::Approve, "ops_mgr", None)
                .await
        }
    })
    .await;

    let approved: Vec<_> = results.into_iter().filter_map(|r| r.unwrap()).collect();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].status, RequestStatus::Approved);

    let stored = engine.get_workflow(&id).await.unwrap().unwrap();
    assert_eq!(stored.history.len(), 2);
    assert_eq!(total_notifications(&engine).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_forwards_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflows.json");
    let repository = Arc::new(FileRepository::new(&path).await.unwrap());
    let engine = Arc::new(WorkflowEngine::new(repository));

    let created = engine
        .create_workflow(WorkflowType::SalaryAdvance, 55, "carol")
        .await
        .unwrap();
    let id = created.id.clone();

    let results = race(|| {
        let engine = engine.clone();
        let id = id.clone();
        async move { engine.forward_workflow(&id, "ops_mgr", None).await }
    })
    .await;
    let forwarded = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Some(_))))
        .count();
    // Once at hr_review the remaining callers are refused
    assert_eq!(forwarded, 1);

    let reopened = FileRepository::new(&path).await.unwrap();
    let stored = reopened.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.current_step, StepId::HrReview);
    assert_eq!(stored.history.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reconcile_restores_once() {
    let engine = Arc::new(create_engine());

    let results = race(|| {
        let engine = engine.clone();
        async move {
            engine
                .reconcile(WorkflowType::SalaryAdvance, 88, RequestStatus::PendingHr, "carol")
                .await
        }
    })
    .await;
    let created = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Reconciliation::Created(_))))
        .count();
    assert_eq!(created, 1);

    let all = engine
        .list_workflows(&InstanceQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

// ============================================================================
// Storage failures
// ============================================================================

/// Repository whose writes always fail
struct ReadOnlyRepository;

#[async_trait]
impl WorkflowRepository for ReadOnlyRepository {
    async fn get(&self, _id: &str) -> HrmsResult<Option<WorkflowInstance>> {
        Ok(None)
    }

    async fn save(&self, _instance: &WorkflowInstance) -> HrmsResult<()> {
        Err(HrmsError::store("read-only"))
    }

    async fn delete(&self, _id: &str) -> HrmsResult<()> {
        Err(HrmsError::store("read-only"))
    }

    async fn list(&self, _query: &InstanceQuery) -> HrmsResult<Vec<WorkflowInstance>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_store_failure_is_an_error() {
    let engine = WorkflowEngine::new(Arc::new(ReadOnlyRepository));
    let err = engine
        .create_workflow(WorkflowType::Leave, 1, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, HrmsError::Store(_)));
}
