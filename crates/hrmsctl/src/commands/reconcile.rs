use anyhow::Result;
use hrms_core::RequestStatus;
use hrms_engine::{Reconciliation, WorkflowEngine};

use super::parse_type;
use crate::output;

/// Align the workflow for a request with its persisted status
pub async fn execute(
    engine: &WorkflowEngine,
    workflow_type: &str,
    request_id: &str,
    status: &str,
    submitted_by: &str,
    format: &str,
) -> Result<()> {
    let workflow_type = parse_type(workflow_type)?;
    let status = status.parse::<RequestStatus>()?;

    let outcome = engine
        .reconcile(workflow_type, request_id, status, submitted_by)
        .await?;
    let verdict = match outcome {
        Reconciliation::Created(_) => "restored",
        Reconciliation::Realigned(_) => "realigned",
        Reconciliation::Unchanged(_) => "unchanged",
    };
    eprintln!("workflow {}: {}", outcome.instance().id, verdict);

    output::print_instance(outcome.instance(), format)
}
