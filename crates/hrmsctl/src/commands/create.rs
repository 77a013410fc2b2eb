use anyhow::Result;
use hrms_engine::WorkflowEngine;

use super::parse_type;
use crate::output;

/// Start the workflow for a submitted request
pub async fn execute(
    engine: &WorkflowEngine,
    workflow_type: &str,
    request_id: &str,
    submitted_by: &str,
    branch: Option<&str>,
    format: &str,
) -> Result<()> {
    let workflow_type = parse_type(workflow_type)?;

    if let Some(existing) = engine.find_by_request(workflow_type, request_id).await? {
        tracing::warn!(
            workflow = %existing.id,
            "Request {} already has a workflow; creating another",
            request_id
        );
    }

    let instance = match branch {
        Some(branch) => {
            engine
                .create_workflow_in_branch(workflow_type, request_id, submitted_by, branch)
                .await?
        }
        None => {
            engine
                .create_workflow(workflow_type, request_id, submitted_by)
                .await?
        }
    };

    output::print_instance(&instance, format)
}
