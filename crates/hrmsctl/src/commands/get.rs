use anyhow::Result;
use hrms_core::{InstanceQuery, RequestStatus, Role};
use hrms_engine::WorkflowEngine;

use crate::output;

/// Get one workflow by id, or list workflows matching the filters
pub async fn execute(
    engine: &WorkflowEngine,
    workflow_id: Option<&str>,
    role: Option<&str>,
    branch: Option<&str>,
    status: Option<&str>,
    format: &str,
) -> Result<()> {
    if let Some(id) = workflow_id {
        let instance = engine
            .get_workflow(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", id))?;
        return output::print_instance(&instance, format);
    }

    let mut query = InstanceQuery::default();
    if let Some(role) = role {
        query.assigned_to = Some(role.parse::<Role>()?);
    }
    if let Some(branch) = branch {
        query = query.with_branch(branch);
    }
    if let Some(status) = status {
        query = query.with_status(status.parse::<RequestStatus>()?);
    }

    let instances = engine.list_workflows(&query).await?;
    output::print_instances(&instances, format)
}
