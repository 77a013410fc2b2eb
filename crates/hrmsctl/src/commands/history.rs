use anyhow::Result;
use hrms_engine::WorkflowEngine;

use crate::output;

/// Print the audit trail of one workflow
pub async fn execute(engine: &WorkflowEngine, workflow_id: &str, format: &str) -> Result<()> {
    let instance = engine
        .get_workflow(workflow_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;
    output::print_history(&instance, format)
}
