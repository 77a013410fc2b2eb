use anyhow::Result;
use hrms_engine::{Decision, WorkflowEngine};

use crate::output;

/// Transition requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Forward,
}

pub async fn execute(
    engine: &WorkflowEngine,
    transition: Transition,
    workflow_id: &str,
    performed_by: &str,
    comment: Option<&str>,
    format: &str,
) -> Result<()> {
    let result = match transition {
        Transition::Approve => {
            engine
                .progress_workflow(workflow_id, Decision::Approve, performed_by, comment)
                .await?
        }
        Transition::Reject => {
            engine
                .progress_workflow(workflow_id, Decision::Reject, performed_by, comment)
                .await?
        }
        Transition::Forward => {
            engine
                .forward_workflow(workflow_id, performed_by, comment)
                .await?
        }
    };

    let instance = match result {
        Some(instance) => instance,
        None => {
            let forward = transition == Transition::Forward;
            return match engine.refusal_for(workflow_id, forward).await? {
                Some(refusal) => Err(anyhow::anyhow!("Transition refused: {}", refusal)),
                None => Err(anyhow::anyhow!(
                    "Transition refused for workflow '{}'",
                    workflow_id
                )),
            };
        }
    };

    output::report_notifications(&engine.notifications().all().await);
    output::print_instance(&instance, format)
}
