pub mod completion;
pub mod create;
pub mod get;
pub mod history;
pub mod reconcile;
pub mod steps;
pub mod transition;

use anyhow::Result;
use hrms_core::WorkflowType;

/// Parse a request type argument (leave, salary_advance)
pub fn parse_type(value: &str) -> Result<WorkflowType> {
    value
        .parse::<WorkflowType>()
        .map_err(|_| anyhow::anyhow!("Unknown request type: {} (expected leave or salary_advance)", value))
}
