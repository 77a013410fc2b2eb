use anyhow::Result;

use super::parse_type;
use crate::output;

/// Show the static step sequence for a request type
pub fn execute(workflow_type: &str, format: &str) -> Result<()> {
    let workflow_type = parse_type(workflow_type)?;
    output::print_steps(workflow_type.definition(), format)
}
