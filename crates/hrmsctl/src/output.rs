//! Output formatting for hrmsctl
//!
//! Every printer honors the kubectl-style `-o` flag: `json`, `yaml`,
//! `name`, or a `wide` table (default).

use anyhow::Result;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hrms_core::{NotificationEvent, RequestStatus, WorkflowDefinition, WorkflowInstance};
use serde::Serialize;

/// Badge color per status, matching the HRMS frontend badges
pub fn status_badge(status: RequestStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        RequestStatus::PendingOps => label.yellow(),
        RequestStatus::PendingHr => label.blue(),
        RequestStatus::Approved => label.green(),
        RequestStatus::Rejected => label.red(),
        RequestStatus::Disbursed => label.green().bold(),
    }
}

fn print_structured<T: Serialize + ?Sized>(value: &T, format: &str) -> Result<bool> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(value)?),
        "yaml" => print!("{}", serde_yaml::to_string(value)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_instance(instance: &WorkflowInstance, format: &str) -> Result<()> {
    if print_structured(instance, format)? {
        return Ok(());
    }
    print_rows(std::slice::from_ref(instance), format);
    Ok(())
}

pub fn print_instances(instances: &[WorkflowInstance], format: &str) -> Result<()> {
    if print_structured(instances, format)? {
        return Ok(());
    }
    if instances.is_empty() && format != "name" {
        println!("No workflows found");
        return Ok(());
    }
    print_rows(instances, format);
    Ok(())
}

fn print_rows(instances: &[WorkflowInstance], format: &str) {
    if format == "name" {
        for instance in instances {
            println!("workflow/{}", instance.id);
        }
        return;
    }

    let mut table = new_table(vec![
        "ID", "TYPE", "REQUEST", "STEP", "STATUS", "ASSIGNED", "BRANCH", "UPDATED",
    ]);
    for instance in instances {
        table.add_row(vec![
            instance.id.clone(),
            instance.workflow_type.to_string(),
            instance.request_id.clone(),
            instance.current_step.to_string(),
            status_badge(instance.status).to_string(),
            instance
                .assigned_to
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            instance.branch_id.clone().unwrap_or_else(|| "-".to_string()),
            instance.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");
}

pub fn print_history(instance: &WorkflowInstance, format: &str) -> Result<()> {
    if print_structured(&instance.history, format)? {
        return Ok(());
    }

    println!(
        "{} {} ({} request {})",
        "Workflow".bold(),
        instance.id,
        instance.workflow_type,
        instance.request_id
    );
    let mut table = new_table(vec!["#", "STEP", "ACTION", "BY", "AT", "FROM", "TO", "COMMENTS"]);
    for (i, entry) in instance.history.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            entry.step_id.to_string(),
            entry.action.to_string(),
            entry.performed_by.clone(),
            entry.performed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.previous_status.to_string(),
            status_badge(entry.new_status).to_string(),
            entry.comments.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn print_steps(definition: &WorkflowDefinition, format: &str) -> Result<()> {
    if print_structured(definition, format)? {
        return Ok(());
    }

    let mut table = new_table(vec!["STEP", "NAME", "ROLE", "ACTION", "NEXT", "STATUS"]);
    for step in definition.steps {
        table.add_row(vec![
            step.id.to_string(),
            step.name.to_string(),
            step.role.to_string(),
            step.action.to_string(),
            step.next_step
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status_badge(step.status).to_string(),
        ]);
    }
    println!("{table}");
    println!(
        "On completion: {}",
        status_badge(definition.completion_status)
    );
    Ok(())
}

/// Notifications are process-local, so each command reports what it emitted
pub fn report_notifications(events: &[NotificationEvent]) {
    for event in events {
        eprintln!(
            "{} [{}] -> {}: {}",
            "notify".cyan(),
            event.notification_type,
            event.recipient_role,
            event.message
        );
    }
}
