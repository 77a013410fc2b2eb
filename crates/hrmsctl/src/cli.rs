use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use hrms_core::{EngineConfig, StoreBackend};
use hrms_engine::WorkflowEngine;
use hrms_store::FileRepository;

use crate::commands;

const DEFAULT_STORE: &str = "hrms-workflows.json";

/// HRMS approval workflows - route leave and salary advance requests
#[derive(Parser, Debug)]
#[command(name = "hrmsctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Workflow store file (JSON). Overrides the config file's store path.
    #[arg(long, short = 's', global = true, env = "HRMSCTL_STORE")]
    pub store: Option<PathBuf>,

    /// Engine configuration file (YAML)
    ///
    /// Selects assignment and notification policies:
    /// - assignment: legacy | next_step
    /// - notify: actor | requester
    /// - completionNotices: true | false
    #[arg(long, short = 'c', global = true, env = "HRMSCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the workflow for a submitted request
    Create {
        /// Request type (leave, salary_advance)
        workflow_type: String,

        /// Id of the underlying leave or salary advance record
        request_id: String,

        /// Submitting employee
        #[arg(long)]
        by: String,

        /// Branch the request belongs to
        #[arg(long)]
        branch: Option<String>,

        /// Output format (json, yaml, wide, name)
        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Approve the current step
    Approve {
        workflow_id: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        comment: Option<String>,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Reject the request at its current step
    Reject {
        workflow_id: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        comment: Option<String>,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Forward from an operations step without deciding
    Forward {
        workflow_id: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        comment: Option<String>,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Get workflows (all, or one by id)
    Get {
        /// Workflow id (optional - lists all if omitted)
        workflow_id: Option<String>,

        /// Only workflows assigned to this role
        #[arg(long)]
        role: Option<String>,

        /// Only workflows in this branch
        #[arg(long)]
        branch: Option<String>,

        /// Only workflows with this status
        #[arg(long)]
        status: Option<String>,

        /// Output format (json, yaml, wide, name)
        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Show the audit trail of a workflow
    History {
        workflow_id: String,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Show the step sequence for a request type
    Steps {
        workflow_type: String,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Align a workflow with the request status held by the system of record
    Reconcile {
        workflow_type: String,

        request_id: String,

        /// Persisted status (pending_ops, pending_hr, approved, rejected, disbursed)
        status: String,

        /// Requester recorded if the workflow has to be rebuilt
        #[arg(long)]
        by: String,

        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: commands::completion::Shell,
    },

    /// Show version information
    Version,
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Completion { shell } => return commands::completion::execute(shell),
            Commands::Version => {
                println!("hrmsctl {}", hrms_core::VERSION);
                return Ok(());
            }
            Commands::Steps {
                ref workflow_type,
                ref output,
            } => return commands::steps::execute(workflow_type, output),
            _ => {}
        }

        let engine = self.build_engine().await?;

        match self.command {
            Commands::Create {
                workflow_type,
                request_id,
                by,
                branch,
                output,
            } => {
                commands::create::execute(
                    &engine,
                    &workflow_type,
                    &request_id,
                    &by,
                    branch.as_deref(),
                    &output,
                )
                .await
            }
            Commands::Approve {
                workflow_id,
                by,
                comment,
                output,
            } => {
                commands::transition::execute(
                    &engine,
                    commands::transition::Transition::Approve,
                    &workflow_id,
                    &by,
                    comment.as_deref(),
                    &output,
                )
                .await
            }
            Commands::Reject {
                workflow_id,
                by,
                comment,
                output,
            } => {
                commands::transition::execute(
                    &engine,
                    commands::transition::Transition::Reject,
                    &workflow_id,
                    &by,
                    comment.as_deref(),
                    &output,
                )
                .await
            }
            Commands::Forward {
                workflow_id,
                by,
                comment,
                output,
            } => {
                commands::transition::execute(
                    &engine,
                    commands::transition::Transition::Forward,
                    &workflow_id,
                    &by,
                    comment.as_deref(),
                    &output,
                )
                .await
            }
            Commands::Get {
                workflow_id,
                role,
                branch,
                status,
                output,
            } => {
                commands::get::execute(
                    &engine,
                    workflow_id.as_deref(),
                    role.as_deref(),
                    branch.as_deref(),
                    status.as_deref(),
                    &output,
                )
                .await
            }
            Commands::History {
                workflow_id,
                output,
            } => commands::history::execute(&engine, &workflow_id, &output).await,
            Commands::Reconcile {
                workflow_type,
                request_id,
                status,
                by,
                output,
            } => {
                commands::reconcile::execute(
                    &engine,
                    &workflow_type,
                    &request_id,
                    &status,
                    &by,
                    &output,
                )
                .await
            }
            Commands::Completion { .. } | Commands::Version | Commands::Steps { .. } => Ok(()),
        }
    }

    /// Engine over a file store: `--store`, else the config's file path,
    /// else `hrms-workflows.json` in the working directory
    async fn build_engine(&self) -> anyhow::Result<WorkflowEngine> {
        let config = match self.config {
            Some(ref path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        let store_path = self
            .store
            .clone()
            .or_else(|| match config.store.backend {
                StoreBackend::File => config.store.path.clone(),
                StoreBackend::Memory => None,
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));

        tracing::debug!(store = %store_path.display(), "Opening workflow store");
        let repository = FileRepository::new(store_path).await?;
        Ok(WorkflowEngine::with_config(Arc::new(repository), config))
    }
}
