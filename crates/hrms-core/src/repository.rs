//! Repository abstraction for workflow instances
//!
//! The engine never owns instance state; it loads and saves through a
//! `WorkflowRepository` so a persistent backend keeps instances across
//! process restarts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HrmsResult;
use crate::workflow::{RequestStatus, Role, WorkflowInstance, WorkflowType};

/// Storage backend for workflow instances
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn get(&self, id: &str) -> HrmsResult<Option<WorkflowInstance>>;

    /// Insert or replace by instance id
    async fn save(&self, instance: &WorkflowInstance) -> HrmsResult<()>;

    async fn delete(&self, id: &str) -> HrmsResult<()>;

    /// All instances matching `query`, oldest first
    async fn list(&self, query: &InstanceQuery) -> HrmsResult<Vec<WorkflowInstance>>;

    /// Most recent instance for a request
    async fn find_by_request(
        &self,
        workflow_type: WorkflowType,
        request_id: &str,
    ) -> HrmsResult<Option<WorkflowInstance>> {
        let query = InstanceQuery {
            workflow_type: Some(workflow_type),
            request_id: Some(request_id.to_string()),
            ..Default::default()
        };
        Ok(self.list(&query).await?.into_iter().last())
    }
}

/// Filter for instance listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<WorkflowType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl InstanceQuery {
    pub fn for_role(role: Role) -> Self {
        Self {
            assigned_to: Some(role),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an instance matches every set filter
    pub fn matches(&self, instance: &WorkflowInstance) -> bool {
        if let Some(workflow_type) = self.workflow_type {
            if instance.workflow_type != workflow_type {
                return false;
            }
        }
        if let Some(ref request_id) = self.request_id {
            if &instance.request_id != request_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if instance.status != status {
                return false;
            }
        }
        if let Some(role) = self.assigned_to {
            if instance.assigned_to != Some(role) {
                return false;
            }
        }
        if let Some(ref branch_id) = self.branch_id {
            if instance.branch_id.as_ref() != Some(branch_id) {
                return false;
            }
        }
        true
    }

    /// Sort by creation time and apply the limit
    pub fn finish(&self, mut instances: Vec<WorkflowInstance>) -> Vec<WorkflowInstance> {
        instances.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = self.limit {
            instances.truncate(limit);
        }
        instances
    }
}
