//! In-memory repository backend

use async_trait::async_trait;
use dashmap::DashMap;
use hrms_core::{HrmsResult, InstanceQuery, WorkflowInstance, WorkflowRepository};
use std::sync::Arc;

/// Ephemeral repository backed by a concurrent map
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    instances: Arc<DashMap<String, WorkflowInstance>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryRepository {
    async fn get(&self, id: &str) -> HrmsResult<Option<WorkflowInstance>> {
        Ok(self.instances.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, instance: &WorkflowInstance) -> HrmsResult<()> {
        self.instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> HrmsResult<()> {
        self.instances.remove(id);
        Ok(())
    }

    async fn list(&self, query: &InstanceQuery) -> HrmsResult<Vec<WorkflowInstance>> {
        let matched = self
            .instances
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(query.finish(matched))
    }
}
