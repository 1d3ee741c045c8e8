//! Parent/child edge editing.
//!
//! Edges are never changed locally. Each edit is a collaborator request; the
//! caller refreshes the store afterwards to see the accepted edge set.

use crate::backend::StorageBackend;
use crate::error::{Result, TrackerError};
use crate::models::Task;
use crate::search::picker_candidates;
use crate::store::TaskStore;

pub struct RelationshipEditor<'a> {
    store: &'a TaskStore,
}

impl<'a> RelationshipEditor<'a> {
    pub fn new(store: &'a TaskStore) -> Self {
        Self { store }
    }

    pub async fn add_parent<B: StorageBackend>(
        &self,
        backend: &B,
        task_id: i64,
        parent_id: i64,
    ) -> Result<()> {
        if parent_id == task_id {
            return Err(TrackerError::SelfReference {
                task_id,
                relation: "parent",
            });
        }
        if self
            .store
            .find_by_id(task_id)
            .is_some_and(|t| t.parent_ids.contains(&parent_id))
        {
            return Err(TrackerError::InvalidInput(
                "Task is already a parent".to_string(),
            ));
        }
        backend.add_parent(task_id, parent_id).await?.applied()?;
        tracing::info!(task_id, parent_id, "Parent link added");
        Ok(())
    }

    pub async fn remove_parent<B: StorageBackend>(
        &self,
        backend: &B,
        task_id: i64,
        parent_id: i64,
    ) -> Result<()> {
        backend.remove_parent(task_id, parent_id).await?.applied()?;
        tracing::info!(task_id, parent_id, "Parent link removed");
        Ok(())
    }

    pub async fn add_child<B: StorageBackend>(
        &self,
        backend: &B,
        task_id: i64,
        child_id: i64,
    ) -> Result<()> {
        if child_id == task_id {
            return Err(TrackerError::SelfReference {
                task_id,
                relation: "child",
            });
        }
        if self
            .store
            .find_by_id(task_id)
            .is_some_and(|t| t.child_ids.contains(&child_id))
        {
            return Err(TrackerError::InvalidInput(
                "Task is already a child".to_string(),
            ));
        }
        backend.add_child(task_id, child_id).await?.applied()?;
        tracing::info!(task_id, child_id, "Child link added");
        Ok(())
    }

    pub fn parent_candidates(&self, task_id: i64, query: &str) -> Vec<&'a Task> {
        picker_candidates(self.store.tasks(), task_id, query)
    }

    pub fn child_candidates(&self, task_id: i64, query: &str) -> Vec<&'a Task> {
        picker_candidates(self.store.tasks(), task_id, query)
    }
}
