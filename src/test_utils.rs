use std::collections::BTreeSet;

use crate::memory::{InMemoryBackend, MemoryState};
use crate::models::{CreateTaskRequest, Role, Task, User};
use crate::status::TaskStatus;

/// A not-started, unassigned task created by user 1
pub fn task(id: i64, title: &str) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        status: TaskStatus::NotStarted,
        progress: 0,
        assignee_id: None,
        assignee: None,
        creator_id: 1,
        creator: None,
        parent_ids: BTreeSet::new(),
        child_ids: BTreeSet::new(),
        documentation: None,
        history: Vec::new(),
        next_status_highlight: None,
        can_edit: false,
        override_warning: false,
        created_at: None,
    }
}

pub fn user(id: i64, username: &str, role: Role) -> User {
    User {
        id,
        username: username.to_string(),
        role,
        created_tasks_count: 0,
        assigned_tasks_count: 0,
    }
}

/// Build tasks from `(child, parent)` edges, filling both directions
pub fn graph(ids: &[i64], edges: &[(i64, i64)]) -> Vec<Task> {
    ids.iter()
        .map(|&id| {
            let mut t = task(id, &format!("Task {}", id));
            t.parent_ids = edges
                .iter()
                .filter(|(child, _)| *child == id)
                .map(|(_, parent)| *parent)
                .collect();
            t.child_ids = edges
                .iter()
                .filter(|(_, parent)| *parent == id)
                .map(|(child, _)| *child)
                .collect();
            t
        })
        .collect()
}

/// In-memory collaborator with an admin and a developer account
pub struct TestContext {
    pub state: MemoryState,
    pub admin: i64,
    pub dev: i64,
}

impl TestContext {
    pub async fn new() -> Self {
        let state = MemoryState::new();
        let admin = state.add_user("admin", Role::Admin).await;
        let dev = state.add_user("dev", Role::Developer).await;
        Self { state, admin, dev }
    }

    pub fn admin_backend(&self) -> InMemoryBackend {
        self.state.backend_for(self.admin)
    }

    pub fn dev_backend(&self) -> InMemoryBackend {
        self.state.backend_for(self.dev)
    }

    /// Create a task as admin and return its id
    pub async fn create(&self, title: &str, parents: &[i64]) -> i64 {
        self.state
            .create_task(
                self.admin,
                CreateTaskRequest {
                    title: title.to_string(),
                    description: None,
                    parent_ids: parents.to_vec(),
                },
            )
            .await
            .unwrap()
            .task_id
            .unwrap()
    }
}
