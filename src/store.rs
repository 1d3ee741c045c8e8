//! Local caches of collaborator state.
//!
//! [`TaskStore`] is the single source of truth for rendering. It is only ever
//! replaced wholesale by a refresh, never patched in place.

use std::collections::HashMap;

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::models::{Task, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub task_count: usize,
    /// No tasks exist; the view should show its empty state
    pub empty: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<i64, usize>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store directly from a task list
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut store = Self::new();
        store.replace(tasks);
        store
    }

    /// Fetch the full collection and swap it in.
    ///
    /// On failure the previous collection stays in place.
    pub async fn refresh<B: StorageBackend>(&mut self, backend: &B) -> Result<RefreshSummary> {
        let tasks = backend.list_tasks().await?;
        let summary = self.replace(tasks);
        tracing::info!(task_count = summary.task_count, "Task store refreshed");
        Ok(summary)
    }

    /// Replace the whole collection in one step
    pub fn replace(&mut self, tasks: Vec<Task>) -> RefreshSummary {
        let mut index = HashMap::with_capacity(tasks.len());
        let mut unique = Vec::with_capacity(tasks.len());
        for task in tasks {
            match index.get(&task.id) {
                // Duplicate ids: the later record wins, position of the first is kept
                Some(&position) => unique[position] = task,
                None => {
                    index.insert(task.id, unique.len());
                    unique.push(task);
                },
            }
        }

        self.tasks = unique;
        self.index = index;
        RefreshSummary {
            task_count: self.tasks.len(),
            empty: self.tasks.is_empty(),
        }
    }

    pub fn find_by_id(&self, id: i64) -> Option<&Task> {
        self.index.get(&id).map(|&position| &self.tasks[position])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// Tasks in collaborator order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// One entry of an assignment picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOption {
    /// `None` is the "Unassigned" entry
    pub user_id: Option<i64>,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<B: StorageBackend>(&mut self, backend: &B) -> Result<usize> {
        let users = backend.list_users().await?;
        self.replace(users);
        tracing::debug!(user_count = self.users.len(), "User directory refreshed");
        Ok(self.users.len())
    }

    pub fn replace(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn find(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// "Unassigned" followed by every user as `username (role)`
    pub fn picker_options(&self, selected: Option<i64>) -> Vec<UserOption> {
        std::iter::once(UserOption {
            user_id: None,
            label: "Unassigned".to_string(),
            selected: selected.is_none(),
        })
        .chain(self.users.iter().map(|user| UserOption {
            user_id: Some(user.id),
            label: format!("{} ({})", user.username, user.role),
            selected: selected == Some(user.id),
        }))
        .collect()
    }
}
