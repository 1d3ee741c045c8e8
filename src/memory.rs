//! In-process storage collaborator.
//!
//! `MemoryState` holds the authoritative task and user tables and enforces the
//! server-side rules: permission checks, cycle rejection, the
//! unfinished-children soft warning, the integration gate and the append-only
//! status history. It backs both [`InMemoryBackend`] and the HTTP server in
//! [`crate::server`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::backend::{Reply, StorageBackend};
use crate::error::{Result, TrackerError};
use crate::models::{
    CreateTaskRequest, CreateUserRequest, MutationResponse, Role, StatusChange, Task,
    UpdateTaskRequest, UpdateUserRequest, User,
};
use crate::status::TaskStatus;

/// How many child titles a warning names before summarising the rest
const MESSAGE_TITLE_LIMIT: usize = 3;

/// Why a request was refused before any rule was evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalKind {
    Unauthenticated,
    Forbidden,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub kind: RefusalKind,
    pub message: String,
}

impl Refusal {
    fn forbidden(message: &str) -> Self {
        Self {
            kind: RefusalKind::Forbidden,
            message: message.to_string(),
        }
    }

    fn not_found(message: &str) -> Self {
        Self {
            kind: RefusalKind::NotFound,
            message: message.to_string(),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            kind: RefusalKind::Unauthenticated,
            message: "Login required".to_string(),
        }
    }
}

pub type Verdict = std::result::Result<MutationResponse, Refusal>;

#[derive(Debug, Clone)]
struct HistoryRecord {
    old_status: TaskStatus,
    new_status: TaskStatus,
    user_id: i64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TaskRecord {
    id: i64,
    title: String,
    description: Option<String>,
    creator_id: i64,
    assignee_id: Option<i64>,
    status: TaskStatus,
    override_warning: bool,
    parents: BTreeSet<i64>,
    documentation: String,
    history: Vec<HistoryRecord>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct UserRecord {
    id: i64,
    username: String,
    role: Role,
}

#[derive(Debug, Default)]
struct Database {
    tasks: BTreeMap<i64, TaskRecord>,
    users: BTreeMap<i64, UserRecord>,
    next_task_id: i64,
    next_user_id: i64,
}

impl Database {
    fn user(&self, id: i64) -> std::result::Result<&UserRecord, Refusal> {
        self.users.get(&id).ok_or_else(Refusal::unauthenticated)
    }

    fn task(&self, id: i64) -> std::result::Result<&TaskRecord, Refusal> {
        self.tasks
            .get(&id)
            .ok_or_else(|| Refusal::not_found("Task not found"))
    }

    fn children_of(&self, id: i64) -> Vec<&TaskRecord> {
        self.tasks
            .values()
            .filter(|task| task.parents.contains(&id))
            .collect()
    }

    fn username(&self, id: i64) -> Option<String> {
        self.users.get(&id).map(|u| u.username.clone())
    }

    /// True if making `parent_id` a parent of `task_id` would close a cycle
    fn would_create_cycle(&self, task_id: i64, parent_id: i64) -> bool {
        if parent_id == task_id {
            return true;
        }
        let mut visited = HashSet::new();
        let mut to_visit = vec![parent_id];
        while let Some(current) = to_visit.pop() {
            if current == task_id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(task) = self.tasks.get(&current) {
                to_visit.extend(task.parents.iter().copied());
            }
        }
        false
    }

    fn can_edit(&self, user: &UserRecord, task: &TaskRecord) -> bool {
        user.role == Role::Admin || task.creator_id == user.id || task.assignee_id == Some(user.id)
    }

    fn can_manage(&self, user: &UserRecord, task: &TaskRecord) -> bool {
        user.role == Role::Admin || task.creator_id == user.id
    }

    fn progress(&self, task: &TaskRecord) -> u8 {
        let children = self.children_of(task.id);
        if children.is_empty() {
            return if task.status == TaskStatus::Integrated {
                100
            } else {
                0
            };
        }
        let completed = children
            .iter()
            .filter(|c| c.status == TaskStatus::Integrated)
            .count();
        ((completed * 100) / children.len()) as u8
    }

    fn unfinished_children(&self, id: i64) -> Vec<&TaskRecord> {
        self.children_of(id)
            .into_iter()
            .filter(|c| !c.status.is_at_least_functional())
            .collect()
    }

    fn next_status_highlight(&self, task: &TaskRecord, viewer: i64) -> Option<TaskStatus> {
        if matches!(task.assignee_id, Some(assignee) if assignee != viewer) {
            return None;
        }
        let has_children = !self.children_of(task.id).is_empty();
        if has_children {
            if self.unfinished_children(task.id).is_empty() {
                return task.status.next();
            }
            None
        } else if !task.override_warning {
            task.status.next()
        } else {
            None
        }
    }

    fn view(&self, task: &TaskRecord, viewer: &UserRecord, detailed: bool) -> Task {
        let child_ids = self.children_of(task.id).iter().map(|c| c.id).collect();
        let history = if detailed {
            task.history
                .iter()
                .map(|h| StatusChange {
                    old_status: Some(h.old_status),
                    new_status: h.new_status,
                    user: self
                        .username(h.user_id)
                        .unwrap_or_else(|| "unknown".to_string()),
                    timestamp: h.timestamp,
                })
                .collect()
        } else {
            Vec::new()
        };

        Task {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            progress: self.progress(task),
            assignee_id: task.assignee_id,
            assignee: task.assignee_id.and_then(|id| self.username(id)),
            creator_id: task.creator_id,
            creator: self.username(task.creator_id),
            parent_ids: task.parents.clone(),
            child_ids,
            documentation: detailed.then(|| task.documentation.clone()),
            history,
            next_status_highlight: self.next_status_highlight(task, viewer.id),
            can_edit: self.can_edit(viewer, task),
            override_warning: task.override_warning,
            created_at: Some(task.created_at),
        }
    }
}

/// Join up to three titles, summarising the rest ("A, B, C and 2 more")
fn summarize_titles(tasks: &[&TaskRecord]) -> String {
    let mut message = tasks
        .iter()
        .take(MESSAGE_TITLE_LIMIT)
        .map(|t| t.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if tasks.len() > MESSAGE_TITLE_LIMIT {
        message.push_str(&format!(" and {} more", tasks.len() - MESSAGE_TITLE_LIMIT));
    }
    message
}

/// Shared handle to the in-memory task and user tables
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    db: Arc<RwLock<Database>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user without any permission check (bootstrap / tests)
    pub async fn add_user(&self, username: &str, role: Role) -> i64 {
        let mut db = self.db.write().await;
        db.next_user_id += 1;
        let id = db.next_user_id;
        db.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_string(),
                role,
            },
        );
        id
    }

    /// Backend acting as `user_id`
    pub fn backend_for(&self, user_id: i64) -> InMemoryBackend {
        InMemoryBackend {
            state: self.clone(),
            user_id,
        }
    }

    pub async fn task_count(&self) -> usize {
        self.db.read().await.tasks.len()
    }

    // ── Tasks ───────────────────────────────────────────────────────

    pub async fn list_tasks(&self, actor: i64) -> std::result::Result<Vec<Task>, Refusal> {
        let db = self.db.read().await;
        let viewer = db.user(actor)?;
        Ok(db
            .tasks
            .values()
            .map(|task| db.view(task, viewer, false))
            .collect())
    }

    pub async fn get_task(&self, actor: i64, id: i64) -> std::result::Result<Task, Refusal> {
        let db = self.db.read().await;
        let viewer = db.user(actor)?;
        let task = db.task(id)?;
        Ok(db.view(task, viewer, true))
    }

    pub async fn create_task(&self, actor: i64, request: CreateTaskRequest) -> Verdict {
        let mut db = self.db.write().await;
        db.user(actor)?;

        let title = request.title.trim();
        if title.is_empty() {
            return Ok(MutationResponse::failure("Title is required"));
        }

        let id = db.next_task_id + 1;
        let mut parents = BTreeSet::new();
        for parent_id in request.parent_ids {
            if !db.tasks.contains_key(&parent_id) {
                continue;
            }
            if db.would_create_cycle(id, parent_id) {
                return Ok(MutationResponse::failure("Circular relationship detected"));
            }
            parents.insert(parent_id);
        }

        db.next_task_id = id;
        db.tasks.insert(
            id,
            TaskRecord {
                id,
                title: title.to_string(),
                description: request.description,
                creator_id: actor,
                assignee_id: None,
                status: TaskStatus::NotStarted,
                override_warning: false,
                parents,
                documentation: String::new(),
                history: Vec::new(),
                created_at: Utc::now(),
            },
        );
        crate::log_task_operation!("create", id);
        Ok(MutationResponse::created(id))
    }

    pub async fn update_task(&self, actor: i64, id: i64, request: UpdateTaskRequest) -> Verdict {
        let mut db = self.db.write().await;
        let user = db.user(actor)?.clone();
        let task = db.task(id)?;
        if !db.can_edit(&user, task) {
            return Err(Refusal::forbidden("Permission denied"));
        }

        // Validate everything first so a rejection leaves the task untouched
        let new_parents = match &request.parent_ids {
            Some(parent_ids) => {
                if parent_ids.iter().any(|pid| db.would_create_cycle(id, *pid)) {
                    return Ok(MutationResponse::failure("Circular relationship detected"));
                }
                Some(
                    parent_ids
                        .iter()
                        .copied()
                        .filter(|pid| db.tasks.contains_key(pid))
                        .collect::<BTreeSet<_>>(),
                )
            },
            None => None,
        };

        let status_change = match request.status {
            Some(new_status) if new_status != task.status => {
                let unfinished = db.unfinished_children(id);
                if !unfinished.is_empty() && !request.override_warning {
                    return Ok(MutationResponse::warning(format!(
                        "This task has unfinished children: {}. Are you sure you want to proceed?",
                        summarize_titles(&unfinished)
                    )));
                }
                if new_status == TaskStatus::Integrated {
                    let not_integrated: Vec<_> = db
                        .children_of(id)
                        .into_iter()
                        .filter(|c| c.status != TaskStatus::Integrated)
                        .collect();
                    if !not_integrated.is_empty() {
                        return Ok(MutationResponse::failure(format!(
                            "Cannot integrate while children are not integrated: {}",
                            summarize_titles(&not_integrated)
                        )));
                    }
                }
                Some(new_status)
            },
            _ => None,
        };

        let Some(task) = db.tasks.get_mut(&id) else {
            return Err(Refusal::not_found("Task not found"));
        };
        if let Some(title) = request.title {
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = Some(description);
        }
        if let Some(parents) = new_parents {
            task.parents = parents;
        }
        if let Some(new_status) = status_change {
            if request.override_warning {
                task.override_warning = true;
            }
            task.history.push(HistoryRecord {
                old_status: task.status,
                new_status,
                user_id: actor,
                timestamp: Utc::now(),
            });
            tracing::info!(
                task_id = id,
                from = %task.status,
                to = %new_status,
                override_warning = request.override_warning,
                "Status changed"
            );
            task.status = new_status;
        }
        if let Some(documentation) = request.documentation {
            task.documentation = documentation;
        }
        Ok(MutationResponse::ok())
    }

    pub async fn delete_task(&self, actor: i64, id: i64) -> Verdict {
        let mut db = self.db.write().await;
        let user = db.user(actor)?.clone();
        let task = db.task(id)?;
        if !db.can_manage(&user, task) {
            return Err(Refusal::forbidden("Permission denied"));
        }
        if !db.children_of(id).is_empty() {
            return Ok(MutationResponse::failure("Cannot delete task with children"));
        }
        db.tasks.remove(&id);
        for other in db.tasks.values_mut() {
            other.parents.remove(&id);
        }
        crate::log_task_operation!("delete", id);
        Ok(MutationResponse::ok())
    }

    // ── Assignment ──────────────────────────────────────────────────

    pub async fn claim_task(&self, actor: i64, id: i64) -> Verdict {
        let mut db = self.db.write().await;
        db.user(actor)?;
        let task = db.task(id)?;
        if task.assignee_id.is_some() {
            return Ok(MutationResponse::failure("Task already assigned"));
        }
        if task.status != TaskStatus::NotStarted {
            return Ok(MutationResponse::failure(
                "Can only request not started tasks",
            ));
        }
        if let Some(task) = db.tasks.get_mut(&id) {
            task.assignee_id = Some(actor);
        }
        crate::log_task_operation!("claim", id);
        Ok(MutationResponse::ok())
    }

    pub async fn unassign_task(&self, actor: i64, id: i64) -> Verdict {
        let mut db = self.db.write().await;
        let user = db.user(actor)?.clone();
        let task = db.task(id)?;
        if !db.can_edit(&user, task) {
            return Err(Refusal::forbidden("Permission denied"));
        }
        if let Some(task) = db.tasks.get_mut(&id) {
            task.assignee_id = None;
        }
        crate::log_task_operation!("unassign", id);
        Ok(MutationResponse::ok_with("Task unassigned successfully"))
    }

    pub async fn assign_task(&self, actor: i64, id: i64, user_id: Option<i64>) -> Verdict {
        let mut db = self.db.write().await;
        let user = db.user(actor)?;
        if user.role != Role::Admin {
            return Err(Refusal::forbidden("Admin access required"));
        }
        db.task(id)?;
        if let Some(user_id) = user_id {
            if !db.users.contains_key(&user_id) {
                return Ok(MutationResponse::failure("User not found"));
            }
        }
        if let Some(task) = db.tasks.get_mut(&id) {
            task.assignee_id = user_id;
        }
        crate::log_task_operation!("assign", id);
        Ok(MutationResponse::ok())
    }

    // ── Edges ───────────────────────────────────────────────────────

    pub async fn add_parent(&self, actor: i64, id: i64, parent_id: Option<i64>) -> Verdict {
        let mut db = self.db.write().await;
        db.user(actor)?;
        let task = db.task(id)?;
        let Some(parent_id) = parent_id else {
            return Ok(MutationResponse::failure("Parent ID required"));
        };
        if parent_id == id {
            return Ok(MutationResponse::failure("Task cannot be its own parent"));
        }
        if !db.tasks.contains_key(&parent_id) {
            return Ok(MutationResponse::failure("Parent task not found"));
        }
        if task.parents.contains(&parent_id) {
            return Ok(MutationResponse::failure("Task is already a parent"));
        }
        if db.would_create_cycle(id, parent_id) {
            return Ok(MutationResponse::failure("Circular relationship detected"));
        }
        if let Some(task) = db.tasks.get_mut(&id) {
            task.parents.insert(parent_id);
        }
        tracing::info!(task_id = id, parent_id, "Parent added");
        Ok(MutationResponse::ok())
    }

    pub async fn remove_parent(&self, actor: i64, id: i64, parent_id: i64) -> Verdict {
        let mut db = self.db.write().await;
        db.user(actor)?;
        db.task(id)?;
        if !db.tasks.contains_key(&parent_id) {
            return Ok(MutationResponse::failure("Parent task not found"));
        }
        if let Some(task) = db.tasks.get_mut(&id) {
            if task.parents.remove(&parent_id) {
                tracing::info!(task_id = id, parent_id, "Parent removed");
            }
        }
        Ok(MutationResponse::ok())
    }

    pub async fn add_child(&self, actor: i64, id: i64, child_id: Option<i64>) -> Verdict {
        let mut db = self.db.write().await;
        db.user(actor)?;
        db.task(id)?;
        let Some(child_id) = child_id else {
            return Ok(MutationResponse::failure("Child ID required"));
        };
        if child_id == id {
            return Ok(MutationResponse::failure("Task cannot be its own child"));
        }
        let Some(child) = db.tasks.get(&child_id) else {
            return Ok(MutationResponse::failure("Child task not found"));
        };
        if child.parents.contains(&id) {
            return Ok(MutationResponse::failure("Task is already a child"));
        }
        if db.would_create_cycle(child_id, id) {
            return Ok(MutationResponse::failure("Circular relationship detected"));
        }
        if let Some(child) = db.tasks.get_mut(&child_id) {
            child.parents.insert(id);
        }
        tracing::info!(task_id = id, child_id, "Child added");
        Ok(MutationResponse::ok())
    }

    // ── Users ───────────────────────────────────────────────────────

    pub async fn list_users(&self, actor: i64) -> std::result::Result<Vec<User>, Refusal> {
        let db = self.db.read().await;
        let user = db.user(actor)?;
        if user.role != Role::Admin {
            return Ok(Vec::new());
        }
        Ok(db
            .users
            .values()
            .map(|u| User {
                id: u.id,
                username: u.username.clone(),
                role: u.role,
                created_tasks_count: db.tasks.values().filter(|t| t.creator_id == u.id).count()
                    as u32,
                assigned_tasks_count: db
                    .tasks
                    .values()
                    .filter(|t| t.assignee_id == Some(u.id))
                    .count() as u32,
            })
            .collect())
    }

    pub async fn create_user(&self, actor: i64, request: CreateUserRequest) -> Verdict {
        let mut db = self.db.write().await;
        if db.user(actor)?.role != Role::Admin {
            return Err(Refusal::forbidden("Admin access required"));
        }
        let username = request.username.trim();
        if username.is_empty() {
            return Ok(MutationResponse::failure("Username is required"));
        }
        if db.users.values().any(|u| u.username == username) {
            return Ok(MutationResponse::failure("Username already exists"));
        }
        db.next_user_id += 1;
        let id = db.next_user_id;
        db.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_string(),
                role: request.role,
            },
        );
        tracing::info!(user_id = id, "User created");
        Ok(MutationResponse::ok_with("User created successfully"))
    }

    pub async fn update_user(&self, actor: i64, id: i64, request: UpdateUserRequest) -> Verdict {
        let mut db = self.db.write().await;
        if db.user(actor)?.role != Role::Admin {
            return Err(Refusal::forbidden("Admin access required"));
        }
        if !db.users.contains_key(&id) {
            return Err(Refusal::not_found("User not found"));
        }
        let new_username = request.username.map(|name| name.trim().to_string());
        if let Some(name) = &new_username {
            if db.users.values().any(|u| &u.username == name && u.id != id) {
                return Ok(MutationResponse::failure("Username already exists"));
            }
        }
        if let Some(user) = db.users.get_mut(&id) {
            if let Some(name) = new_username {
                user.username = name;
            }
            if let Some(role) = request.role {
                user.role = role;
            }
        }
        Ok(MutationResponse::ok_with("User updated successfully"))
    }

    pub async fn delete_user(&self, actor: i64, id: i64) -> Verdict {
        let mut db = self.db.write().await;
        if db.user(actor)?.role != Role::Admin {
            return Err(Refusal::forbidden("Admin access required"));
        }
        if !db.users.contains_key(&id) {
            return Err(Refusal::not_found("User not found"));
        }
        if id == actor {
            return Ok(MutationResponse::failure("Cannot delete your own account"));
        }
        db.users.remove(&id);
        for task in db.tasks.values_mut() {
            if task.assignee_id == Some(id) {
                task.assignee_id = None;
            }
        }
        Ok(MutationResponse::ok_with("User deleted successfully"))
    }
}

/// [`StorageBackend`] over a shared [`MemoryState`], acting as one user
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: MemoryState,
    user_id: i64,
}

impl InMemoryBackend {
    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

fn into_reply(verdict: Verdict) -> Reply {
    match verdict {
        Ok(response) => Reply::from(response),
        Err(refusal) => Reply::Rejected(refusal.message),
    }
}

impl StorageBackend for InMemoryBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.state
            .list_tasks(self.user_id)
            .await
            .map_err(|r| TrackerError::Rejected(r.message))
    }

    async fn get_task(&self, id: i64) -> Result<Task> {
        self.state
            .get_task(self.user_id, id)
            .await
            .map_err(|r| match r.kind {
                RefusalKind::NotFound => TrackerError::TaskNotFound(id),
                _ => TrackerError::Rejected(r.message),
            })
    }

    async fn create_task(&self, request: CreateTaskRequest) -> Result<Reply> {
        Ok(into_reply(self.state.create_task(self.user_id, request).await))
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Reply> {
        Ok(into_reply(
            self.state.update_task(self.user_id, id, request).await,
        ))
    }

    async fn delete_task(&self, id: i64) -> Result<Reply> {
        Ok(into_reply(self.state.delete_task(self.user_id, id).await))
    }

    async fn claim_task(&self, id: i64) -> Result<Reply> {
        Ok(into_reply(self.state.claim_task(self.user_id, id).await))
    }

    async fn unassign_task(&self, id: i64) -> Result<Reply> {
        Ok(into_reply(self.state.unassign_task(self.user_id, id).await))
    }

    async fn assign_task(&self, id: i64, user_id: Option<i64>) -> Result<Reply> {
        Ok(into_reply(
            self.state.assign_task(self.user_id, id, user_id).await,
        ))
    }

    async fn add_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        Ok(into_reply(
            self.state
                .add_parent(self.user_id, id, Some(parent_id))
                .await,
        ))
    }

    async fn remove_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        Ok(into_reply(
            self.state.remove_parent(self.user_id, id, parent_id).await,
        ))
    }

    async fn add_child(&self, id: i64, child_id: i64) -> Result<Reply> {
        Ok(into_reply(
            self.state.add_child(self.user_id, id, Some(child_id)).await,
        ))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.state
            .list_users(self.user_id)
            .await
            .map_err(|r| TrackerError::Rejected(r.message))
    }

    async fn create_user(&self, request: CreateUserRequest) -> Result<Reply> {
        Ok(into_reply(self.state.create_user(self.user_id, request).await))
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<Reply> {
        Ok(into_reply(
            self.state.update_user(self.user_id, id, request).await,
        ))
    }

    async fn delete_user(&self, id: i64) -> Result<Reply> {
        Ok(into_reply(self.state.delete_user(self.user_id, id).await))
    }
}
