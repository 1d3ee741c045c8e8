//! View-model for one user's session.
//!
//! [`TrackerSession`] owns every piece of client state: the task and user
//! caches, the pending status change, the layout engine and the view state.
//! Mutating actions take `&mut self`, so one session never has two requests in
//! flight, and each successful mutation is followed by an awaited refresh
//! before the action returns.

use serde::Serialize;

use crate::backend::StorageBackend;
use crate::confirm::{
    delete_user_prompt, Confirmer, ABANDON_PROMPT, CLAIM_PROMPT, DELETE_PROMPT,
    REMOVE_PARENT_PROMPT, UNASSIGN_PROMPT,
};
use crate::error::{Result, TrackerError};
use crate::layout::{ForceDirected, ForceSimulation, GraphLayoutEngine, NodePosition, Viewport};
use crate::leveling::{LevelAssigner, LevelMap};
use crate::models::{
    CreateTaskRequest, CreateUserRequest, Identity, Role, StatusChange, Task, UpdateTaskRequest,
    UpdateUserRequest,
};
use crate::ranking::{ListEntry, TaskListRanker};
use crate::relationships::RelationshipEditor;
use crate::status::TaskStatus;
use crate::store::{RefreshSummary, TaskStore, UserDirectory, UserOption};
use crate::transitions::{
    assignment_control, can_manage, status_options, AssignmentControl, PendingTransition,
    StatusOption, TaskStateMachine, TransitionOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Layered view around the selected task
    #[default]
    Graph,
    /// Force-directed view of every task
    Tree,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub mode: ViewMode,
    pub selected: Option<i64>,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// A parent or child reference; `title` is `None` when the task is not cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedTask {
    pub id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetailView {
    pub task: Task,
    pub parents: Vec<RelatedTask>,
    pub children: Vec<RelatedTask>,
    pub status_options: Vec<StatusOption>,
    pub assignment: AssignmentControl,
    /// Offered when the assignment control is `Assign`
    pub user_options: Vec<UserOption>,
    pub can_edit: bool,
    pub can_manage: bool,
    /// Newest first
    pub history: Vec<StatusChange>,
}

pub struct TrackerSession<B, C, S = ForceDirected>
where
    B: StorageBackend,
    C: Confirmer,
    S: ForceSimulation,
{
    backend: B,
    confirmer: C,
    identity: Identity,
    store: TaskStore,
    users: UserDirectory,
    machine: TaskStateMachine,
    layout: GraphLayoutEngine<S>,
    view: ViewState,
    notifications: Vec<Notification>,
}

impl<B, C> TrackerSession<B, C, ForceDirected>
where
    B: StorageBackend,
    C: Confirmer,
{
    pub fn new(backend: B, confirmer: C, identity: Identity) -> Self {
        Self::with_simulation(
            backend,
            confirmer,
            identity,
            ForceDirected::new(),
            Viewport::default(),
        )
    }
}

impl<B, C, S> TrackerSession<B, C, S>
where
    B: StorageBackend,
    C: Confirmer,
    S: ForceSimulation,
{
    pub fn with_simulation(
        backend: B,
        confirmer: C,
        identity: Identity,
        simulation: S,
        viewport: Viewport,
    ) -> Self {
        Self {
            backend,
            confirmer,
            identity,
            store: TaskStore::new(),
            users: UserDirectory::new(),
            machine: TaskStateMachine::new(identity),
            layout: GraphLayoutEngine::new(simulation, viewport),
            view: ViewState::default(),
            notifications: Vec::new(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn confirmer(&self) -> &C {
        &self.confirmer
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn layout(&self) -> &GraphLayoutEngine<S> {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut GraphLayoutEngine<S> {
        &mut self.layout
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.machine.pending()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) -> Notification {
        let notification = Notification {
            level,
            message: message.into(),
        };
        self.notifications.push(notification.clone());
        notification
    }

    fn fail(&mut self, err: TrackerError) -> Notification {
        let message = if err.is_transport() {
            crate::log_error!(err, "collaborator request");
            format!("Request failed: {}", err)
        } else {
            tracing::warn!(code = err.to_error_code(), "{}", err);
            err.to_string()
        };
        self.notify(NotificationLevel::Error, message)
    }

    fn declined(&mut self) -> Notification {
        self.notify(NotificationLevel::Info, "Cancelled")
    }

    fn task(&self, id: i64) -> Result<Task> {
        self.store
            .find_by_id(id)
            .cloned()
            .ok_or(TrackerError::TaskNotFound(id))
    }

    fn ask(&mut self, prompt: &str) -> Result<bool> {
        self.confirmer.confirm(prompt)
    }

    /// Refetch tasks and rebuild derived view state
    pub async fn refresh(&mut self) -> Result<RefreshSummary> {
        let summary = self.store.refresh(&self.backend).await?;
        if let Some(selected) = self.view.selected {
            if !self.store.contains(selected) {
                self.view.selected = None;
            }
        }
        self.layout.select(self.view.selected);
        self.layout.rebuild(&self.store);
        Ok(summary)
    }

    /// Refresh after an applied mutation, then report `success`
    async fn settle(&mut self, outcome: Result<()>, success: &str) -> Notification {
        if let Err(err) = outcome {
            return self.fail(err);
        }
        match self.refresh().await {
            Ok(_) => self.notify(NotificationLevel::Success, success),
            Err(err) => self.fail(err),
        }
    }

    // ── View state ──────────────────────────────────────────────────

    pub async fn load(&mut self) -> Notification {
        match self.refresh().await {
            Ok(summary) => {
                if self.identity.is_admin() {
                    if let Err(err) = self.users.refresh(&self.backend).await {
                        return self.fail(err);
                    }
                }
                if summary.empty {
                    self.notify(NotificationLevel::Info, "No tasks yet")
                } else {
                    self.notify(
                        NotificationLevel::Info,
                        format!("Loaded {} tasks", summary.task_count),
                    )
                }
            },
            Err(err) => self.fail(err),
        }
    }

    pub fn select(&mut self, id: Option<i64>) {
        self.view.selected = id.filter(|id| self.store.contains(*id));
        self.layout.select(self.view.selected);
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.view.mode = mode;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.view.query = query.into();
    }

    // ── Renders ─────────────────────────────────────────────────────

    pub fn task_list(&self) -> Vec<ListEntry> {
        TaskListRanker::new(self.identity).entries(
            self.store.tasks(),
            &self.view.query,
            self.view.selected,
        )
    }

    /// Levels around the selected task
    pub fn graph(&self) -> Option<LevelMap> {
        let focal = self.view.selected?;
        LevelAssigner::new(&self.store).assign(focal)
    }

    /// Advance the tree layout `ticks` steps and return the final positions
    pub fn tree(&mut self, ticks: usize) -> Vec<NodePosition> {
        let mut positions = Vec::new();
        for _ in 0..ticks.max(1) {
            positions = self.layout.tick();
        }
        positions
    }

    pub async fn task_detail(&self, id: i64) -> Result<TaskDetailView> {
        let task = self.backend.get_task(id).await?;

        let related = |ids: &std::collections::BTreeSet<i64>| -> Vec<RelatedTask> {
            ids.iter()
                .map(|&id| RelatedTask {
                    id,
                    title: self.store.find_by_id(id).map(|t| t.title.clone()),
                })
                .collect()
        };
        let parents = related(&task.parent_ids);
        let children = related(&task.child_ids);

        let assignment = assignment_control(&task, &self.identity);
        let user_options = if assignment == AssignmentControl::Assign {
            self.users.picker_options(task.assignee_id)
        } else {
            Vec::new()
        };
        let mut history = task.history.clone();
        history.reverse();

        Ok(TaskDetailView {
            parents,
            children,
            status_options: status_options(&task),
            assignment,
            user_options,
            can_edit: task.can_edit,
            can_manage: can_manage(&task, &self.identity),
            history,
            task,
        })
    }

    // ── Status ──────────────────────────────────────────────────────

    pub async fn request_status(&mut self, task_id: i64, status: TaskStatus) -> Notification {
        match self
            .machine
            .request_transition(&self.backend, task_id, status)
            .await
        {
            Ok(TransitionOutcome::Applied) => self.settle(Ok(()), "Status updated").await,
            Ok(TransitionOutcome::NeedsConfirmation(message)) => {
                self.notify(NotificationLevel::Warning, message)
            },
            Err(err) => self.fail(err),
        }
    }

    pub async fn confirm_warning(&mut self) -> Notification {
        let outcome = self
            .machine
            .confirm_transition(&self.backend)
            .await
            .map(|_| ());
        self.settle(outcome, "Status updated").await
    }

    pub fn cancel_warning(&mut self) -> Option<PendingTransition> {
        self.machine.cancel_transition()
    }

    /// Put the warning to the confirmer, then confirm or cancel the pending change
    pub async fn resolve_warning(&mut self, message: &str) -> Notification {
        if self.machine.pending().is_none() {
            return self.fail(TrackerError::NoPendingTransition);
        }
        match self.ask(message) {
            Ok(true) => self.confirm_warning().await,
            Ok(false) => {
                self.cancel_warning();
                self.declined()
            },
            Err(err) => {
                self.cancel_warning();
                self.fail(err)
            },
        }
    }

    // ── Assignment ──────────────────────────────────────────────────

    pub async fn claim(&mut self, task_id: i64) -> Notification {
        let task = match self.task(task_id) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };
        match self.ask(CLAIM_PROMPT) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = self.machine.claim(&self.backend, &task).await;
        self.settle(outcome, "Task claimed").await
    }

    pub async fn abandon(&mut self, task_id: i64) -> Notification {
        let task = match self.task(task_id) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };
        match self.ask(ABANDON_PROMPT) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = self.machine.abandon(&self.backend, &task).await;
        self.settle(outcome, "Task abandoned successfully").await
    }

    pub async fn unassign(&mut self, task_id: i64) -> Notification {
        let task = match self.task(task_id) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };
        match self.ask(UNASSIGN_PROMPT) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = self.machine.unassign(&self.backend, &task).await;
        self.settle(outcome, "Task unassigned successfully").await
    }

    pub async fn assign(&mut self, task_id: i64, user_id: Option<i64>) -> Notification {
        let task = match self.task(task_id) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };
        let outcome = self.machine.assign(&self.backend, &task, user_id).await;
        self.settle(outcome, "Task assigned").await
    }

    // ── Task CRUD ───────────────────────────────────────────────────

    pub async fn create_task(
        &mut self,
        title: &str,
        description: Option<String>,
        parent_ids: Vec<i64>,
    ) -> Notification {
        let request = CreateTaskRequest {
            title: title.to_string(),
            description,
            parent_ids,
        };
        let created = match self.backend.create_task(request).await {
            Ok(reply) => reply.applied(),
            Err(err) => Err(err),
        };
        match created {
            Ok(task_id) => {
                let notification = self.settle(Ok(()), "Task created").await;
                if let Some(id) = task_id {
                    crate::log_task_operation!("create", id);
                    self.select(Some(id));
                }
                notification
            },
            Err(err) => self.fail(err),
        }
    }

    pub async fn create_child_task(
        &mut self,
        parent_id: i64,
        title: &str,
        description: Option<String>,
    ) -> Notification {
        if !self.store.contains(parent_id) {
            return self.fail(TrackerError::TaskNotFound(parent_id));
        }
        self.create_task(title, description, vec![parent_id]).await
    }

    pub async fn edit_task(
        &mut self,
        task_id: i64,
        title: Option<String>,
        description: Option<String>,
    ) -> Notification {
        let request = UpdateTaskRequest {
            title,
            description,
            ..UpdateTaskRequest::default()
        };
        let outcome = self.update(task_id, request).await;
        self.settle(outcome, "Task updated").await
    }

    pub async fn save_documentation(&mut self, task_id: i64, content: &str) -> Notification {
        let outcome = self
            .update(task_id, UpdateTaskRequest::documentation(content))
            .await;
        self.settle(outcome, "Documentation saved").await
    }

    async fn update(&self, task_id: i64, request: UpdateTaskRequest) -> Result<()> {
        self.backend
            .update_task(task_id, request)
            .await?
            .applied()?;
        Ok(())
    }

    pub async fn delete_task(&mut self, task_id: i64) -> Notification {
        match self.ask(DELETE_PROMPT) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = match self.backend.delete_task(task_id).await {
            Ok(reply) => reply.applied().map(|_| ()),
            Err(err) => Err(err),
        };
        if outcome.is_ok() {
            crate::log_task_operation!("delete", task_id);
            if self.view.selected == Some(task_id) {
                self.view.selected = None;
            }
        }
        self.settle(outcome, "Task deleted").await
    }

    // ── Edges ───────────────────────────────────────────────────────

    pub async fn add_parent(&mut self, task_id: i64, parent_id: i64) -> Notification {
        let outcome = RelationshipEditor::new(&self.store)
            .add_parent(&self.backend, task_id, parent_id)
            .await;
        self.settle(outcome, "Parent added").await
    }

    pub async fn remove_parent(&mut self, task_id: i64, parent_id: i64) -> Notification {
        match self.ask(REMOVE_PARENT_PROMPT) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = RelationshipEditor::new(&self.store)
            .remove_parent(&self.backend, task_id, parent_id)
            .await;
        self.settle(outcome, "Parent removed").await
    }

    pub async fn add_child(&mut self, task_id: i64, child_id: i64) -> Notification {
        let outcome = RelationshipEditor::new(&self.store)
            .add_child(&self.backend, task_id, child_id)
            .await;
        self.settle(outcome, "Dependency added").await
    }

    // ── Users ───────────────────────────────────────────────────────

    pub async fn load_users(&mut self) -> Notification {
        match self.users.refresh(&self.backend).await {
            Ok(count) => self.notify(NotificationLevel::Info, format!("Loaded {} users", count)),
            Err(err) => self.fail(err),
        }
    }

    async fn settle_users(&mut self, outcome: Result<()>, success: &str) -> Notification {
        if let Err(err) = outcome {
            return self.fail(err);
        }
        if let Err(err) = self.users.refresh(&self.backend).await {
            return self.fail(err);
        }
        // Assignee names shown on tasks may have changed
        match self.refresh().await {
            Ok(_) => self.notify(NotificationLevel::Success, success),
            Err(err) => self.fail(err),
        }
    }

    pub async fn create_user(&mut self, username: &str, role: Role) -> Notification {
        let outcome = match self
            .backend
            .create_user(CreateUserRequest {
                username: username.to_string(),
                role,
            })
            .await
        {
            Ok(reply) => reply.applied().map(|_| ()),
            Err(err) => Err(err),
        };
        self.settle_users(outcome, "User created successfully").await
    }

    pub async fn update_user(
        &mut self,
        user_id: i64,
        username: Option<String>,
        role: Option<Role>,
    ) -> Notification {
        let outcome = match self
            .backend
            .update_user(user_id, UpdateUserRequest { username, role })
            .await
        {
            Ok(reply) => reply.applied().map(|_| ()),
            Err(err) => Err(err),
        };
        self.settle_users(outcome, "User updated successfully").await
    }

    pub async fn delete_user(&mut self, user_id: i64) -> Notification {
        let name = self
            .users
            .find(user_id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| format!("#{}", user_id));
        match self.ask(&delete_user_prompt(&name)) {
            Ok(true) => {},
            Ok(false) => return self.declined(),
            Err(err) => return self.fail(err),
        }
        let outcome = match self.backend.delete_user(user_id).await {
            Ok(reply) => reply.applied().map(|_| ()),
            Err(err) => Err(err),
        };
        self.settle_users(outcome, "User deleted successfully").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{AlwaysConfirm, ScriptedConfirmer};
    use crate::memory::InMemoryBackend;
    use crate::test_utils::TestContext;

    async fn admin_session(ctx: &TestContext) -> TrackerSession<InMemoryBackend, AlwaysConfirm> {
        let mut session = TrackerSession::new(
            ctx.admin_backend(),
            AlwaysConfirm,
            Identity::new(ctx.admin, Role::Admin),
        );
        session.load().await;
        session
    }

    #[tokio::test]
    async fn test_load_signals_empty() {
        let ctx = TestContext::new().await;
        let mut session = TrackerSession::new(
            ctx.admin_backend(),
            AlwaysConfirm,
            Identity::new(ctx.admin, Role::Admin),
        );
        let notification = session.load().await;
        assert_eq!(notification.message, "No tasks yet");
        assert!(session.is_empty());
        assert_eq!(session.users().users().len(), 2);
    }

    #[tokio::test]
    async fn test_create_selects_new_task() {
        let ctx = TestContext::new().await;
        let mut session = admin_session(&ctx).await;

        let notification = session.create_task("Skybox", None, vec![]).await;
        assert_eq!(notification.level, NotificationLevel::Success);
        assert_eq!(session.store().len(), 1);
        let id = session.store().tasks()[0].id;
        assert_eq!(session.view().selected, Some(id));
        assert!(session.layout().node(id).unwrap().selected);
    }

    #[tokio::test]
    async fn test_declined_confirmation_sends_nothing() {
        let ctx = TestContext::new().await;
        let id = ctx.create("Skybox", &[]).await;
        let mut session = TrackerSession::new(
            ctx.admin_backend(),
            ScriptedConfirmer::new([false]),
            Identity::new(ctx.admin, Role::Admin),
        );
        session.load().await;

        let notification = session.delete_task(id).await;
        assert_eq!(notification.message, "Cancelled");
        assert_eq!(ctx.state.task_count().await, 1);
        assert_eq!(session.confirmer().prompts(), &[DELETE_PROMPT.to_string()]);
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_unchanged() {
        let ctx = TestContext::new().await;
        let parent = ctx.create("Parent", &[]).await;
        ctx.create("Child", &[parent]).await;
        let mut session = admin_session(&ctx).await;

        let before = session.store().tasks().to_vec();
        let notification = session.delete_task(parent).await;
        assert!(notification.is_error());
        assert_eq!(notification.message, "Cannot delete task with children");
        assert_eq!(session.store().tasks(), before.as_slice());
    }

    #[tokio::test]
    async fn test_graph_uses_selected_focal() {
        let ctx = TestContext::new().await;
        let root = ctx.create("Root", &[]).await;
        let leaf = ctx.create("Leaf", &[root]).await;
        let mut session = admin_session(&ctx).await;

        assert!(session.graph().is_none());
        session.select(Some(leaf));
        let levels = session.graph().unwrap();
        assert_eq!(levels.level_of(leaf), Some(0));
        assert_eq!(levels.level_of(root), Some(1));
    }

    #[tokio::test]
    async fn test_select_unknown_task_clears_selection() {
        let ctx = TestContext::new().await;
        let mut session = admin_session(&ctx).await;
        session.select(Some(77));
        assert_eq!(session.view().selected, None);
    }

    #[tokio::test]
    async fn test_task_detail_history_newest_first() {
        let ctx = TestContext::new().await;
        let id = ctx.create("Lighting", &[]).await;
        let mut session = admin_session(&ctx).await;
        session.request_status(id, TaskStatus::Started).await;
        session.request_status(id, TaskStatus::Functional).await;

        let detail = session.task_detail(id).await.unwrap();
        assert_eq!(detail.history.len(), 2);
        assert_eq!(detail.history[0].new_status, TaskStatus::Functional);
        assert_eq!(detail.assignment, AssignmentControl::Assign);
        assert_eq!(detail.user_options[0].label, "Unassigned");
        assert!(detail.can_manage);
    }

    #[tokio::test]
    async fn test_task_detail_placeholder_for_uncached_relation() {
        let ctx = TestContext::new().await;
        let parent = ctx.create("Parent", &[]).await;
        let mut session = admin_session(&ctx).await;
        // Created after the last refresh
        let child = ctx.create("Child", &[parent]).await;

        let detail = session.task_detail(parent).await.unwrap();
        assert_eq!(
            detail.children,
            vec![RelatedTask {
                id: child,
                title: None
            }]
        );
        session.refresh().await.unwrap();
        let detail = session.task_detail(parent).await.unwrap();
        assert_eq!(detail.children[0].title.as_deref(), Some("Child"));
    }

    #[tokio::test]
    async fn test_notifications_are_queued() {
        let ctx = TestContext::new().await;
        let mut session = admin_session(&ctx).await;
        session.create_task("A", None, vec![]).await;
        let queued = session.take_notifications();
        assert_eq!(queued.len(), 2);
        assert!(session.notifications().is_empty());
    }
}
