//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskgraph::backend::{Reply, StorageBackend};
use taskgraph::confirm::{AlwaysConfirm, Confirmer};
use taskgraph::error::Result;
use taskgraph::memory::{InMemoryBackend, MemoryState};
use taskgraph::models::{
    CreateTaskRequest, CreateUserRequest, Identity, Role, Task, UpdateTaskRequest,
    UpdateUserRequest, User,
};
use taskgraph::session::TrackerSession;

/// Path to the `tg` binary
#[allow(deprecated)]
pub fn tg_binary() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_tg")
        .map(PathBuf::from)
        .unwrap_or_else(|_| assert_cmd::cargo::cargo_bin("tg"))
}

/// Collaborator with one admin and one developer
pub struct Fixture {
    pub state: MemoryState,
    pub admin: i64,
    pub dev: i64,
}

impl Fixture {
    pub async fn new() -> Self {
        let state = MemoryState::new();
        let admin = state.add_user("admin", Role::Admin).await;
        let dev = state.add_user("dev", Role::Developer).await;
        Self { state, admin, dev }
    }

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

    pub async fn session<C: Confirmer>(
        &self,
        user_id: i64,
        role: Role,
        confirmer: C,
    ) -> TrackerSession<InMemoryBackend, C> {
        let mut session = TrackerSession::new(
            self.state.backend_for(user_id),
            confirmer,
            Identity::new(user_id, role),
        );
        session.load().await;
        session
    }

    pub async fn admin_session(&self) -> TrackerSession<InMemoryBackend, AlwaysConfirm> {
        self.session(self.admin, Role::Admin, AlwaysConfirm).await
    }

    pub async fn dev_session(&self) -> TrackerSession<InMemoryBackend, AlwaysConfirm> {
        self.session(self.dev, Role::Developer, AlwaysConfirm).await
    }
}

/// Wraps a backend and counts every call that reaches it
#[derive(Clone)]
pub struct CountingBackend<B> {
    inner: B,
    calls: Arc<AtomicUsize>,
    mutations: Arc<AtomicUsize>,
}

impl<B: StorageBackend> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
            mutations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

impl<B: StorageBackend> StorageBackend for CountingBackend<B> {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.read();
        self.inner.list_tasks().await
    }

    async fn get_task(&self, id: i64) -> Result<Task> {
        self.read();
        self.inner.get_task(id).await
    }

    async fn create_task(&self, request: CreateTaskRequest) -> Result<Reply> {
        self.write();
        self.inner.create_task(request).await
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Reply> {
        self.write();
        self.inner.update_task(id, request).await
    }

    async fn delete_task(&self, id: i64) -> Result<Reply> {
        self.write();
        self.inner.delete_task(id).await
    }

    async fn claim_task(&self, id: i64) -> Result<Reply> {
        self.write();
        self.inner.claim_task(id).await
    }

    async fn unassign_task(&self, id: i64) -> Result<Reply> {
        self.write();
        self.inner.unassign_task(id).await
    }

    async fn assign_task(&self, id: i64, user_id: Option<i64>) -> Result<Reply> {
        self.write();
        self.inner.assign_task(id, user_id).await
    }

    async fn add_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        self.write();
        self.inner.add_parent(id, parent_id).await
    }

    async fn remove_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        self.write();
        self.inner.remove_parent(id, parent_id).await
    }

    async fn add_child(&self, id: i64, child_id: i64) -> Result<Reply> {
        self.write();
        self.inner.add_child(id, child_id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.read();
        self.inner.list_users().await
    }

    async fn create_user(&self, request: CreateUserRequest) -> Result<Reply> {
        self.write();
        self.inner.create_user(request).await
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<Reply> {
        self.write();
        self.inner.update_user(id, request).await
    }

    async fn delete_user(&self, id: i64) -> Result<Reply> {
        self.write();
        self.inner.delete_user(id).await
    }
}
