//! Status transition protocol and assignment eligibility.
//!
//! The collaborator owns validation. This module decides which controls to
//! offer, runs the soft-warning confirmation round-trip, and checks
//! eligibility locally before a request goes out.

use crate::backend::{Reply, StorageBackend};
use crate::error::{Result, TrackerError};
use crate::models::{Identity, Task, UpdateTaskRequest};
use crate::status::TaskStatus;

pub fn can_claim(task: &Task) -> bool {
    task.assignee_id.is_none() && task.status == TaskStatus::NotStarted
}

pub fn can_abandon(task: &Task, identity: &Identity) -> bool {
    task.is_assigned_to(identity.user_id) && task.status != TaskStatus::Integrated
}

pub fn can_manage(task: &Task, identity: &Identity) -> bool {
    identity.is_admin() || task.creator_id == identity.user_id
}

/// Which assignment control the detail view offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentControl {
    Abandon,
    Unassign,
    Assign,
    None,
}

pub fn assignment_control(task: &Task, identity: &Identity) -> AssignmentControl {
    if can_abandon(task, identity) {
        AssignmentControl::Abandon
    } else if task.is_assigned() && can_manage(task, identity) {
        AssignmentControl::Unassign
    } else if !task.is_assigned() && can_manage(task, identity) {
        AssignmentControl::Assign
    } else {
        AssignmentControl::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOption {
    pub status: TaskStatus,
    pub label: &'static str,
    /// Current status of the task
    pub active: bool,
    /// Suggested next step
    pub highlighted: bool,
}

pub fn status_options(task: &Task) -> Vec<StatusOption> {
    TaskStatus::ALL
        .iter()
        .map(|&status| StatusOption {
            status,
            label: status.label(),
            active: status == task.status,
            highlighted: task.next_status_highlight == Some(status),
        })
        .collect()
}

/// A status change waiting for the user to override a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub task_id: i64,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// Collaborator objected; nothing changed until confirmed
    NeedsConfirmation(String),
}

#[derive(Debug, Clone)]
pub struct TaskStateMachine {
    identity: Identity,
    pending: Option<PendingTransition>,
}

impl TaskStateMachine {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            pending: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Ask for a status change without override.
    ///
    /// A warning replaces any earlier pending record.
    pub async fn request_transition<B: StorageBackend>(
        &mut self,
        backend: &B,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<TransitionOutcome> {
        let reply = backend
            .update_task(task_id, UpdateTaskRequest::status(status, false))
            .await?;

        match reply {
            Reply::Applied { .. } => Ok(TransitionOutcome::Applied),
            Reply::Warning(message) => {
                if let Some(previous) = self.pending.replace(PendingTransition { task_id, status }) {
                    tracing::debug!(
                        task_id = previous.task_id,
                        status = %previous.status,
                        "Pending transition superseded"
                    );
                }
                tracing::info!(task_id, status = %status, "Transition needs confirmation");
                Ok(TransitionOutcome::NeedsConfirmation(message))
            },
            Reply::Rejected(message) => Err(TrackerError::Rejected(message)),
        }
    }

    /// Resend the pending change with the override flag and clear it
    pub async fn confirm_transition<B: StorageBackend>(
        &mut self,
        backend: &B,
    ) -> Result<PendingTransition> {
        let pending = self.pending.take().ok_or(TrackerError::NoPendingTransition)?;
        backend
            .update_task(
                pending.task_id,
                UpdateTaskRequest::status(pending.status, true),
            )
            .await?
            .applied()?;
        tracing::info!(
            task_id = pending.task_id,
            status = %pending.status,
            "Transition confirmed with override"
        );
        Ok(pending)
    }

    pub fn cancel_transition(&mut self) -> Option<PendingTransition> {
        self.pending.take()
    }

    pub async fn claim<B: StorageBackend>(&self, backend: &B, task: &Task) -> Result<()> {
        if !can_claim(task) {
            let reason = if task.is_assigned() {
                "Task is already assigned"
            } else {
                "Only not started tasks can be claimed"
            };
            return Err(TrackerError::ActionNotAllowed(reason.to_string()));
        }
        backend.claim_task(task.id).await?.applied()?;
        Ok(())
    }

    pub async fn abandon<B: StorageBackend>(&self, backend: &B, task: &Task) -> Result<()> {
        if !can_abandon(task, &self.identity) {
            return Err(TrackerError::ActionNotAllowed(
                "Only the assignee can abandon an unfinished task".to_string(),
            ));
        }
        backend.unassign_task(task.id).await?.applied()?;
        Ok(())
    }

    pub async fn unassign<B: StorageBackend>(&self, backend: &B, task: &Task) -> Result<()> {
        if !can_manage(task, &self.identity) {
            return Err(TrackerError::ActionNotAllowed(
                "Only an admin or the task creator can unassign".to_string(),
            ));
        }
        backend.unassign_task(task.id).await?.applied()?;
        Ok(())
    }

    /// `None` clears the assignment
    pub async fn assign<B: StorageBackend>(
        &self,
        backend: &B,
        task: &Task,
        user_id: Option<i64>,
    ) -> Result<()> {
        if !can_manage(task, &self.identity) {
            return Err(TrackerError::ActionNotAllowed(
                "Only an admin or the task creator can assign".to_string(),
            ));
        }
        backend.assign_task(task.id, user_id).await?.applied()?;
        Ok(())
    }
}
