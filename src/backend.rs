//! Storage collaborator interface.
//!
//! Everything the core persists goes through [`StorageBackend`]. Two
//! implementations ship with the crate: [`crate::client::HttpBackend`] talks
//! to a REST server, [`crate::memory::InMemoryBackend`] keeps the data in
//! process. A backend instance always acts on behalf of a single user.

use std::future::Future;

use crate::error::{Result, TrackerError};
use crate::models::{
    CreateTaskRequest, CreateUserRequest, MutationResponse, Task, UpdateTaskRequest,
    UpdateUserRequest, User,
};

/// Outcome of a mutating call that reached the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `{success: true}`. A refresh is required.
    Applied {
        task_id: Option<i64>,
        message: Option<String>,
    },
    /// `{warning: true, message}`. Needs explicit confirmation before retrying
    /// with the override flag.
    Warning(String),
    /// `{success: false, message}`. Nothing changed.
    Rejected(String),
}

impl Reply {
    pub fn is_applied(&self) -> bool {
        matches!(self, Reply::Applied { .. })
    }

    /// Turn a rejection into an error, keep warnings and applied replies
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Rejected(message) => Err(TrackerError::Rejected(message)),
            other => Ok(other),
        }
    }

    /// Require an applied reply. Warnings count as rejections here.
    pub fn applied(self) -> Result<Option<i64>> {
        match self {
            Reply::Applied { task_id, .. } => Ok(task_id),
            Reply::Warning(message) | Reply::Rejected(message) => {
                Err(TrackerError::Rejected(message))
            },
        }
    }
}

impl From<MutationResponse> for Reply {
    fn from(response: MutationResponse) -> Self {
        if response.warning {
            Reply::Warning(response.message.unwrap_or_default())
        } else if response.success {
            Reply::Applied {
                task_id: response.task_id,
                message: response.message,
            }
        } else {
            Reply::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Request rejected".to_string()),
            )
        }
    }
}

/// REST-style storage collaborator.
pub trait StorageBackend: Send + Sync {
    // ── Tasks ───────────────────────────────────────────────────────

    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>>> + Send;

    /// Full task including documentation and history
    fn get_task(&self, id: i64) -> impl Future<Output = Result<Task>> + Send;

    fn create_task(&self, request: CreateTaskRequest)
        -> impl Future<Output = Result<Reply>> + Send;

    fn update_task(
        &self,
        id: i64,
        request: UpdateTaskRequest,
    ) -> impl Future<Output = Result<Reply>> + Send;

    fn delete_task(&self, id: i64) -> impl Future<Output = Result<Reply>> + Send;

    // ── Assignment ──────────────────────────────────────────────────

    /// Claim for the acting user
    fn claim_task(&self, id: i64) -> impl Future<Output = Result<Reply>> + Send;

    /// Used for both abandon and unassign
    fn unassign_task(&self, id: i64) -> impl Future<Output = Result<Reply>> + Send;

    fn assign_task(
        &self,
        id: i64,
        user_id: Option<i64>,
    ) -> impl Future<Output = Result<Reply>> + Send;

    // ── Edges ───────────────────────────────────────────────────────

    fn add_parent(&self, id: i64, parent_id: i64) -> impl Future<Output = Result<Reply>> + Send;

    fn remove_parent(
        &self,
        id: i64,
        parent_id: i64,
    ) -> impl Future<Output = Result<Reply>> + Send;

    fn add_child(&self, id: i64, child_id: i64) -> impl Future<Output = Result<Reply>> + Send;

    // ── Users ───────────────────────────────────────────────────────

    fn list_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    fn create_user(&self, request: CreateUserRequest)
        -> impl Future<Output = Result<Reply>> + Send;

    fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> impl Future<Output = Result<Reply>> + Send;

    fn delete_user(&self, id: i64) -> impl Future<Output = Result<Reply>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_from_response() {
        assert_eq!(
            Reply::from(MutationResponse::created(9)),
            Reply::Applied {
                task_id: Some(9),
                message: None
            }
        );
        assert_eq!(
            Reply::from(MutationResponse::warning("children unfinished")),
            Reply::Warning("children unfinished".into())
        );
        assert_eq!(
            Reply::from(MutationResponse::failure("Permission denied")),
            Reply::Rejected("Permission denied".into())
        );
    }

    #[test]
    fn test_rejection_without_message_gets_default() {
        let reply = Reply::from(MutationResponse {
            success: false,
            ..MutationResponse::default()
        });
        assert_eq!(reply, Reply::Rejected("Request rejected".into()));
    }

    #[test]
    fn test_into_result() {
        assert!(matches!(
            Reply::Rejected("no".into()).into_result(),
            Err(TrackerError::Rejected(_))
        ));
        assert!(Reply::Warning("w".into()).into_result().is_ok());
    }

    #[test]
    fn test_applied() {
        let reply = Reply::Applied {
            task_id: Some(3),
            message: None,
        };
        assert_eq!(reply.applied().unwrap(), Some(3));
        assert!(Reply::Warning("w".into()).applied().is_err());
    }
}
