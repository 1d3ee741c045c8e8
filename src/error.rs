use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Task cannot be its own {relation}")]
    SelfReference { task_id: i64, relation: &'static str },

    #[error("{0}")]
    Rejected(String),

    #[error("Action not allowed: {0}")]
    ActionNotAllowed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No status change is awaiting confirmation")]
    NoPendingTransition,

    #[error("Unexpected response (HTTP {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl TrackerError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            TrackerError::Http(_) => "TRANSPORT_ERROR",
            TrackerError::UnexpectedResponse { .. } => "TRANSPORT_ERROR",
            TrackerError::TaskNotFound(_) => "TASK_NOT_FOUND",
            TrackerError::UserNotFound(_) => "USER_NOT_FOUND",
            TrackerError::SelfReference { .. } => "SELF_REFERENCE",
            TrackerError::Rejected(_) => "REJECTED",
            TrackerError::ActionNotAllowed(_) => "ACTION_NOT_ALLOWED",
            TrackerError::InvalidInput(_) => "INVALID_INPUT",
            TrackerError::NoPendingTransition => "NO_PENDING_TRANSITION",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }

    /// Network or decoding failure, as opposed to a decision by the collaborator
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TrackerError::Http(_) | TrackerError::Json(_) | TrackerError::UnexpectedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
