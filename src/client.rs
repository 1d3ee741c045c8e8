//! HTTP client for the storage collaborator.
//!
//! Mutation endpoints answer with a `{success, warning, message}` body even
//! when the HTTP status is an error (403 for permission failures), so the body
//! is decoded before the status is looked at.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{Reply, StorageBackend};
use crate::error::{Result, TrackerError};
use crate::models::{
    AssignRequest, ChildRequest, CreateTaskRequest, CreateUserRequest, MutationResponse,
    ParentRequest, Task, UpdateTaskRequest, UpdateUserRequest, User,
};

/// Header carrying the acting user id
pub const USER_HEADER: &str = "x-user-id";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    user_id: i64,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, user_id: i64) -> Result<Self> {
        Self::with_timeout(base_url, user_id, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        user_id: i64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            user_id,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, url = %url, "Collaborator request");
        self.client
            .request(method, url)
            .header(USER_HEADER, self.user_id.to_string())
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(TrackerError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Reply> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<MutationResponse>(&text) {
            Ok(parsed) => {
                let reply = Reply::from(parsed);
                if !reply.is_applied() {
                    tracing::debug!(http_status = status.as_u16(), reply = ?reply, "Mutation not applied");
                }
                Ok(reply)
            },
            Err(_) => Err(TrackerError::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

impl StorageBackend for HttpBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.fetch("/api/tasks").await
    }

    async fn get_task(&self, id: i64) -> Result<Task> {
        let path = format!("/api/task/{}", id);
        let response = self.request(Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TrackerError::TaskNotFound(id));
        }
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(TrackerError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn create_task(&self, request: CreateTaskRequest) -> Result<Reply> {
        self.mutate(Method::POST, "/api/task", Some(&request)).await
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Reply> {
        self.mutate(Method::PUT, &format!("/api/task/{}", id), Some(&request))
            .await
    }

    async fn delete_task(&self, id: i64) -> Result<Reply> {
        self.mutate::<()>(Method::DELETE, &format!("/api/task/{}", id), None)
            .await
    }

    async fn claim_task(&self, id: i64) -> Result<Reply> {
        self.mutate::<()>(Method::POST, &format!("/api/task/{}/request", id), None)
            .await
    }

    async fn unassign_task(&self, id: i64) -> Result<Reply> {
        self.mutate::<()>(Method::POST, &format!("/api/task/{}/unassign", id), None)
            .await
    }

    async fn assign_task(&self, id: i64, user_id: Option<i64>) -> Result<Reply> {
        self.mutate(
            Method::POST,
            &format!("/api/task/{}/assign", id),
            Some(&AssignRequest { user_id }),
        )
        .await
    }

    async fn add_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        self.mutate(
            Method::POST,
            &format!("/api/task/{}/parents", id),
            Some(&ParentRequest {
                parent_id: Some(parent_id),
            }),
        )
        .await
    }

    async fn remove_parent(&self, id: i64, parent_id: i64) -> Result<Reply> {
        self.mutate::<()>(
            Method::DELETE,
            &format!("/api/task/{}/parents/{}", id, parent_id),
            None,
        )
        .await
    }

    async fn add_child(&self, id: i64, child_id: i64) -> Result<Reply> {
        self.mutate(
            Method::POST,
            &format!("/api/task/{}/children", id),
            Some(&ChildRequest {
                child_id: Some(child_id),
            }),
        )
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.fetch("/api/users").await
    }

    async fn create_user(&self, request: CreateUserRequest) -> Result<Reply> {
        self.mutate(Method::POST, "/api/users", Some(&request)).await
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<Reply> {
        self.mutate(Method::PUT, &format!("/api/user/{}", id), Some(&request))
            .await
    }

    async fn delete_user(&self, id: i64) -> Result<Reply> {
        self.mutate::<()>(Method::DELETE, &format!("/api/user/{}", id), None)
            .await
    }
}
