//! REST server exposing a [`MemoryState`] over the collaborator routes.

pub mod handlers;
pub mod routes;

use anyhow::{Context, Result};
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::memory::MemoryState;
use crate::models::Role;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: MemoryState,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub struct TaskServer {
    config: ServerConfig,
    state: MemoryState,
}

impl TaskServer {
    pub fn new(config: ServerConfig, state: MemoryState) -> Self {
        Self { config, state }
    }

    /// Seed the configured admin account, then serve until the process exits
    pub async fn run(self) -> Result<()> {
        if let Some(username) = &self.config.seed_admin {
            let id = self.state.add_user(username, Role::Admin).await;
            tracing::info!(user_id = id, username = %username, "Seeded admin account");
        }

        let listener = tokio::net::TcpListener::bind(&self.config.bind)
            .await
            .with_context(|| format!("Failed to bind to {}", self.config.bind))?;
        tracing::info!("Task server listening on {}", self.config.bind);

        axum::serve(listener, router(self.state))
            .await
            .context("Server error")?;
        Ok(())
    }
}

/// Build the router with all routes and middleware
pub fn router(store: MemoryState) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .merge(routes::api_routes());

    Router::new()
        .nest("/api", api)
        .with_state(AppState { store })
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "taskgraph",
        version: env!("CARGO_PKG_VERSION"),
    })
}
