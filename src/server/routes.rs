use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use super::AppState;

/// API routes, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(handlers::list_tasks))
        .route("/task", post(handlers::create_task))
        .route(
            "/task/:id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        // Assignment
        .route("/task/:id/request", post(handlers::claim_task))
        .route("/task/:id/unassign", post(handlers::unassign_task))
        .route("/task/:id/assign", post(handlers::assign_task))
        // Edges
        .route("/task/:id/children", post(handlers::add_child))
        .route("/task/:id/parents", post(handlers::add_parent))
        .route(
            "/task/:id/parents/:parent_id",
            delete(handlers::remove_parent),
        )
        // Users
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/user/:id",
            put(handlers::update_user).delete(handlers::delete_user),
        )
}
