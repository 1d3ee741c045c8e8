use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};

use super::AppState;
use crate::client::USER_HEADER;
use crate::memory::{Refusal, RefusalKind, Verdict};
use crate::models::{
    AssignRequest, ChildRequest, CreateTaskRequest, CreateUserRequest, MutationResponse,
    ParentRequest, UpdateTaskRequest, UpdateUserRequest,
};

fn acting_user(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn refusal_status(kind: RefusalKind) -> StatusCode {
    match kind {
        RefusalKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        RefusalKind::Forbidden => StatusCode::FORBIDDEN,
        RefusalKind::NotFound => StatusCode::NOT_FOUND,
    }
}

fn refused(refusal: Refusal) -> Response {
    tracing::info!(kind = ?refusal.kind, message = %refusal.message, "Request refused");
    (
        refusal_status(refusal.kind),
        Json(MutationResponse::failure(refusal.message)),
    )
        .into_response()
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(MutationResponse::failure("Login required")),
    )
        .into_response()
}

/// Rule failures answer 400 with the same body shape as successes
fn respond(verdict: Verdict) -> Response {
    match verdict {
        Ok(response) if response.success || response.warning => {
            (StatusCode::OK, Json(response)).into_response()
        },
        Ok(response) => (StatusCode::BAD_REQUEST, Json(response)).into_response(),
        Err(refusal) => refused(refusal),
    }
}

macro_rules! actor_or_401 {
    ($headers:expr) => {
        match acting_user(&$headers) {
            Some(id) => id,
            None => return unauthenticated(),
        }
    };
}

// ── Tasks ───────────────────────────────────────────────────────────

pub async fn list_tasks(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let actor = actor_or_401!(headers);
    match state.store.list_tasks(actor).await {
        Ok(tasks) => (StatusCode::OK, Json(tasks)).into_response(),
        Err(refusal) => refused(refusal),
    }
}

pub async fn get_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let actor = actor_or_401!(headers);
    match state.store.get_task(actor, id).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(refusal) => refused(refusal),
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.create_task(actor, req).await)
}

pub async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.update_task(actor, id, req).await)
}

pub async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.delete_task(actor, id).await)
}

// ── Assignment ──────────────────────────────────────────────────────

pub async fn claim_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.claim_task(actor, id).await)
}

pub async fn unassign_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.unassign_task(actor, id).await)
}

pub async fn assign_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<AssignRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.assign_task(actor, id, req.user_id).await)
}

// ── Edges ───────────────────────────────────────────────────────────

pub async fn add_parent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ParentRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.add_parent(actor, id, req.parent_id).await)
}

pub async fn remove_parent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, parent_id)): Path<(i64, i64)>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.remove_parent(actor, id, parent_id).await)
}

pub async fn add_child(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ChildRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.add_child(actor, id, req.child_id).await)
}

// ── Users ───────────────────────────────────────────────────────────

pub async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let actor = actor_or_401!(headers);
    match state.store.list_users(actor).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(refusal) => refused(refusal),
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.create_user(actor, req).await)
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.update_user(actor, id, req).await)
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let actor = actor_or_401!(headers);
    respond(state.store.delete_user(actor, id).await)
}
