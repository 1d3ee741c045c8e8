//! End-to-end session flows against the in-memory collaborator

mod common;

use common::{CountingBackend, Fixture};
use taskgraph::confirm::{AlwaysConfirm, ScriptedConfirmer};
use taskgraph::models::{Identity, Role};
use taskgraph::session::{NotificationLevel, TrackerSession};
use taskgraph::status::TaskStatus;
use taskgraph::transitions::{can_abandon, can_claim};

#[tokio::test]
async fn test_warning_leaves_status_until_confirmed() {
    let fx = Fixture::new().await;
    let parent = fx.create("Weapons", &[]).await;
    fx.create("Rifle", &[parent]).await;
    let mut session = fx.admin_session().await;

    let notification = session.request_status(parent, TaskStatus::Started).await;
    assert_eq!(notification.level, NotificationLevel::Warning);
    assert!(notification.message.contains("Rifle"));
    assert_eq!(session.pending().map(|p| p.task_id), Some(parent));
    assert_eq!(
        fx.state.get_task(fx.admin, parent).await.unwrap().status,
        TaskStatus::NotStarted
    );

    let notification = session.confirm_warning().await;
    assert_eq!(notification.level, NotificationLevel::Success);
    assert!(session.pending().is_none());

    let task = session.store().find_by_id(parent).unwrap().clone();
    assert_eq!(task.status, TaskStatus::Started);
    let detail = session.task_detail(parent).await.unwrap();
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].new_status, TaskStatus::Started);
}

#[tokio::test]
async fn test_cancelled_warning_does_not_leak_into_later_updates() {
    let fx = Fixture::new().await;
    let parent = fx.create("Audio", &[]).await;
    fx.create("Footsteps", &[parent]).await;
    let mut session = fx.admin_session().await;

    session.request_status(parent, TaskStatus::Functional).await;
    let cancelled = session.cancel_warning().unwrap();
    assert_eq!(cancelled.status, TaskStatus::Functional);
    assert!(session.pending().is_none());

    let notification = session
        .edit_task(parent, Some("Audio mix".to_string()), None)
        .await;
    assert_eq!(notification.level, NotificationLevel::Success);

    let task = session.store().find_by_id(parent).unwrap();
    assert_eq!(task.title, "Audio mix");
    assert_eq!(task.status, TaskStatus::NotStarted);
    assert!(!task.override_warning);

    // Nothing left to confirm
    let notification = session.confirm_warning().await;
    assert!(notification.is_error());
}

#[tokio::test]
async fn test_latest_warning_replaces_pending() {
    let fx = Fixture::new().await;
    let first = fx.create("Menus", &[]).await;
    fx.create("Pause menu", &[first]).await;
    let second = fx.create("Shaders", &[]).await;
    fx.create("Water shader", &[second]).await;
    let mut session = fx.admin_session().await;

    session.request_status(first, TaskStatus::Started).await;
    session.request_status(second, TaskStatus::Functional).await;
    assert_eq!(session.pending().map(|p| p.task_id), Some(second));

    session.confirm_warning().await;
    assert_eq!(
        session.store().find_by_id(first).unwrap().status,
        TaskStatus::NotStarted
    );
    assert_eq!(
        session.store().find_by_id(second).unwrap().status,
        TaskStatus::Functional
    );
}

#[tokio::test]
async fn test_declined_warning_is_cancelled() {
    let fx = Fixture::new().await;
    let parent = fx.create("Netcode", &[]).await;
    fx.create("Rollback", &[parent]).await;
    let mut session = fx
        .session(fx.admin, Role::Admin, ScriptedConfirmer::new([false]))
        .await;

    let warning = session.request_status(parent, TaskStatus::Started).await;
    let notification = session.resolve_warning(&warning.message).await;
    assert_eq!(notification.message, "Cancelled");
    assert!(session.pending().is_none());
    assert_eq!(session.confirmer().prompts(), &[warning.message.clone()]);
    assert_eq!(
        fx.state.get_task(fx.admin, parent).await.unwrap().status,
        TaskStatus::NotStarted
    );
}

#[tokio::test]
async fn test_integrate_gate_rejects_with_message() {
    let fx = Fixture::new().await;
    let parent = fx.create("Release", &[]).await;
    let child = fx.create("Localization", &[parent]).await;
    let mut session = fx.admin_session().await;

    for status in [
        TaskStatus::Started,
        TaskStatus::Functional,
        TaskStatus::Documented,
    ] {
        session.request_status(child, status).await;
    }
    let notification = session.request_status(parent, TaskStatus::Integrated).await;
    assert!(notification.is_error());
    assert!(notification.message.contains("Localization"));
    assert_eq!(
        session.store().find_by_id(parent).unwrap().status,
        TaskStatus::NotStarted
    );
}

#[tokio::test]
async fn test_claim_then_abandon() {
    let fx = Fixture::new().await;
    let id = fx.create("Lighting", &[]).await;
    let mut session = fx.dev_session().await;

    assert!(can_claim(session.store().find_by_id(id).unwrap()));
    let notification = session.claim(id).await;
    assert_eq!(notification.message, "Task claimed");

    let task = session.store().find_by_id(id).unwrap();
    assert!(!can_claim(task));
    assert!(can_abandon(task, session.identity()));
    assert_eq!(task.owner_label(), "dev");

    let notification = session.abandon(id).await;
    assert_eq!(notification.message, "Task abandoned successfully");
    assert!(can_claim(session.store().find_by_id(id).unwrap()));
}

#[tokio::test]
async fn test_two_sessions_racing_a_claim() {
    let fx = Fixture::new().await;
    let id = fx.create("Pathfinding", &[]).await;
    let other = fx.state.add_user("second", Role::Developer).await;

    let mut first = fx.dev_session().await;
    let mut second = fx.session(other, Role::Developer, AlwaysConfirm).await;

    // Both sessions loaded before either claim went out
    let (a, b) = tokio::join!(first.claim(id), second.claim(id));
    let winners = [&a, &b].iter().filter(|n| !n.is_error()).count();
    assert_eq!(winners, 1);

    let loser = if a.is_error() { &a } else { &b };
    assert_eq!(loser.message, "Task already assigned");

    first.refresh().await.unwrap();
    second.refresh().await.unwrap();
    let assignee_seen_by_first = first.store().find_by_id(id).unwrap().assignee_id;
    let assignee_seen_by_second = second.store().find_by_id(id).unwrap().assignee_id;
    assert_eq!(assignee_seen_by_first, assignee_seen_by_second);
    assert!(assignee_seen_by_first.is_some());
}

#[tokio::test]
async fn test_self_reference_never_reaches_collaborator() {
    let fx = Fixture::new().await;
    let id = fx.create("Camera", &[]).await;
    let backend = CountingBackend::new(fx.state.backend_for(fx.admin));
    let counter = backend.clone();

    let mut session = TrackerSession::new(backend, AlwaysConfirm, Identity::new(fx.admin, Role::Admin));
    session.load().await;
    let before = counter.calls();

    let notification = session.add_parent(id, id).await;
    assert!(notification.is_error());
    assert_eq!(notification.message, "Task cannot be its own parent");

    let notification = session.add_child(id, id).await;
    assert_eq!(notification.message, "Task cannot be its own child");

    assert_eq!(counter.calls(), before);
    assert_eq!(counter.mutations(), 0);
}

#[tokio::test]
async fn test_cycle_rejected_and_edges_unchanged() {
    let fx = Fixture::new().await;
    let a = fx.create("Engine", &[]).await;
    let b = fx.create("Renderer", &[a]).await;
    let c = fx.create("Materials", &[b]).await;
    let mut session = fx.admin_session().await;

    let notification = session.add_parent(a, c).await;
    assert_eq!(notification.message, "Circular relationship detected");
    assert!(session.store().find_by_id(a).unwrap().parent_ids.is_empty());

    session.select(Some(c));
    let levels = session.graph().unwrap();
    assert_eq!(levels.level_of(a), Some(2));
}

#[tokio::test]
async fn test_edges_round_trip_through_refresh() {
    let fx = Fixture::new().await;
    let a = fx.create("UI", &[]).await;
    let b = fx.create("HUD", &[]).await;
    let mut session = fx.admin_session().await;

    session.add_child(a, b).await;
    assert!(session.store().find_by_id(b).unwrap().parent_ids.contains(&a));
    assert!(session.layout().edges().iter().any(|e| e.source == a && e.target == b));

    let notification = session.remove_parent(b, a).await;
    assert_eq!(notification.message, "Parent removed");
    assert!(session.store().find_by_id(a).unwrap().child_ids.is_empty());
    assert!(session.layout().edges().is_empty());
}

#[tokio::test]
async fn test_delete_then_refresh_clears_selection() {
    let fx = Fixture::new().await;
    let keep = fx.create("Keep", &[]).await;
    let doomed = fx.create("Doomed", &[]).await;
    let mut session = fx.admin_session().await;
    session.select(Some(doomed));

    let notification = session.delete_task(doomed).await;
    assert_eq!(notification.message, "Task deleted");
    assert!(!session.store().contains(doomed));
    assert!(session.store().contains(keep));
    assert_eq!(session.view().selected, None);
    assert!(session.layout().node(doomed).is_none());
}

#[tokio::test]
async fn test_developer_cannot_delete_foreign_task() {
    let fx = Fixture::new().await;
    let id = fx.create("Admin task", &[]).await;
    let mut session = fx.dev_session().await;

    let notification = session.delete_task(id).await;
    assert!(notification.is_error());
    assert_eq!(notification.message, "Permission denied");
    assert!(session.store().contains(id));
}

#[tokio::test]
async fn test_list_ranks_mine_first() {
    let fx = Fixture::new().await;
    let open = fx.create("Open", &[]).await;
    let mine = fx.create("Mine", &[]).await;
    let mut session = fx.dev_session().await;
    session.claim(mine).await;

    let ids: Vec<i64> = session.task_list().iter().map(|e| e.task_id).collect();
    assert_eq!(ids, vec![mine, open]);

    session.set_query("ope");
    let ids: Vec<i64> = session.task_list().iter().map(|e| e.task_id).collect();
    assert_eq!(ids, vec![open]);
}

#[tokio::test]
async fn test_user_management_refreshes_directory() {
    let fx = Fixture::new().await;
    let mut session = fx.admin_session().await;

    let notification = session.create_user("artist", Role::Developer).await;
    assert_eq!(notification.message, "User created successfully");
    let artist = session
        .users()
        .users()
        .iter()
        .find(|u| u.username == "artist")
        .map(|u| u.id)
        .unwrap();

    session
        .update_user(artist, Some("lead-artist".to_string()), Some(Role::Admin))
        .await;
    let updated = session.users().find(artist).unwrap();
    assert_eq!(updated.username, "lead-artist");
    assert_eq!(updated.role, Role::Admin);

    let notification = session.delete_user(artist).await;
    assert_eq!(notification.message, "User deleted successfully");
    assert!(session.users().find(artist).is_none());
}
