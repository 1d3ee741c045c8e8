use serde_json::json;

use crate::cli::{ChildCommands, ParentCommands};
use crate::error::{Result, TrackerError};
use crate::session::{NotificationLevel, ViewMode};
use crate::status::TaskStatus;
use crate::transitions::AssignmentControl;

use super::utils::{finish, format_notification, is_json, print_json, status_badge, truncate};
use super::CliSession;

const TITLE_WIDTH: usize = 48;

// ============================================================================
// Views
// ============================================================================

pub fn handle_list(session: &mut CliSession, query: Option<String>, format: &str) -> Result<()> {
    session.set_query(query.unwrap_or_default());
    let entries = session.task_list();

    if is_json(format) {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No tasks found");
        return Ok(());
    }
    for entry in &entries {
        let mut actions = Vec::new();
        if entry.show_claim {
            actions.push("claimable");
        }
        if entry.show_abandon {
            actions.push("yours");
        }
        println!(
            "{} #{:<5} {:<width$} {:<12} {:<10} {}",
            status_badge(entry.status),
            entry.task_id,
            truncate(&entry.title, TITLE_WIDTH),
            entry.status.label(),
            entry.owner_label,
            actions.join(" "),
            width = TITLE_WIDTH,
        );
    }
    Ok(())
}

pub async fn handle_show(session: &CliSession, id: i64, format: &str) -> Result<()> {
    let detail = session.task_detail(id).await?;
    let task = &detail.task;

    let assignment = match detail.assignment {
        AssignmentControl::Assign => "assign",
        AssignmentControl::Abandon => "abandon",
        AssignmentControl::Unassign => "unassign",
        AssignmentControl::None => "none",
    };
    let next = detail
        .status_options
        .iter()
        .find(|option| option.highlighted)
        .map(|option| option.status);

    if is_json(format) {
        return print_json(&json!({
            "task": task,
            "parents": detail.parents,
            "children": detail.children,
            "next_status": next,
            "assignment": assignment,
            "can_edit": detail.can_edit,
            "can_manage": detail.can_manage,
            "history": detail.history,
        }));
    }

    println!(
        "\n{} Task #{}: {}",
        status_badge(task.status),
        task.id,
        task.title
    );
    println!("Status:   {}", task.status.label());
    println!("Owner:    {}", task.owner_label());
    if let Some(creator) = &task.creator {
        println!("Creator:  {}", creator);
    }
    println!("Progress: {}%", task.progress);
    if let Some(status) = next {
        println!("Next:     {}", status.label());
    }
    if assignment != "none" {
        println!("Action:   {}", assignment);
    }

    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        println!("\nDescription:");
        for line in description.lines() {
            println!("  {}", line);
        }
    }
    if let Some(documentation) = task.documentation.as_deref().filter(|d| !d.is_empty()) {
        println!("\nDocumentation:");
        for line in documentation.lines() {
            println!("  {}", line);
        }
    }

    for (heading, related) in [("Parents", &detail.parents), ("Children", &detail.children)] {
        if related.is_empty() {
            continue;
        }
        println!("\n{}:", heading);
        for item in related {
            match &item.title {
                Some(title) => println!("  #{}: {}", item.id, title),
                None => println!("  #{}: Task {}", item.id, item.id),
            }
        }
    }

    if !detail.history.is_empty() {
        println!("\nHistory:");
        for change in &detail.history {
            let from = change.old_status.map_or("(new)", |s| s.label());
            println!(
                "  {} {} -> {} by {}",
                change.timestamp.format("%Y-%m-%d %H:%M"),
                from,
                change.new_status.label(),
                change.user
            );
        }
    }
    println!();
    Ok(())
}

pub fn handle_graph(session: &mut CliSession, id: i64, format: &str) -> Result<()> {
    session.set_mode(ViewMode::Graph);
    session.select(Some(id));
    let levels = session.graph().ok_or(TrackerError::TaskNotFound(id))?;

    let title = |task_id: i64| {
        session
            .store()
            .find_by_id(task_id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| format!("Task {}", task_id))
    };

    if is_json(format) {
        let buckets: Vec<_> = levels
            .buckets()
            .iter()
            .enumerate()
            .map(|(level, ids)| json!({ "level": level, "tasks": ids }))
            .collect();
        let connectors: Vec<_> = levels
            .connectors()
            .iter()
            .map(|c| json!({ "child": c.child, "parent": c.parent }))
            .collect();
        return print_json(&json!({
            "focal": levels.focal(),
            "levels": buckets,
            "connectors": connectors,
        }));
    }

    // Highest level first so parents print above their children
    for (level, ids) in levels.buckets().iter().enumerate().rev() {
        println!("Level {}:", level);
        for &task_id in ids {
            let marker = if task_id == levels.focal() { "*" } else { " " };
            println!("  {} #{}: {}", marker, task_id, title(task_id));
        }
    }
    if !levels.connectors().is_empty() {
        println!("\nConnectors:");
        for connector in levels.connectors() {
            println!("  #{} -> #{}", connector.child, connector.parent);
        }
    }
    Ok(())
}

pub fn handle_tree(session: &mut CliSession, ticks: usize, format: &str) -> Result<()> {
    session.set_mode(ViewMode::Tree);
    let positions = session.tree(ticks);

    if is_json(format) {
        let nodes: Vec<_> = positions
            .iter()
            .map(|p| json!({ "id": p.id, "x": p.x, "y": p.y }))
            .collect();
        let edges: Vec<_> = session
            .layout()
            .edges()
            .iter()
            .map(|e| json!({ "source": e.source, "target": e.target }))
            .collect();
        return print_json(&json!({ "nodes": nodes, "edges": edges }));
    }

    if positions.is_empty() {
        println!("No tasks found");
        return Ok(());
    }
    for position in &positions {
        let label = session
            .layout()
            .node(position.id)
            .map(|n| n.title.clone())
            .unwrap_or_default();
        println!(
            "#{:<5} ({:>8.1}, {:>8.1})  {}",
            position.id,
            position.x,
            position.y,
            truncate(&label, TITLE_WIDTH)
        );
    }
    Ok(())
}

// ============================================================================
// Mutations
// ============================================================================

pub async fn handle_create(
    session: &mut CliSession,
    title: &str,
    description: Option<String>,
    parents: Vec<i64>,
) -> Result<()> {
    let notification = session.create_task(title, description, parents).await;
    let created = session.view().selected;
    finish(notification)?;
    if let Some(id) = created {
        println!("Task #{}", id);
    }
    Ok(())
}

/// Request a status change, resolving a warning through the confirmer
pub async fn handle_status(session: &mut CliSession, id: i64, status: TaskStatus) -> Result<()> {
    let notification = session.request_status(id, status).await;
    if notification.level != NotificationLevel::Warning {
        return finish(notification);
    }
    eprintln!("{}", format_notification(&notification));
    let resolved = session.resolve_warning(&notification.message).await;
    finish(resolved)
}

pub async fn handle_parent_command(session: &mut CliSession, cmd: ParentCommands) -> Result<()> {
    match cmd {
        ParentCommands::Add { id, parent } => finish(session.add_parent(id, parent).await),
        ParentCommands::Remove { id, parent } => finish(session.remove_parent(id, parent).await),
    }
}

pub async fn handle_child_command(session: &mut CliSession, cmd: ChildCommands) -> Result<()> {
    match cmd {
        ChildCommands::Add { id, child } => finish(session.add_child(id, child).await),
    }
}
