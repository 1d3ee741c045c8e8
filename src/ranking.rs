//! Sidebar ordering.
//!
//! Tasks are grouped mine, unassigned, then everyone else's. Inside each group
//! active work comes first and untouched work sinks to the bottom:
//! started, functional, documented, integrated, not started.

use serde::Serialize;

use crate::models::{Identity, Task};
use crate::search::matches_query;
use crate::status::TaskStatus;
use crate::transitions::{can_abandon, can_claim};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum OwnershipGroup {
    Mine,
    Unassigned,
    Others,
}

fn ownership_group(task: &Task, user_id: i64) -> OwnershipGroup {
    match task.assignee_id {
        Some(id) if id == user_id => OwnershipGroup::Mine,
        None => OwnershipGroup::Unassigned,
        Some(_) => OwnershipGroup::Others,
    }
}

/// Filter by `query`, then stable-sort by (ownership group, status priority)
pub fn rank_tasks<'a>(tasks: &'a [Task], user_id: i64, query: &str) -> Vec<&'a Task> {
    let mut ranked: Vec<&Task> = tasks.iter().filter(|t| matches_query(t, query)).collect();
    // sort_by_key is stable: equal keys keep their input order
    ranked.sort_by_key(|t| (ownership_group(t, user_id), t.status.list_priority()));
    ranked
}

/// One row of the task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_label: String,
    pub status: TaskStatus,
    pub show_claim: bool,
    pub show_abandon: bool,
    pub highlight: Option<TaskStatus>,
    pub selected: bool,
}

pub struct TaskListRanker {
    identity: Identity,
}

impl TaskListRanker {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn rank<'a>(&self, tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
        rank_tasks(tasks, self.identity.user_id, query)
    }

    pub fn entries(&self, tasks: &[Task], query: &str, selected: Option<i64>) -> Vec<ListEntry> {
        self.rank(tasks, query)
            .into_iter()
            .map(|task| ListEntry {
                task_id: task.id,
                title: task.title.clone(),
                description: task.description.clone(),
                owner_label: task.owner_label().to_string(),
                status: task.status,
                show_claim: can_claim(task),
                show_abandon: can_abandon(task, &self.identity),
                highlight: task.next_status_highlight,
                selected: selected == Some(task.id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::test_utils::task;

    const ME: i64 = 5;
    const OTHER: i64 = 6;

    fn with(id: i64, assignee: Option<i64>, status: TaskStatus) -> Task {
        let mut t = task(id, &format!("Task {}", id));
        t.assignee_id = assignee;
        t.status = status;
        t
    }

    fn ids(ranked: &[&Task]) -> Vec<i64> {
        ranked.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_groups_then_status_priority() {
        let tasks = vec![
            with(1, Some(ME), TaskStatus::Functional),
            with(2, None, TaskStatus::Started),
            with(3, Some(OTHER), TaskStatus::NotStarted),
            with(4, Some(ME), TaskStatus::NotStarted),
        ];
        assert_eq!(ids(&rank_tasks(&tasks, ME, "")), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_not_started_sinks_within_group() {
        let tasks = vec![
            with(1, None, TaskStatus::NotStarted),
            with(2, None, TaskStatus::Integrated),
            with(3, None, TaskStatus::Started),
            with(4, None, TaskStatus::Documented),
        ];
        assert_eq!(ids(&rank_tasks(&tasks, ME, "")), vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_others_ordered_by_status() {
        let tasks = vec![
            with(1, Some(OTHER), TaskStatus::NotStarted),
            with(2, Some(7), TaskStatus::Started),
        ];
        assert_eq!(ids(&rank_tasks(&tasks, ME, "")), vec![2, 1]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let tasks = vec![
            with(9, None, TaskStatus::Started),
            with(3, None, TaskStatus::Started),
            with(7, None, TaskStatus::Started),
        ];
        assert_eq!(ids(&rank_tasks(&tasks, ME, "")), vec![9, 3, 7]);
    }

    #[test]
    fn test_filter_before_ranking() {
        let mut tasks = vec![
            with(1, Some(ME), TaskStatus::Started),
            with(2, None, TaskStatus::Started),
        ];
        tasks[1].title = "Particle effects".into();
        assert_eq!(ids(&rank_tasks(&tasks, ME, "PARTICLE")), vec![2]);
    }

    #[test]
    fn test_entries() {
        let mut mine = with(1, Some(ME), TaskStatus::Started);
        mine.assignee = Some("me".into());
        let open = with(2, None, TaskStatus::NotStarted);
        let tasks = vec![open, mine];

        let ranker = TaskListRanker::new(Identity::new(ME, Role::Developer));
        let entries = ranker.entries(&tasks, "", Some(2));

        assert_eq!(entries[0].task_id, 1);
        assert!(entries[0].show_abandon);
        assert!(!entries[0].show_claim);
        assert_eq!(entries[0].owner_label, "me");

        assert_eq!(entries[1].owner_label, "Unassigned");
        assert!(entries[1].show_claim);
        assert!(entries[1].selected);
    }
}
