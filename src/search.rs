//! Free-text matching shared by the task list and the relation pickers.

use crate::models::Task;

const SNIPPET_CHARS: usize = 60;

/// Case-insensitive substring match against title or description.
///
/// An empty query matches everything.
pub fn matches_query(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Tasks a relation picker offers for `current`.
///
/// Unlike the list filter, an empty query offers nothing.
pub fn picker_candidates<'a>(tasks: &'a [Task], current: i64, query: &str) -> Vec<&'a Task> {
    if query.is_empty() {
        return Vec::new();
    }
    tasks
        .iter()
        .filter(|t| t.id != current && matches_query(t, query))
        .collect()
}

/// First 60 characters of the description for picker rows
pub fn description_snippet(task: &Task) -> String {
    match task.description.as_deref() {
        Some(description) if !description.is_empty() => {
            let snippet: String = description.chars().take(SNIPPET_CHARS).collect();
            format!("{}...", snippet)
        },
        _ => "No description".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::task;

    #[test]
    fn test_matches_title_case_insensitively() {
        let t = task(1, "Weapon Recoil");
        assert!(matches_query(&t, "recoil"));
        assert!(matches_query(&t, "WEAPON"));
        assert!(!matches_query(&t, "audio"));
    }

    #[test]
    fn test_matches_description() {
        let mut t = task(1, "Netcode");
        assert!(!matches_query(&t, "rollback"));
        t.description = Some("Rollback prediction for fighters".into());
        assert!(matches_query(&t, "rollback"));
    }

    #[test]
    fn test_empty_query() {
        let tasks = vec![task(1, "A"), task(2, "B")];
        assert!(matches_query(&tasks[0], ""));
        assert!(picker_candidates(&tasks, 1, "").is_empty());
    }

    #[test]
    fn test_picker_excludes_current_task() {
        let tasks = vec![task(1, "Menu"), task(2, "Menu music"), task(3, "Audio")];
        let found: Vec<i64> = picker_candidates(&tasks, 1, "menu").iter().map(|t| t.id).collect();
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn test_non_ascii_matching() {
        let t = task(1, "Ünterwasser Level");
        assert!(matches_query(&t, "ünter"));
        assert!(matches_query(&t, "ÜNTER"));
    }

    #[test]
    fn test_description_snippet() {
        let mut t = task(1, "A");
        assert_eq!(description_snippet(&t), "No description");
        t.description = Some("x".repeat(80));
        assert_eq!(description_snippet(&t).len(), 63);
    }
}
