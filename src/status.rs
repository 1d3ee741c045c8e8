use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task lifecycle status.
///
/// Declaration order is the linear progression a task moves through. It is
/// NOT the order used to rank the task list; see [`TaskStatus::list_priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    Started,
    Functional,
    Documented,
    Integrated,
}

/// Sidebar ranking table. Lower number = shown first.
///
/// Untouched work (`NotStarted`) sinks below everything else even though it
/// comes first in the progression.
const LIST_PRIORITY: [(TaskStatus, u8); 5] = [
    (TaskStatus::Started, 0),
    (TaskStatus::Functional, 1),
    (TaskStatus::Documented, 2),
    (TaskStatus::Integrated, 3),
    (TaskStatus::NotStarted, 4),
];

impl TaskStatus {
    /// All statuses in progression order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::Started,
        TaskStatus::Functional,
        TaskStatus::Documented,
        TaskStatus::Integrated,
    ];

    /// Wire key (`not_started`, `started`, ...)
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Started => "started",
            TaskStatus::Functional => "functional",
            TaskStatus::Documented => "documented",
            TaskStatus::Integrated => "integrated",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::Started => "Started",
            TaskStatus::Functional => "Functional",
            TaskStatus::Documented => "Documented",
            TaskStatus::Integrated => "Integrated",
        }
    }

    /// Position in the progression (not_started = 0 .. integrated = 4)
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Ranking priority for the task list
    pub fn list_priority(self) -> u8 {
        LIST_PRIORITY
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, priority)| *priority)
            .unwrap_or(u8::MAX)
    }

    /// Next status in the progression, `None` once integrated
    pub fn next(self) -> Option<TaskStatus> {
        TaskStatus::ALL.get(self.ordinal() + 1).copied()
    }

    /// True when the status has reached at least `functional`
    pub fn is_at_least_functional(self) -> bool {
        self.ordinal() >= TaskStatus::Functional.ordinal()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TrackerError;

    /// Accepts wire keys and labels, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                TrackerError::InvalidInput(format!(
                    "Invalid status '{}'. Valid values: not_started, started, functional, documented, integrated",
                    s
                ))
            })
    }
}
