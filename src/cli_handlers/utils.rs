//! Output helpers shared by the command handlers

use serde::Serialize;

use crate::error::{Result, TrackerError};
use crate::session::{Notification, NotificationLevel};
use crate::status::TaskStatus;

/// One-character marker for a status
pub fn status_badge(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "○",
        TaskStatus::Started => "→",
        TaskStatus::Functional => "◐",
        TaskStatus::Documented => "◑",
        TaskStatus::Integrated => "✓",
    }
}

pub fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn notification_prefix(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Success => "✓",
        NotificationLevel::Info => "ℹ",
        NotificationLevel::Warning => "⚠",
        NotificationLevel::Error => "✗",
    }
}

pub fn format_notification(notification: &Notification) -> String {
    format!(
        "{} {}",
        notification_prefix(notification.level),
        notification.message
    )
}

/// Print the outcome of an action; an error notification fails the command
pub fn finish(notification: Notification) -> Result<()> {
    if notification.is_error() {
        return Err(TrackerError::Rejected(notification.message));
    }
    println!("{}", format_notification(&notification));
    Ok(())
}

/// Shorten to `max` characters, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
