//! Task binding resolution.
//!
//! Decides which task a session is bound to when it starts, and how its
//! title is finalized when it stops. Manual tasks keep their stored title;
//! auto-track sessions get a user-entered title or a default generated from
//! the stop moment.

use chrono::{DateTime, Local};

use crate::{Task, TaskBinding, DEFAULT_TASK_TITLE};

/// How a stop request must be carried out for the current binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopPlan {
    /// Manual task with a known title: stop right away, no pause, no prompt.
    Immediate {
        /// Title sent with the stop request.
        title: String,
    },
    /// Auto-track session: pause, then ask the user for a title.
    PromptForTitle {
        /// Text the prompt is pre-filled with.
        prefill: String,
    },
}

/// Resolves the binding a new session starts with.
///
/// A selected task found in `tasks` binds with its stored id, title and
/// manual flag. A selected id missing from the list binds as manual when the
/// caller supplied a title, otherwise as a non-manual task with the default
/// title. With no selection, a supplied title creates a manual binding
/// without server id; no title yields the auto-track placeholder.
pub fn resolve_start_binding(
    task_id: Option<i64>,
    manual_title: Option<&str>,
    tasks: &[Task],
    local_id: String,
) -> TaskBinding {
    let manual_title = manual_title.map(str::trim).filter(|t| !t.is_empty());

    match (task_id, manual_title) {
        (Some(id), title) => match tasks.iter().find(|t| t.id == id) {
            Some(task) => TaskBinding {
                task_id: Some(task.id),
                task_local_id: None,
                title: task.title.clone(),
                is_manual: task.is_manual,
            },
            None => match title {
                Some(title) => TaskBinding::manual(id, title),
                None => TaskBinding {
                    task_id: Some(id),
                    task_local_id: None,
                    title: DEFAULT_TASK_TITLE.to_string(),
                    is_manual: false,
                },
            },
        },
        (None, Some(title)) => TaskBinding {
            task_id: None,
            task_local_id: Some(local_id),
            title: title.to_string(),
            is_manual: true,
        },
        (None, None) => TaskBinding::auto_track(local_id),
    }
}

/// Decides how to stop a session bound to `binding`.
pub fn plan_stop(binding: Option<&TaskBinding>) -> StopPlan {
    match binding {
        Some(b) if b.is_manual && !b.title.trim().is_empty() => StopPlan::Immediate {
            title: b.title.clone(),
        },
        Some(b) if !b.title.trim().is_empty() => StopPlan::PromptForTitle {
            prefill: b.title.clone(),
        },
        _ => StopPlan::PromptForTitle {
            prefill: DEFAULT_TASK_TITLE.to_string(),
        },
    }
}

/// Default title for an auto-track session stopped at `stopped_at`.
///
/// Format: `Work Session - Mar 2, 2024 at 09:05 AM`.
pub fn default_title(stopped_at: DateTime<Local>) -> String {
    format!(
        "Work Session - {} at {}",
        stopped_at.format("%b %-d, %Y"),
        stopped_at.format("%I:%M %p")
    )
}

/// Final title: the trimmed input, or the default when the input is blank.
pub fn resolve_title(input: &str, stopped_at: DateTime<Local>) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        default_title(stopped_at)
    } else {
        trimmed.to_string()
    }
}

/// Local id for a binding the server has not assigned an id to yet.
pub fn local_task_id(now: DateTime<Local>) -> String {
    format!("local-{}", now.timestamp_millis())
}
