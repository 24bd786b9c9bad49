use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::task::{Priority, Task};

/// What the calendar view consumes: one event per task with a due date,
/// colored by priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub color: &'static str,
}

pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "#e53e3e",
        Priority::Medium => "#d97706",
        Priority::Low => "#059669",
    }
}

pub fn events(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks
        .iter()
        .filter_map(|task| {
            let start = task.due_date?;
            Some(CalendarEvent {
                id: task.id,
                title: task.title.clone(),
                start,
                color: priority_color(task.priority),
            })
        })
        .collect()
}
