use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category;
use crate::error::Error;

/// Kanban column a task lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl Status {
    /// Columns in board display order.
    pub const COLUMNS: [Status; 3] = [Status::Todo, Status::InProgress, Status::Completed];

    pub fn column_title(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Todo
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Todo => write!(f, "todo"),
            Status::InProgress => write!(f, "inProgress"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" => Ok(Status::Todo),
            "inprogress" | "in-progress" | "in_progress" | "doing" => Ok(Status::InProgress),
            "completed" | "done" => Ok(Status::Completed),
            other => Err(Error::validation(format!(
                "unknown status '{other}'; expected todo, in-progress or completed"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::validation(format!(
                "unknown priority '{other}'; expected low, medium or high"
            ))),
        }
    }
}

/// Stored verbatim on the task; no repeat logic interprets it yet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => write!(f, "none"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(Error::validation(format!(
                "unknown recurrence '{other}'; expected none, daily, weekly or monthly"
            ))),
        }
    }
}

/// File captured at task creation as a base64 data URL. Immutable for the
/// lifetime of the task; edits never touch the attachment list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Reference by name. May point at a deleted category, in which case
    /// readers treat it as the sentinel.
    #[serde(default = "category::sentinel")]
    pub category: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub recurrence: Recurrence,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub status: Status,

    pub created_at: DateTime<Utc>,

    /// Display rank within the status column. Dense 0..n-1 only after an
    /// explicit reorder; creation appends past the current maximum.
    #[serde(default)]
    pub order_index: u32,
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>, order_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            due_date: draft.due_date,
            recurrence: draft.recurrence,
            attachments: draft.attachments,
            status: draft.status,
            created_at: now,
            order_index,
        }
    }

    /// Category name with dangling references collapsed to the sentinel.
    pub fn effective_category<'a>(&'a self, known: &[category::Category]) -> &'a str {
        if self.category.is_empty() {
            return category::UNCATEGORIZED;
        }
        if known.iter().any(|c| c.name == self.category) {
            &self.category
        } else {
            category::UNCATEGORIZED
        }
    }
}

/// Everything the boundary layer supplies for creation. Id, timestamps and
/// order index are assigned by the repository.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub recurrence: Recurrence,
    pub attachments: Vec<Attachment>,
    pub status: Status,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: category::sentinel(),
            priority: Priority::default(),
            due_date: None,
            recurrence: Recurrence::default(),
            attachments: vec![],
            status: Status::default(),
        }
    }
}

/// Fields reachable through the edit path. `status`, `order_index`, `id`,
/// `created_at` and `attachments` are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    /// Outer option: whether to touch the field. Inner: the new value,
    /// `None` clearing the due date.
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub recurrence: Option<Recurrence>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.recurrence.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(recurrence) = self.recurrence {
            task.recurrence = recurrence;
        }
    }
}
