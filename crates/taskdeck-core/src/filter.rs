use std::str::FromStr;

use chrono::{DateTime, Days, Duration, Utc};
use tracing::trace;

use crate::category;
use crate::datetime::{local_day, local_day_start};
use crate::error::Error;
use crate::task::{Priority, Task};

/// Time-relative due date filter. Day buckets compare local calendar days;
/// `Overdue` compares against the instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueBucket {
    Today,
    Tomorrow,
    Next7,
    Overdue,
    NoDueDate,
    #[default]
    All,
}

impl FromStr for DueBucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DueBucket::Today),
            "tomorrow" => Ok(DueBucket::Tomorrow),
            "next7" => Ok(DueBucket::Next7),
            "overdue" => Ok(DueBucket::Overdue),
            "noduedate" | "none" => Ok(DueBucket::NoDueDate),
            "all" => Ok(DueBucket::All),
            other => Err(Error::validation(format!(
                "unknown due filter '{other}'; expected today, tomorrow, next7, overdue, noduedate or all"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Name(String),
}

impl CategoryFilter {
    /// `"all"` means no constraint; anything else filters on the
    /// normalized name.
    pub fn parse(raw: &str) -> Self {
        let name = category::normalize_name(raw);
        if name.is_empty() || name == category::ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Name(name)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Level(Priority),
}

impl PriorityFilter {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.trim().eq_ignore_ascii_case("all") {
            Ok(PriorityFilter::All)
        } else {
            Ok(PriorityFilter::Level(raw.parse()?))
        }
    }
}

/// The four visibility predicates. A task is visible when every one of
/// them holds. `Default` matches every task.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pub search: String,
    pub category: CategoryFilter,
    pub priority: PriorityFilter,
    pub due: DueBucket,
}

impl Criteria {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let ok = self.matches_search(task)
            && self.matches_category(task)
            && self.matches_priority(task)
            && matches_due(self.due, task, now);
        trace!(id = %task.id, ok, "visibility check");
        ok
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }

    fn matches_category(&self, task: &Task) -> bool {
        match &self.category {
            CategoryFilter::All => true,
            CategoryFilter::Name(name) => task.category == *name,
        }
    }

    fn matches_priority(&self, task: &Task) -> bool {
        match self.priority {
            PriorityFilter::All => true,
            PriorityFilter::Level(level) => task.priority == level,
        }
    }
}

fn matches_due(bucket: DueBucket, task: &Task, now: DateTime<Utc>) -> bool {
    let Some(due) = task.due_date else {
        return matches!(bucket, DueBucket::NoDueDate | DueBucket::All);
    };

    let today = local_day(now);
    match bucket {
        DueBucket::All => true,
        DueBucket::NoDueDate => false,
        DueBucket::Overdue => due < now,
        DueBucket::Today => local_day(due) == today,
        DueBucket::Tomorrow => {
            let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
            local_day(due) == tomorrow
        }
        DueBucket::Next7 => {
            let start = local_day_start(now);
            let end = start + Duration::days(7);
            due >= start && due <= end
        }
    }
}
