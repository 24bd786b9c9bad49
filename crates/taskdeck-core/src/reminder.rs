use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::task::Task;

/// Notification collaborator. The terminal front end rings the bell;
/// tests record what fired.
pub trait Notify {
    fn due_soon(&mut self, task: &Task, remaining: Duration);
}

/// Periodic due-soon check. A task notifies once per crossing into the
/// lookahead window: its id is tracked while it stays inside and released
/// when it leaves (due passed, moved out, or cleared), so a rescheduled
/// task can fire again.
#[derive(Debug)]
pub struct ReminderScheduler {
    lookahead: Duration,
    notified: HashSet<Uuid>,
}

impl ReminderScheduler {
    pub fn new(lookahead: Duration) -> Self {
        Self {
            lookahead,
            notified: HashSet::new(),
        }
    }

    #[instrument(skip(self, tasks, notifier))]
    pub fn tick(&mut self, tasks: &[Task], now: DateTime<Utc>, notifier: &mut dyn Notify) -> usize {
        let mut in_window = HashSet::new();
        let mut fired = 0;

        for task in tasks {
            let Some(due) = task.due_date else {
                continue;
            };
            if due <= now {
                continue;
            }
            let remaining = due - now;
            if remaining > self.lookahead {
                continue;
            }

            in_window.insert(task.id);
            if self.notified.insert(task.id) {
                notifier.due_soon(task, remaining);
                fired += 1;
            }
        }

        self.notified.retain(|id| in_window.contains(id));
        debug!(fired, tracked = self.notified.len(), "reminder tick");
        fired
    }
}
