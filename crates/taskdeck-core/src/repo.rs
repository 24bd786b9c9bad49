use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::category::{self, Category};
use crate::error::Error;
use crate::filter::Criteria;
use crate::store::Store;
use crate::task::{Status, Task, TaskDraft, TaskPatch};

/// Outcome of a category deletion, for the boundary layer to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassignmentReport {
    pub removed: bool,
    pub reassigned: usize,
}

/// Owns the in-memory task list. Every mutation persists the whole
/// snapshot; if the write fails the in-memory list is rolled back so it
/// never drifts ahead of what is on disk.
#[derive(Debug, Default)]
pub struct TaskRepository {
    tasks: Vec<Task>,
}

impl TaskRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full uuid or a unique uuid prefix. Ambiguous or unknown
    /// prefixes resolve to nothing.
    pub fn resolve_id(&self, raw: &str) -> Option<Uuid> {
        if let Ok(id) = Uuid::parse_str(raw) {
            return self.get(id).map(|t| t.id);
        }

        let prefix = raw.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return None;
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(&prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            warn!(prefix = %prefix, "ambiguous task id prefix");
            return None;
        }
        Some(first.id)
    }

    #[instrument(skip(self, store, draft))]
    pub fn create(
        &mut self,
        store: &Store,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Task> {
        let order_index = self.next_order_index(draft.status);
        let task = Task::new(draft, now, order_index);

        let before = self.tasks.clone();
        self.tasks.push(task.clone());
        self.commit(store, before)?;

        info!(id = %task.id, status = %task.status, order_index, "task created");
        Ok(task)
    }

    /// Merge the patch into an existing task. `None` means the id is
    /// unknown; nothing is persisted in that case.
    #[instrument(skip(self, store, patch))]
    pub fn update(
        &mut self,
        store: &Store,
        id: Uuid,
        patch: &TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "update target not found; no-op");
            return Ok(None);
        };

        let before = self.tasks.clone();
        patch.apply(&mut self.tasks[index]);
        self.commit(store, before)?;

        let updated = self.tasks[index].clone();
        info!(%id, "task updated");
        Ok(Some(updated))
    }

    /// Remove a task. `false` means the id is unknown. Intent confirmation
    /// is the boundary layer's job.
    #[instrument(skip(self, store))]
    pub fn delete(&mut self, store: &Store, id: Uuid) -> anyhow::Result<bool> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "delete target not found; no-op");
            return Ok(false);
        };

        let before = self.tasks.clone();
        self.tasks.remove(index);
        self.commit(store, before)?;

        info!(%id, "task deleted");
        Ok(true)
    }

    /// Move a task to another column. Neither the source nor the
    /// destination column is renumbered; order is only rewritten by an
    /// explicit reorder.
    #[instrument(skip(self, store))]
    pub fn set_status(&mut self, store: &Store, id: Uuid, status: Status) -> anyhow::Result<bool> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "status target not found; no-op");
            return Ok(false);
        };

        let before = self.tasks.clone();
        self.tasks[index].status = status;
        self.commit(store, before)?;

        info!(%id, %status, "task moved");
        Ok(true)
    }

    /// Commit the display order the boundary layer observed after a drag:
    /// each listed id of the matching status gets its position as its
    /// order index. Ids that are unknown or in another column are ignored.
    #[instrument(skip(self, store, ids))]
    pub fn reorder_column(
        &mut self,
        store: &Store,
        status: Status,
        ids: &[Uuid],
    ) -> anyhow::Result<usize> {
        let before = self.tasks.clone();

        let mut assigned = 0;
        for (position, id) in ids.iter().enumerate() {
            if let Some(task) = self
                .tasks
                .iter_mut()
                .find(|t| t.id == *id && t.status == status)
            {
                task.order_index = position as u32;
                assigned += 1;
            }
        }

        self.commit(store, before)?;
        info!(%status, assigned, "column order committed");
        Ok(assigned)
    }

    /// Tasks in the given column, ascending by order index, insertion
    /// order breaking ties.
    pub fn list_by_status(&self, status: Status) -> Vec<&Task> {
        let mut column: Vec<&Task> = self.tasks.iter().filter(|t| t.status == status).collect();
        column.sort_by_key(|t| t.order_index);
        column
    }

    /// Visibility query; never mutates.
    pub fn query(&self, criteria: &Criteria, now: DateTime<Utc>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| criteria.matches(t, now))
            .collect()
    }

    pub fn count_in_category(&self, name: &str) -> usize {
        self.tasks.iter().filter(|t| t.category == name).count()
    }

    /// Point every task in `name` at the sentinel. Persists only when at
    /// least one task changed.
    #[instrument(skip(self, store))]
    pub fn reassign_category(&mut self, store: &Store, name: &str) -> anyhow::Result<usize> {
        let before = self.tasks.clone();

        let mut reassigned = 0;
        for task in self.tasks.iter_mut().filter(|t| t.category == name) {
            task.category = category::sentinel();
            reassigned += 1;
        }

        if reassigned == 0 {
            return Ok(0);
        }

        self.commit(store, before)?;
        info!(name, reassigned, "tasks reassigned to sentinel");
        Ok(reassigned)
    }

    fn next_order_index(&self, status: Status) -> u32 {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.order_index)
            .max()
            .map_or(0, |max| max + 1)
    }

    fn commit(&mut self, store: &Store, before: Vec<Task>) -> anyhow::Result<()> {
        if let Err(err) = store.save_tasks(&self.tasks) {
            warn!("persist failed; rolling back in-memory tasks");
            self.tasks = before;
            return Err(err);
        }
        Ok(())
    }
}

/// Owns the stored category list. The `all` pseudo-category and the
/// `uncategorized` sentinel are never stored here.
#[derive(Debug, Default)]
pub struct CategoryRepository {
    categories: Vec<Category>,
}

impl CategoryRepository {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Stored categories in insertion order.
    pub fn list(&self) -> &[Category] {
        &self.categories
    }

    /// The sidebar's filter choices: the synthetic `all` entry followed by
    /// every stored category.
    pub fn filter_options(&self) -> Vec<Category> {
        let mut options = vec![Category::new(category::ALL, "#888888")];
        options.extend(self.categories.iter().cloned());
        options
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    #[instrument(skip(self, store))]
    pub fn create(&mut self, store: &Store, raw_name: &str, color: &str) -> anyhow::Result<Category> {
        let name = category::normalize_name(raw_name);
        if name.is_empty() {
            return Err(Error::validation("category name must not be empty").into());
        }
        if category::is_reserved(&name) {
            return Err(
                Error::validation(format!("'{name}' is a reserved category name")).into(),
            );
        }
        if self.categories.iter().any(|c| c.name == name) {
            return Err(Error::validation(format!("category '{name}' already exists")).into());
        }

        let created = Category::new(name, color.trim());

        let before = self.categories.clone();
        self.categories.push(created.clone());
        self.commit(store, before)?;

        info!(name = %created.name, color = %created.color, "category created");
        Ok(created)
    }

    /// Remove a category and point its tasks at the sentinel. Tasks are
    /// persisted only when any were reassigned; categories always.
    #[instrument(skip(self, store, tasks))]
    pub fn delete(
        &mut self,
        store: &Store,
        raw_name: &str,
        tasks: &mut TaskRepository,
    ) -> anyhow::Result<ReassignmentReport> {
        let name = category::normalize_name(raw_name);
        let Some(index) = self.categories.iter().position(|c| c.name == name) else {
            debug!(%name, "delete target not found; no-op");
            return Ok(ReassignmentReport {
                removed: false,
                reassigned: 0,
            });
        };

        let reassigned = tasks.reassign_category(store, &name)?;

        let before = self.categories.clone();
        self.categories.remove(index);
        self.commit(store, before)?;

        info!(%name, reassigned, "category deleted");
        Ok(ReassignmentReport {
            removed: true,
            reassigned,
        })
    }

    fn commit(&mut self, store: &Store, before: Vec<Category>) -> anyhow::Result<()> {
        if let Err(err) = store.save_categories(&self.categories) {
            warn!("persist failed; rolling back in-memory categories");
            self.categories = before;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::{CategoryRepository, TaskRepository};
    use crate::category;
    use crate::error::Error;
    use crate::store::Store;
    use crate::task::{Status, TaskDraft};

    fn draft(title: &str, status: Status) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            status,
            ..TaskDraft::default()
        }
    }

    #[test]
    fn create_appends_past_the_column_maximum() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();

        let a = repo.create(&store, draft("a", Status::Todo), now).expect("create a");
        let b = repo.create(&store, draft("b", Status::Todo), now).expect("create b");
        let c = repo
            .create(&store, draft("c", Status::InProgress), now)
            .expect("create c");

        assert_eq!(a.order_index, 0);
        assert_eq!(b.order_index, 1);
        assert_eq!(c.order_index, 0, "each column counts on its own");
    }

    #[test]
    fn reorder_assigns_dense_positions_and_spares_other_columns() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();

        let a = repo.create(&store, draft("a", Status::Todo), now).expect("a");
        let b = repo.create(&store, draft("b", Status::Todo), now).expect("b");
        let c = repo.create(&store, draft("c", Status::Todo), now).expect("c");
        let other = repo
            .create(&store, draft("other", Status::Completed), now)
            .expect("other");

        let assigned = repo
            .reorder_column(&store, Status::Todo, &[c.id, a.id, b.id])
            .expect("reorder");
        assert_eq!(assigned, 3);

        let column = repo.list_by_status(Status::Todo);
        let titles: Vec<_> = column.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["c", "a", "b"]);
        assert_eq!(
            repo.get(other.id).expect("other still present").order_index,
            0
        );
    }

    #[test]
    fn reorder_ignores_ids_from_other_columns() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();

        let todo = repo.create(&store, draft("todo", Status::Todo), now).expect("todo");
        let done = repo
            .create(&store, draft("done", Status::Completed), now)
            .expect("done");

        let assigned = repo
            .reorder_column(&store, Status::Todo, &[done.id, todo.id])
            .expect("reorder");
        assert_eq!(assigned, 1);
        assert_eq!(repo.get(todo.id).expect("todo").order_index, 1);
        assert_eq!(repo.get(done.id).expect("done").order_index, 0);
    }

    #[test]
    fn set_status_does_not_renumber_either_column() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();

        let _a = repo.create(&store, draft("a", Status::Todo), now).expect("a");
        let b = repo.create(&store, draft("b", Status::Todo), now).expect("b");

        let moved = repo
            .set_status(&store, b.id, Status::InProgress)
            .expect("move");
        assert!(moved);

        let b_after = repo.get(b.id).expect("b still present");
        assert_eq!(b_after.status, Status::InProgress);
        assert_eq!(b_after.order_index, 1, "order survives the move untouched");
    }

    #[test]
    fn mutations_on_unknown_ids_are_no_ops() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();
        let ghost = uuid::Uuid::new_v4();

        assert!(repo
            .update(&store, ghost, &Default::default())
            .expect("update")
            .is_none());
        assert!(!repo.delete(&store, ghost).expect("delete"));
        assert!(!repo.set_status(&store, ghost, Status::Completed).expect("move"));
    }

    #[test]
    fn id_prefixes_resolve_only_when_unique() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::default();
        let now = Utc::now();

        let task = repo.create(&store, draft("a", Status::Todo), now).expect("a");
        let full = task.id.to_string();

        assert_eq!(repo.resolve_id(&full), Some(task.id));
        assert_eq!(repo.resolve_id(&full[..8]), Some(task.id));
        assert_eq!(repo.resolve_id(""), None);
        assert_eq!(repo.resolve_id("zzzzzzzz"), None);
    }

    #[test]
    fn duplicate_category_names_are_rejected_case_insensitively() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut categories = CategoryRepository::default();

        categories
            .create(&store, "work", "#ff4444")
            .expect("create work");
        let err = categories
            .create(&store, "Work", "#00ff00")
            .expect_err("duplicate must fail");

        let typed = err.downcast_ref::<Error>().expect("typed error");
        assert!(typed.is_validation());
        assert_eq!(categories.list().len(), 1);
    }

    #[test]
    fn empty_and_reserved_category_names_are_rejected() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut categories = CategoryRepository::default();

        assert!(categories.create(&store, "   ", "#123456").is_err());
        assert!(categories.create(&store, "all", "#123456").is_err());
        assert!(categories.create(&store, "Uncategorized", "#123456").is_err());
        assert!(categories.list().is_empty());
    }

    #[test]
    fn category_delete_reassigns_exactly_the_referencing_tasks() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut tasks = TaskRepository::default();
        let mut categories = CategoryRepository::default();
        let now = Utc::now();

        categories
            .create(&store, "urgent", "#ff0000")
            .expect("create urgent");

        let tagged = tasks
            .create(
                &store,
                TaskDraft {
                    category: "urgent".to_string(),
                    ..draft("tagged", Status::Todo)
                },
                now,
            )
            .expect("tagged");
        let untouched = tasks
            .create(
                &store,
                TaskDraft {
                    category: "personal".to_string(),
                    ..draft("untouched", Status::Todo)
                },
                now,
            )
            .expect("untouched");

        let report = categories
            .delete(&store, "urgent", &mut tasks)
            .expect("delete");
        assert!(report.removed);
        assert_eq!(report.reassigned, 1);

        assert_eq!(
            tasks.get(tagged.id).expect("tagged").category,
            category::UNCATEGORIZED
        );
        assert_eq!(tasks.get(untouched.id).expect("untouched").category, "personal");
        assert!(categories.get("urgent").is_none());

        let persisted = store.load_tasks().expect("reload tasks");
        let tagged_on_disk = persisted
            .iter()
            .find(|t| t.id == tagged.id)
            .expect("tagged persisted");
        assert_eq!(tagged_on_disk.category, category::UNCATEGORIZED);
    }

    #[test]
    fn deleting_an_unknown_category_is_a_no_op() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut tasks = TaskRepository::default();
        let mut categories = CategoryRepository::default();

        let report = categories
            .delete(&store, "ghost", &mut tasks)
            .expect("delete");
        assert!(!report.removed);
        assert_eq!(report.reassigned, 0);
    }

    #[test]
    fn filter_options_lead_with_the_synthetic_all() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        let mut categories = CategoryRepository::default();
        categories.create(&store, "work", "#ff4444").expect("work");

        let options = categories.filter_options();
        assert_eq!(options[0].name, category::ALL);
        assert_eq!(options[1].name, "work");
        assert_eq!(categories.list().len(), 1, "the pseudo-category is not stored");
    }
}
