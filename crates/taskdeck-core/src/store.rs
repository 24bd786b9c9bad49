use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::category::{self, Category};
use crate::task::Task;
use crate::theme::Theme;

/// Key/value persistence for the three snapshot records: the task list,
/// the category list and the theme preference. Each record is a whole JSON
/// document rewritten on every mutation; reads happen once at startup.
#[derive(Debug)]
pub struct Store {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub categories_path: PathBuf,
    pub theme_path: PathBuf,
}

impl Store {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.json");
        let categories_path = data_dir.join("categories.json");
        let theme_path = data_dir.join("theme.json");

        if !tasks_path.exists() {
            save_json_atomic(&tasks_path, &Vec::<Task>::new())?;
        }
        if !categories_path.exists() {
            save_json_atomic(&categories_path, &category::seed())?;
        }
        if !theme_path.exists() {
            save_json_atomic(&theme_path, &Theme::default())?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            categories = %categories_path.display(),
            theme = %theme_path.display(),
            "opened store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            categories_path,
            theme_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_json(&self.tasks_path).context("failed to load tasks.json")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_json_atomic(&self.tasks_path, &tasks).context("failed to save tasks.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> anyhow::Result<Vec<Category>> {
        load_json(&self.categories_path).context("failed to load categories.json")
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn save_categories(&self, categories: &[Category]) -> anyhow::Result<()> {
        save_json_atomic(&self.categories_path, &categories)
            .context("failed to save categories.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Theme> {
        load_json(&self.theme_path).context("failed to load theme.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        save_json_atomic(&self.theme_path, &theme).context("failed to save theme.json")
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> anyhow::Result<T> {
    debug!(file = %path.display(), "loading record");
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", path.display()))
}

fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "saving record atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(value)?;
    temp.write_all(serialized.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::Store;
    use crate::task::{Task, TaskDraft};
    use crate::theme::Theme;

    #[test]
    fn first_open_seeds_defaults() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");

        assert!(store.load_tasks().expect("load tasks").is_empty());
        let categories = store.load_categories().expect("load categories");
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["work", "personal", "shopping"]);
        assert_eq!(store.load_theme().expect("load theme"), Theme::Light);
    }

    #[test]
    fn tasks_roundtrip_through_the_snapshot() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");

        let task = Task::new(
            TaskDraft {
                title: "water the plants".to_string(),
                ..TaskDraft::default()
            },
            Utc::now(),
            0,
        );
        store.save_tasks(&[task.clone()]).expect("save tasks");

        let loaded = store.load_tasks().expect("reload tasks");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, task.id);
        assert_eq!(loaded[0].title, "water the plants");
        assert_eq!(loaded[0].created_at, task.created_at);
    }

    #[test]
    fn theme_record_roundtrips() {
        let temp = tempdir().expect("tempdir");
        let store = Store::open(temp.path()).expect("open store");
        store.save_theme(Theme::Dark).expect("save theme");
        assert_eq!(store.load_theme().expect("reload theme"), Theme::Dark);
    }
}
