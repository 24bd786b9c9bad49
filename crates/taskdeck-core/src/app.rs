use std::path::Path;

use tracing::{info, instrument};

use crate::repo::{CategoryRepository, ReassignmentReport, TaskRepository};
use crate::store::Store;
use crate::theme::Theme;

/// The application context: one per process, constructed at startup,
/// owning the store and both repositories. Handed to command handlers by
/// reference; nothing else holds state.
#[derive(Debug)]
pub struct App {
    pub store: Store,
    pub tasks: TaskRepository,
    pub categories: CategoryRepository,
    theme: Theme,
}

impl App {
    /// Open the store and read all three records once.
    #[instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let store = Store::open(data_dir)?;
        let tasks = TaskRepository::new(store.load_tasks()?);
        let categories = CategoryRepository::new(store.load_categories()?);
        let theme = store.load_theme()?;

        info!(
            tasks = tasks.len(),
            categories = categories.list().len(),
            %theme,
            "app context ready"
        );

        Ok(Self {
            store,
            tasks,
            categories,
            theme,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Persist first; the in-memory preference only changes on success.
    pub fn set_theme(&mut self, theme: Theme) -> anyhow::Result<Theme> {
        self.store.save_theme(theme)?;
        self.theme = theme;
        Ok(theme)
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<Theme> {
        self.set_theme(self.theme.toggled())
    }

    /// Category deletion crosses both repositories, so it lives here.
    pub fn delete_category(&mut self, name: &str) -> anyhow::Result<ReassignmentReport> {
        self.categories.delete(&self.store, name, &mut self.tasks)
    }
}
