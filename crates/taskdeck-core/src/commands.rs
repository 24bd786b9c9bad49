use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::app::App;
use crate::attach;
use crate::calendar;
use crate::category;
use crate::cli::{CategoryCommand, Command, FilterArgs};
use crate::config::Config;
use crate::datetime;
use crate::error::Error;
use crate::filter::{CategoryFilter, Criteria, DueBucket, PriorityFilter};
use crate::reminder::{Notify, ReminderScheduler};
use crate::render::Renderer;
use crate::task::{Status, Task, TaskDraft, TaskPatch};
use crate::theme::Theme;

#[instrument(skip(app, cfg, renderer, command))]
pub fn dispatch(
    app: &mut App,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();
    debug!(?command, "dispatching command");

    match command {
        Command::Add {
            title,
            description,
            category,
            priority,
            due,
            recurrence,
            attachments,
        } => cmd_add(
            app,
            title,
            description,
            category,
            priority,
            due,
            recurrence,
            attachments,
            now,
        ),
        Command::Edit {
            id,
            title,
            description,
            category,
            priority,
            due,
            clear_due,
            recurrence,
        } => cmd_edit(
            app, &id, title, description, category, priority, due, clear_due, recurrence, now,
        ),
        Command::Delete { id, yes } => cmd_delete(app, &id, yes),
        Command::Move { id, status } => cmd_move(app, &id, &status),
        Command::Reorder { status, ids } => cmd_reorder(app, &status, &ids),
        Command::Board { filters } => cmd_board(app, renderer, &filters, now),
        Command::List { filters } => cmd_list(app, renderer, &filters, now),
        Command::Show { id } => cmd_show(app, renderer, &id),
        Command::Category { action } => cmd_category(app, renderer, action),
        Command::Calendar { month } => cmd_calendar(app, renderer, month.as_deref(), now),
        Command::Theme { mode } => cmd_theme(app, mode.as_deref()),
        Command::Watch {
            interval,
            lookahead,
        } => cmd_watch(app, cfg, interval, lookahead),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
fn cmd_add(
    app: &mut App,
    title: String,
    description: String,
    category: Option<String>,
    priority: Option<String>,
    due: Option<String>,
    recurrence: Option<String>,
    attachments: Vec<PathBuf>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let priority = priority.as_deref().map(str::parse).transpose()?.unwrap_or_default();
    let recurrence = recurrence
        .as_deref()
        .map(str::parse)
        .transpose()?
        .unwrap_or_default();
    let due_date = due.as_deref().map(|raw| datetime::parse_due(raw, now)).transpose()?;
    let category = category
        .as_deref()
        .map(category::normalize_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(category::sentinel);

    // The full attachment batch is ingested before the repository sees the
    // draft; a failed read aborts creation with nothing persisted.
    let attachments = attach::read_attachments(&attachments)?;

    let draft = TaskDraft {
        title,
        description,
        category,
        priority,
        due_date,
        recurrence,
        attachments,
        status: Status::Todo,
    };
    let task = app.tasks.create(&app.store, draft, now)?;

    println!("Created task {}.", short(task.id));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
fn cmd_edit(
    app: &mut App,
    raw_id: &str,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    due: Option<String>,
    clear_due: bool,
    recurrence: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(id) = app.tasks.resolve_id(raw_id) else {
        println!("No task matches '{raw_id}'. Modified 0 task(s).");
        return Ok(());
    };

    let due_date = if clear_due {
        Some(None)
    } else {
        due.as_deref()
            .map(|raw| datetime::parse_due(raw, now))
            .transpose()?
            .map(Some)
    };

    let patch = TaskPatch {
        title,
        description,
        category: category.as_deref().map(category::normalize_name),
        priority: priority.as_deref().map(str::parse).transpose()?,
        due_date,
        recurrence: recurrence.as_deref().map(str::parse).transpose()?,
    };

    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    match app.tasks.update(&app.store, id, &patch)? {
        Some(task) => println!("Modified task {}.", short(task.id)),
        None => println!("Modified 0 task(s)."),
    }
    Ok(())
}

#[instrument(skip(app))]
fn cmd_delete(app: &mut App, raw_id: &str, yes: bool) -> anyhow::Result<()> {
    info!("command delete");

    let Some(id) = app.tasks.resolve_id(raw_id) else {
        println!("No task matches '{raw_id}'. Deleted 0 task(s).");
        return Ok(());
    };

    let title = app
        .tasks
        .get(id)
        .map(|t| t.title.clone())
        .unwrap_or_default();
    if !yes && !confirm(&format!("Delete task '{title}'?"))? {
        println!("Aborted.");
        return Ok(());
    }

    if app.tasks.delete(&app.store, id)? {
        println!("Deleted task {}.", short(id));
    } else {
        println!("Deleted 0 task(s).");
    }
    Ok(())
}

#[instrument(skip(app))]
fn cmd_move(app: &mut App, raw_id: &str, raw_status: &str) -> anyhow::Result<()> {
    info!("command move");

    let status: Status = raw_status.parse()?;
    let Some(id) = app.tasks.resolve_id(raw_id) else {
        println!("No task matches '{raw_id}'. Moved 0 task(s).");
        return Ok(());
    };

    if app.tasks.set_status(&app.store, id, status)? {
        println!("Moved task {} to {status}.", short(id));
    } else {
        println!("Moved 0 task(s).");
    }
    Ok(())
}

#[instrument(skip(app, raw_ids))]
fn cmd_reorder(app: &mut App, raw_status: &str, raw_ids: &[String]) -> anyhow::Result<()> {
    info!("command reorder");

    let status: Status = raw_status.parse()?;

    let mut ids = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        match app.tasks.resolve_id(raw) {
            Some(id) => ids.push(id),
            None => warn!(id = %raw, "ignoring unknown id in reorder"),
        }
    }

    let assigned = app.tasks.reorder_column(&app.store, status, &ids)?;
    println!("Committed order for {assigned} task(s) in {status}.");
    Ok(())
}

#[instrument(skip(app, renderer, filters, now))]
fn cmd_board(
    app: &mut App,
    renderer: &mut Renderer,
    filters: &FilterArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command board");

    let criteria = criteria_from(filters)?;
    let columns: Vec<(Status, Vec<&Task>)> = Status::COLUMNS
        .iter()
        .map(|&status| {
            let column = app
                .tasks
                .list_by_status(status)
                .into_iter()
                .filter(|task| criteria.matches(task, now))
                .collect();
            (status, column)
        })
        .collect();

    renderer.print_board(&columns, now)
}

#[instrument(skip(app, renderer, filters, now))]
fn cmd_list(
    app: &mut App,
    renderer: &mut Renderer,
    filters: &FilterArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let criteria = criteria_from(filters)?;
    let visible = app.tasks.query(&criteria, now);
    renderer.print_task_table(&visible, now)
}

#[instrument(skip(app, renderer))]
fn cmd_show(app: &mut App, renderer: &mut Renderer, raw_id: &str) -> anyhow::Result<()> {
    info!("command show");

    let task = app
        .tasks
        .resolve_id(raw_id)
        .and_then(|id| app.tasks.get(id))
        .ok_or_else(|| Error::not_found("task", raw_id))?;
    renderer.print_task_info(task, app.categories.list())
}

#[instrument(skip(app, renderer, action))]
fn cmd_category(
    app: &mut App,
    renderer: &mut Renderer,
    action: CategoryCommand,
) -> anyhow::Result<()> {
    match action {
        CategoryCommand::Add { name, color } => {
            info!("command category add");
            let created = app.categories.create(&app.store, &name, &color)?;
            println!("Created category '{}'.", created.name);
            Ok(())
        }
        CategoryCommand::Delete { name, yes } => {
            info!("command category delete");
            let normalized = category::normalize_name(&name);
            let referencing = app.tasks.count_in_category(&normalized);

            if referencing > 0
                && !yes
                && !confirm(&format!(
                    "Category '{normalized}' is used by {referencing} task(s); they will become '{}'. Continue?",
                    category::UNCATEGORIZED
                ))?
            {
                println!("Aborted.");
                return Ok(());
            }

            let report = app.delete_category(&normalized)?;
            if report.removed {
                println!(
                    "Deleted category '{normalized}'; reassigned {} task(s).",
                    report.reassigned
                );
            } else {
                println!("No category named '{normalized}'.");
            }
            Ok(())
        }
        CategoryCommand::List => {
            info!("command category list");
            let entries: Vec<_> = app
                .categories
                .filter_options()
                .into_iter()
                .map(|option| {
                    let count = if option.name == category::ALL {
                        app.tasks.len()
                    } else {
                        app.tasks.count_in_category(&option.name)
                    };
                    (option, count)
                })
                .collect();
            renderer.print_categories(&entries)
        }
    }
}

#[instrument(skip(app, renderer, now))]
fn cmd_calendar(
    app: &mut App,
    renderer: &mut Renderer,
    month: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command calendar");

    let (year, month) = match month {
        Some(raw) => parse_month(raw)?,
        None => {
            let today = datetime::local_day(now);
            (today.year(), today.month())
        }
    };

    let events = calendar::events(app.tasks.all());
    renderer.print_calendar(year, month, &events)
}

#[instrument(skip(app))]
fn cmd_theme(app: &mut App, mode: Option<&str>) -> anyhow::Result<()> {
    info!("command theme");

    match mode {
        None => {
            println!("{}", app.theme());
            Ok(())
        }
        Some("toggle") => {
            let theme = app.toggle_theme()?;
            println!("Theme set to {theme}.");
            Ok(())
        }
        Some(raw) => {
            let theme: Theme = raw.parse()?;
            app.set_theme(theme)?;
            println!("Theme set to {theme}.");
            Ok(())
        }
    }
}

#[instrument(skip(app, cfg))]
fn cmd_watch(
    app: &mut App,
    cfg: &Config,
    interval: Option<u64>,
    lookahead: Option<u64>,
) -> anyhow::Result<()> {
    info!("command watch");

    let interval = interval
        .or_else(|| cfg.get_u64("reminder.interval.secs"))
        .unwrap_or(60)
        .max(1);
    let lookahead = lookahead
        .or_else(|| cfg.get_u64("reminder.lookahead.secs"))
        .unwrap_or(300);

    let mut scheduler = ReminderScheduler::new(Duration::seconds(lookahead as i64));
    let mut notifier = TerminalNotify;

    println!(
        "Watching for tasks due within {lookahead}s; checking every {interval}s. Ctrl-C to stop."
    );

    loop {
        let now = Utc::now();
        // Reload so edits made by other invocations are seen.
        match app.store.load_tasks() {
            Ok(tasks) => {
                scheduler.tick(&tasks, now, &mut notifier);
            }
            Err(err) => warn!(error = %err, "skipping tick; could not reload tasks"),
        }
        thread::sleep(std::time::Duration::from_secs(interval));
    }
}

struct TerminalNotify;

impl Notify for TerminalNotify {
    fn due_soon(&mut self, task: &Task, remaining: Duration) {
        let minutes = (remaining.num_seconds() + 59) / 60;
        let title = if task.title.is_empty() {
            "(untitled)"
        } else {
            task.title.as_str()
        };
        println!("\x07Due soon: '{title}' is due in {minutes} minute(s)!");
    }
}

fn criteria_from(args: &FilterArgs) -> anyhow::Result<Criteria> {
    Ok(Criteria {
        search: args.search.clone(),
        category: args
            .category
            .as_deref()
            .map(CategoryFilter::parse)
            .unwrap_or_default(),
        priority: args
            .priority
            .as_deref()
            .map(PriorityFilter::parse)
            .transpose()?
            .unwrap_or_default(),
        due: args
            .due
            .as_deref()
            .map(str::parse::<DueBucket>)
            .transpose()?
            .unwrap_or_default(),
    })
}

fn parse_month(raw: &str) -> Result<(i32, u32), Error> {
    let parsed = raw
        .trim()
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
        .filter(|(_, month)| (1..=12).contains(month));

    parsed.ok_or_else(|| Error::validation(format!("invalid month '{raw}'; expected YYYY-MM")))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

fn short(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
