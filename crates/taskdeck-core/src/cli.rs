use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "td",
    version,
    about = "Taskdeck: a kanban task board for the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "deckrc", global = true)]
    pub deckrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task. Attachments are captured now and never editable.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long = "recur")]
        recurrence: Option<String>,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Edit a task's fields. Status and order have their own commands.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long = "recur")]
        recurrence: Option<String>,
    },

    /// Delete a task, asking first unless --yes.
    Delete {
        id: String,
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Move a task to another column without renumbering anything.
    Move { id: String, status: String },

    /// Commit a column's display order: listed ids get ranks 0, 1, 2, ...
    Reorder { status: String, ids: Vec<String> },

    /// The kanban board, column by column.
    Board {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Flat filtered task table.
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Everything about one task.
    Show { id: String },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },

    /// Month view of tasks with due dates.
    Calendar {
        /// Month to show as YYYY-MM; defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },

    /// Show or change the theme preference.
    Theme { mode: Option<String> },

    /// Periodically check for tasks due soon and notify.
    Watch {
        /// Seconds between checks.
        #[arg(long)]
        interval: Option<u64>,
        /// Notify when a due date is at most this many seconds away.
        #[arg(long)]
        lookahead: Option<u64>,
    },

    /// Print the version.
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    Add { name: String, color: String },
    Delete {
        name: String,
        #[arg(short = 'y', long)]
        yes: bool,
    },
    List,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive substring over title and description.
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    /// today, tomorrow, next7, overdue, noduedate or all.
    #[arg(long)]
    pub due: Option<String>,
}

/// Command to run when none was given, per `default.command`.
pub fn default_command(cfg: &Config) -> Command {
    match cfg.get("default.command").as_deref() {
        Some("list") => Command::List {
            filters: FilterArgs::default(),
        },
        Some("calendar") => Command::Calendar { month: None },
        Some("board") | None => Command::Board {
            filters: FilterArgs::default(),
        },
        Some(other) => {
            debug!(command = other, "unknown default.command; falling back to board");
            Command::Board {
                filters: FilterArgs::default(),
            }
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
