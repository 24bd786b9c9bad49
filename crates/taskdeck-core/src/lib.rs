pub mod app;
pub mod attach;
pub mod calendar;
pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod reminder;
pub mod render;
pub mod repo;
pub mod store;
pub mod task;
pub mod theme;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskdeck CLI"
    );

    let mut cfg = config::Config::load(cli.deckrc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let mut app = app::App::open(&data_dir)
        .with_context(|| format!("failed to open data at {}", data_dir.display()))?;

    let mut renderer = render::Renderer::new(&cfg)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            let fallback = cli::default_command(&cfg);
            debug!(?fallback, "no explicit command, using default");
            fallback
        }
    };

    commands::dispatch(&mut app, &cfg, &mut renderer, command)?;

    info!("done");
    Ok(())
}
