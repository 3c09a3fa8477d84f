//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Copier Template Tester - render copier templates and test them against project history
#[derive(Parser, Debug)]
#[command(name = "ctt")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `render`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Options for the default `render` command
    #[command(flatten)]
    render: commands::render::RenderArgs,

    /// Template directory containing ctt.toml and copier.yaml
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every [output."<dir>"] from ctt.toml
    Render(commands::render::RenderArgs),
    /// Apply the current template to historical snapshots of a project
    Temporal(commands::temporal::TemporalArgs),
    /// Run one temporal trial described on stdin (worker for parallel runs)
    #[command(hide = true, name = "run-trial")]
    RunTrial,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level)?;

        let base_dir = std::path::absolute(&self.base_dir)
            .with_context(|| format!("Invalid base directory: {}", self.base_dir.display()))?;

        match self.command {
            Some(Commands::Render(args)) => commands::render::execute(args, &base_dir, &self.color),
            Some(Commands::Temporal(args)) => {
                commands::temporal::execute(args, &base_dir, &self.color, &self.log_level)
            }
            Some(Commands::RunTrial) => commands::temporal::run_trial(),
            None => commands::render::execute(self.render, &base_dir, &self.color),
        }
    }
}

/// Initialize `env_logger` at `level`; `RUST_LOG`, when set, refines it.
fn init_logging(level: &str) -> Result<()> {
    let level: LevelFilter = level.parse().map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level '{}'\n\n\
             hint: Use one of: off, error, warn, info, debug, trace",
            level
        )
    })?;

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // A logger may already be installed when embedded in tests
    let _ = builder.try_init();
    Ok(())
}
