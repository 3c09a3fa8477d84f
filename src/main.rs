//! # Copier Template Tester CLI
//!
//! Binary entry point for `ctt`. Parsing and dispatch live in `cli`, each
//! subcommand in `commands`; the work itself is done by the `ctt` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
