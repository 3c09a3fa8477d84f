//! # Render Command Implementation
//!
//! The default `ctt` command. It renders every `[output."<dir>"]` table from
//! `ctt.toml` with copier and, with `--check-untracked`, fails when any
//! rendered file is not yet tracked by version control. That check is what
//! makes `ctt` usable as a pre-commit hook.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use ctt::output::{emoji, OutputConfig};
use ctt::precommit;
use ctt::render;
use ctt::suggestions;
use ctt::template::CopierCli;
use ctt::vcs::VcsKind;

/// Render all configured outputs
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Fail if rendered output contains files not tracked by version control.
    #[arg(long)]
    pub check_untracked: bool,

    /// Version control system used by --check-untracked (auto, git, jj, jujutsu)
    #[arg(long, value_name = "KIND", default_value = "auto")]
    pub vcs: String,
}

/// Execute the `render` command.
pub fn execute(args: RenderArgs, base_dir: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let vcs: VcsKind = args.vcs.parse().map_err(suggestions::for_error)?;

    println!("Starting Copier Template Tester for {}", base_dir.display());

    let engine = CopierCli::new(base_dir);
    let rendered = render::run(base_dir, &engine).map_err(suggestions::for_error)?;
    for path in &rendered {
        println!(
            "{} Rendered {}",
            emoji(&out, "✅", "[OK]"),
            path.strip_prefix(base_dir).unwrap_or(path).display()
        );
    }

    if args.check_untracked {
        precommit::check_for_untracked(&rendered, base_dir, vcs)
            .map_err(suggestions::for_error)?;
    }

    Ok(())
}
