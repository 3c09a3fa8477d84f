//! # Temporal Command Implementation
//!
//! Runs the `[[temporal.snapshots]]` from `ctt.toml`: each snapshot's ref is
//! checked out from the source project, the current template is applied, and
//! the resulting diff is stored under the output directory. A summary table
//! is printed and `metadata.json` written; the command fails when any trial
//! failed.
//!
//! Parallel trials run in worker processes: this executable, started again
//! with the hidden `run-trial` subcommand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use ctt::cache::RootCache;
use ctt::config::Config;
use ctt::output::{emoji, OutputConfig};
use ctt::report::{self, Summary};
use ctt::suggestions;
use ctt::template::read_template_config;
use ctt::temporal::{TemporalTester, TrialProcess, TrialRequest, TrialResult};

/// Apply the current template to historical snapshots of a project
#[derive(Args, Debug)]
pub struct TemporalArgs {
    /// Run snapshots in parallel (overrides `parallel` in ctt.toml).
    #[arg(long)]
    pub parallel: bool,

    /// Maximum number of snapshots tested at once.
    ///
    /// Defaults to `max_workers` in ctt.toml, then to the number of CPUs.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_workers: Option<u32>,

    /// Keep each trial's temporary checkout for debugging.
    #[arg(long)]
    pub keep_temp_dirs: bool,

    /// Directory for results, relative to the base directory.
    ///
    /// Defaults to `output_dir` in ctt.toml, then to `.ctt-temporal`.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Execute the `temporal` command.
pub fn execute(
    args: TemporalArgs,
    base_dir: &Path,
    color_flag: &str,
    log_level: &str,
) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = Config::load(base_dir).map_err(suggestions::for_error)?;
    let temporal = config.enabled_temporal().map_err(suggestions::for_error)?;
    if temporal.snapshots.is_empty() {
        return Err(suggestions::no_snapshots());
    }

    let source = temporal.source_project_path(base_dir)?;
    if !source.is_dir() {
        return Err(suggestions::source_project_missing(&source));
    }
    let root = RootCache::new()
        .resolve(&source, temporal.vcs)
        .map_err(suggestions::for_error)?;
    debug!("Source project repository root: {}", root.display());

    let template_config = read_template_config(base_dir).map_err(suggestions::for_error)?;
    let output_dir = match &args.output {
        Some(output) => base_dir.join(output),
        None => temporal.output_dir_path(base_dir),
    };
    let parallel = args.parallel || temporal.parallel;
    let max_workers = args
        .max_workers
        .map(|n| n as usize)
        .or(temporal.max_workers);

    let worker = std::env::current_exe().context("Cannot locate the ctt executable")?;
    let tester = TemporalTester::new(base_dir, &source, &output_dir)
        .with_keep_temp_dirs(args.keep_temp_dirs || temporal.keep_temp_dirs)
        .with_answers_file(template_config.answers_file_name())
        .with_trial_process(TrialProcess::new(worker).with_args([
            "--log-level",
            log_level,
            "run-trial",
        ]));

    println!(
        "{} Testing {} snapshot(s) of {}",
        emoji(&out, "🕰️ ", "[TEMPORAL]"),
        temporal.snapshots.len(),
        source.display()
    );

    let progress = out.trial_progress(temporal.snapshots.len());
    let results = tester.run_all_with_progress(
        &temporal.snapshots,
        parallel,
        max_workers,
        &|result: &TrialResult| {
            progress.set_message(result.snapshot_name.clone());
            progress.inc(1);
        },
    );
    progress.finish_and_clear();

    report::generate_summary_report(&results, &output_dir, out.use_color)?;

    let summary = Summary::from_results(&results);
    if !summary.all_passed() {
        return Err(suggestions::trials_failed(summary.failed, summary.total));
    }

    println!(
        "{} All {} snapshot(s) completed",
        emoji(&out, "✅", "[OK]"),
        summary.total
    );
    Ok(())
}

/// Execute the hidden `run-trial` command.
///
/// Reads a [`TrialRequest`] as JSON from stdin and prints the trial's result
/// as JSON on stdout. Trial failures are part of the result; only an
/// unreadable request fails the command.
pub fn run_trial() -> Result<()> {
    let input =
        std::io::read_to_string(std::io::stdin()).context("Failed to read trial request")?;
    let request: TrialRequest = serde_json::from_str(&input).context("Invalid trial request")?;
    let result = request.run();
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
