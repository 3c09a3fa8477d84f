//! # Copier Template Tester
//!
//! `ctt` exercises [copier](https://copier.readthedocs.io) templates in two
//! ways:
//!
//! - **Rendering**: every `[output."<dir>"]` table in `ctt.toml` is rendered
//!   from the template with its own data. The output is stabilized so it can
//!   be committed and reviewed like any other file, and a pre-commit hook can
//!   fail when new output has not been added yet.
//! - **Temporal testing**: the current template is applied to historical
//!   states of a real project (tags, branches or commits), and the changes it
//!   would make are captured as patches for review.
//!
//! ## Quick Example
//!
//! ```
//! use ctt::config::Config;
//!
//! let config = Config::parse(r#"
//! [defaults]
//! project_name = "demo"
//!
//! [output.".ctt/default"]
//!
//! [temporal]
//! enabled = true
//! source_project = "../demo-project"
//!
//! [[temporal.snapshots]]
//! name = "v1"
//! ref = "v1.0.0"
//! "#).unwrap();
//!
//! let temporal = config.enabled_temporal().unwrap();
//! assert_eq!(temporal.snapshots[0].r#ref, "v1.0.0");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the `ctt.toml` schema and its validation.
//! - **Template engine (`template`)**: the seam to copier. [`template::CopierCli`]
//!   runs the copier executable; tests plug in their own engines.
//! - **Temporal testing (`temporal`)**: the trial orchestrator, with serial
//!   and bounded parallel execution and results in input order.
//! - **Diffs (`diff`)**: patches between two trees with added, removed and
//!   changed files classified.
//! - **Version control (`vcs`, `git`, `cache`)**: git and jj backends behind one
//!   trait, the git plumbing used by trials, and a cache of repository roots.
//! - **Reporting (`report`)**: the console summary and `metadata.json`.
//! - **Rendering (`render`, `tasks`, `answers`, `precommit`)**: output
//!   rendering, extra tasks run in each output, answers file stabilization
//!   and the untracked-output check.

pub mod answers;
pub mod cache;
pub mod config;
pub mod defaults;
pub mod diff;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod output;
pub mod precommit;
pub mod render;
pub mod report;
pub mod suggestions;
pub mod tasks;
pub mod template;
pub mod temporal;
pub mod vcs;
