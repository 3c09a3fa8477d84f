//! # Error Handling
//!
//! This module defines the centralized error type for `ctt`. It uses
//! `thiserror` to describe every anticipated failure mode with enough context
//! to be printed straight to the user.
//!
//! Errors fall into two groups that are handled very differently:
//!
//! - **Configuration errors** (`ConfigNotFound`, `ConfigParse`,
//!   `TemporalDisabled`, `InvalidVcsKind`) are detected before any work starts
//!   and abort the whole run.
//! - **Trial errors** (VCS, diff, template and filesystem failures) are caught
//!   by the temporal orchestrator and recorded in the failing trial's result,
//!   so one bad snapshot never aborts its siblings.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ctt operations
#[derive(Error, Debug)]
pub enum Error {
    /// The `ctt.toml` configuration file does not exist.
    #[error("No configuration file found. Expected: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// An error occurred while parsing or validating `ctt.toml`.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Temporal testing was requested but is not enabled in the configuration.
    #[error("Temporal testing is not enabled. Add a [temporal] section with `enabled = true` to ctt.toml")]
    TemporalDisabled,

    /// The directory is not inside a repository of the selected VCS.
    #[error("Not a {vcs} repository: {}", path.display())]
    NotARepository { vcs: String, path: PathBuf },

    /// Auto-detection found neither a jj workspace nor a git repository.
    #[error("No VCS detected in {} (tried: jujutsu, git)", path.display())]
    NoVcsDetected { path: PathBuf },

    /// An unknown VCS name was requested.
    #[error("Invalid VCS type '{value}'. Must be one of: auto, git, jj, jujutsu")]
    InvalidVcsKind { value: String },

    /// An error occurred while cloning the source project.
    #[error("Git clone error for {source_path}: {message}")]
    GitClone {
        source_path: String,
        message: String,
    },

    /// The requested ref could not be checked out.
    #[error("Git checkout error for ref '{ref_name}': {message}")]
    GitCheckout { ref_name: String, message: String },

    /// A VCS command exited unsuccessfully.
    #[error("VCS command failed in {}: {command} - {stderr}", cwd.display())]
    VcsCommand {
        command: String,
        cwd: PathBuf,
        stderr: String,
    },

    /// The diff tool failed for a reason other than finding differences.
    #[error("Diff error: {message}")]
    Diff { message: String },

    /// The template engine failed.
    #[error("Template engine error: {command} - {message}")]
    Template { command: String, message: String },

    /// No `copier.yaml` or `copier.yml` exists in the template directory.
    #[error("Can't find the copier template file. Expected: {} (or .yml)", path.display())]
    TemplateConfigNotFound { path: PathBuf },

    /// The copier answers file could not be located unambiguously.
    #[error("Answers file error: {message}")]
    AnswersFile { message: String },

    /// Rendered output contains files that are not tracked by the VCS.
    #[error("Untracked files must be added: {}", paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    UntrackedFiles { paths: Vec<PathBuf> },

    /// An `_extra_tasks` command failed.
    #[error("Task failed: {command} - {message}")]
    Task { command: String, message: String },

    /// A trial running in its own process did not produce a result.
    #[error("Trial process error: {message}")]
    TrialProcess { message: String },

    /// An error occurred while copying or removing a directory tree.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Shorthand for a configuration error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            hint: None,
        }
    }

    /// Whether this error should abort a run before any trial starts.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::TemporalDisabled
                | Error::InvalidVcsKind { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
