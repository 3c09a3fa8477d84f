//! Extra tasks run inside rendered output.
//!
//! An `_extra_tasks` key in `[defaults]` or an `[output."<dir>"]` table lists
//! commands to run in the output directory once the template is rendered.
//! Each task takes the same shapes as a copier task:
//!
//! ```toml
//! [output.".ctt/demo"]
//! _extra_tasks = [
//!     "echo shell",                        # run through the shell
//!     ["touch", "argv.txt"],               # run directly
//!     { command = "ls", working_directory = "src" },
//! ]
//! ```
//!
//! A single task may also be given without the surrounding list. Task output
//! goes straight to the console.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// A command line, either for the shell or as explicit arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TaskCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl fmt::Display for TaskCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskCommand::Shell(line) => f.write_str(line),
            TaskCommand::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}

/// One entry of `_extra_tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtraTask {
    Command(TaskCommand),
    Table {
        command: TaskCommand,
        /// Relative to the output directory.
        #[serde(default)]
        working_directory: Option<PathBuf>,
    },
}

impl ExtraTask {
    pub fn command(&self) -> &TaskCommand {
        match self {
            ExtraTask::Command(command) | ExtraTask::Table { command, .. } => command,
        }
    }

    /// Directory the task runs in, for output rendered at `output_path`.
    pub fn working_dir(&self, output_path: &Path) -> PathBuf {
        match self {
            ExtraTask::Table {
                working_directory: Some(dir),
                ..
            } => output_path.join(dir),
            _ => output_path.to_path_buf(),
        }
    }

    /// Run the task for output rendered at `output_path`.
    pub fn run(&self, output_path: &Path) -> Result<()> {
        let command = self.command();
        let cwd = self.working_dir(output_path);
        info!("Running task: {}", command);
        debug!("Task working directory: {}", cwd.display());

        let mut process = match command {
            TaskCommand::Shell(line) => shell(line),
            TaskCommand::Argv(args) => {
                let (program, rest) = args.split_first().ok_or_else(|| Error::Task {
                    command: command.to_string(),
                    message: "empty command".to_string(),
                })?;
                let mut process = Command::new(program);
                process.args(rest);
                process
            }
        };

        let status = process
            .current_dir(&cwd)
            .status()
            .map_err(|e| Error::Task {
                command: command.to_string(),
                message: format!("failed to start: {}", e),
            })?;
        if !status.success() {
            return Err(Error::Task {
                command: command.to_string(),
                message: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}

/// Run `tasks` in order, stopping at the first failure.
pub fn run_extra_tasks(tasks: &[ExtraTask], output_path: &Path) -> Result<()> {
    tasks.iter().try_for_each(|task| task.run(output_path))
}

/// Accept either one task or a list of tasks.
pub fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<ExtraTask>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ExtraTask>),
        One(ExtraTask),
    }

    Ok(Some(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(tasks) => tasks,
        OneOrMany::One(task) => vec![task],
    }))
}

#[cfg(unix)]
fn shell(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}
