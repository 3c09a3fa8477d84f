//! # Template Engine Boundary
//!
//! ctt does not render templates itself. Everything copier does is reached
//! through the [`TemplateEngine`] trait, whose default implementation,
//! [`CopierCli`], shells out to the `copier` executable. Tests substitute
//! their own engines to exercise the orchestrator without copier installed.
//!
//! The module also reads the template's own configuration (`copier.yaml` or
//! `copier.yml`), which ctt needs to find the answers file name.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::answers::resolve_answers_file;
use crate::defaults::{ANSWERS_FILE_NAME, TEMPLATE_FILE_NAME};
use crate::error::{Error, Result};
use crate::git::stderr_of;

/// A scalar value passed to the template engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Bool(b) => write!(f, "{}", b),
            TemplateValue::Integer(i) => write!(f, "{}", i),
            TemplateValue::Float(x) => write!(f, "{}", x),
            TemplateValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::String(value.to_string())
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        TemplateValue::Bool(value)
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        TemplateValue::Integer(value)
    }
}

/// Template variables, ordered by key for reproducible command lines.
pub type TemplateData = BTreeMap<String, TemplateValue>;

/// Options for a fresh render.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Paths (relative to the template) copier must not copy.
    pub exclude: Vec<String>,
    /// Template ref to render from.
    pub vcs_ref: Option<String>,
}

/// Operations ctt needs from a templating engine.
pub trait TemplateEngine: Send + Sync {
    /// Update the project in `project_dir` in place.
    ///
    /// `answers_file` is relative to `project_dir` and may contain copier
    /// `{{ ... }}` expressions. Implementations must honour
    /// an existing answers file so previously answered questions are reused.
    fn update(&self, project_dir: &Path, answers_file: &str, data: &TemplateData) -> Result<()>;

    /// Render `template` into `destination`.
    fn copy(
        &self,
        template: &Path,
        destination: &Path,
        data: &TemplateData,
        options: &CopyOptions,
    ) -> Result<()>;
}

/// [`TemplateEngine`] backed by the copier command line.
#[derive(Debug, Clone)]
pub struct CopierCli {
    program: PathBuf,
    template: PathBuf,
}

impl CopierCli {
    /// Use the `copier` found on `PATH` with the template at `template`.
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("copier"),
            template: template.into(),
        }
    }

    /// Use a specific copier executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    fn run(&self, args: Vec<String>, cwd: Option<&Path>) -> Result<()> {
        let command_line = format!("{} {}", self.program.display(), args.join(" "));
        debug!("Running {}", command_line);

        let mut command = Command::new(&self.program);
        command.args(&args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let output = command.output().map_err(|e| Error::Template {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(Error::Template {
                command: command_line,
                message: stderr_of(&output),
            });
        }
        Ok(())
    }
}

impl TemplateEngine for CopierCli {
    fn update(&self, project_dir: &Path, answers_file: &str, data: &TemplateData) -> Result<()> {
        let answers_path = resolve_answers_file(answers_file, project_dir)
            .ok()
            .filter(|path| path.is_file());
        let Some(answers_path) = answers_path else {
            // Nothing to update from; render the current template over the project
            debug!(
                "No {} in {}, falling back to a fresh copy",
                answers_file,
                project_dir.display()
            );
            return self.copy(&self.template, project_dir, data, &CopyOptions::default());
        };
        let relative = answers_path
            .strip_prefix(project_dir)
            .unwrap_or(&answers_path)
            .display()
            .to_string();

        let mut args = vec![
            "update".to_string(),
            "--answers-file".to_string(),
            relative,
            "--defaults".to_string(),
            "--overwrite".to_string(),
            "--trust".to_string(),
        ];
        args.extend(data_args(data));
        self.run(args, Some(project_dir))
    }

    fn copy(
        &self,
        template: &Path,
        destination: &Path,
        data: &TemplateData,
        options: &CopyOptions,
    ) -> Result<()> {
        let mut args = vec![
            "copy".to_string(),
            "--defaults".to_string(),
            "--overwrite".to_string(),
            "--trust".to_string(),
        ];
        if let Some(vcs_ref) = &options.vcs_ref {
            args.push("--vcs-ref".to_string());
            args.push(vcs_ref.clone());
        }
        for pattern in &options.exclude {
            args.push("--exclude".to_string());
            args.push(pattern.clone());
        }
        args.extend(data_args(data));
        args.push(template.display().to_string());
        args.push(destination.display().to_string());
        self.run(args, None)
    }
}

/// `--data key=value` pairs in key order.
pub fn data_args(data: &TemplateData) -> Vec<String> {
    data.iter()
        .flat_map(|(key, value)| ["--data".to_string(), format!("{}={}", key, value)])
        .collect()
}

/// The parts of the copier template configuration ctt uses.
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    /// Custom answers file name (`_answers_file`), possibly containing
    /// `{{ ... }}` expressions.
    pub answers_file: Option<String>,
    /// Path of the file the configuration was read from.
    pub path: PathBuf,
}

impl TemplateConfig {
    /// The answers file name copier will write.
    pub fn answers_file_name(&self) -> &str {
        self.answers_file
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(ANSWERS_FILE_NAME)
    }
}

/// Locate `copier.yaml` (or `copier.yml`) in `base_dir`.
pub fn find_template_config(base_dir: &Path) -> Result<PathBuf> {
    let yaml = base_dir.join(TEMPLATE_FILE_NAME);
    if yaml.is_file() {
        return Ok(yaml);
    }
    let yml = yaml.with_extension("yml");
    if yml.is_file() {
        return Ok(yml);
    }
    Err(Error::TemplateConfigNotFound { path: yaml })
}

/// Read the copier template configuration from `base_dir`.
pub fn read_template_config(base_dir: &Path) -> Result<TemplateConfig> {
    let path = find_template_config(base_dir)?;
    let content = std::fs::read_to_string(&path)?;
    let mut config = parse_template_config(&content)?;
    config.path = path;
    Ok(config)
}

/// Parse copier template configuration YAML.
///
/// Only the keys ctt cares about are extracted; questions and copier-specific
/// tags such as `!include` are ignored.
pub fn parse_template_config(content: &str) -> Result<TemplateConfig> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let Some(mapping) = value.as_mapping() else {
        return Ok(TemplateConfig::default());
    };
    Ok(TemplateConfig {
        answers_file: mapping
            .get("_answers_file")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        path: PathBuf::new(),
    })
}
