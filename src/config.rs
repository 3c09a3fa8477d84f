//! # Configuration Schema and Parsing
//!
//! This module defines the structures behind `ctt.toml` and the rules used to
//! validate it. A configuration has three top-level sections:
//!
//! - **`[defaults]`**: template data shared by every rendered output.
//! - **`[output."<dir>"]`**: one table per output directory, holding the data
//!   overlaid on `[defaults]` for that render.
//!
//! Both data tables may carry `_extra_tasks`, commands run in the output
//! directory after rendering (see [`crate::tasks`]). The key is never passed
//! to the template.
//! - **`[temporal]`**: temporal testing settings and the list of
//!   `[[temporal.snapshots]]` to test.
//!
//! Every validation rule runs in [`Config::load`], so a broken configuration
//! is reported before any rendering or trial starts.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::defaults::{CONFIG_FILE_NAME, METADATA_FILE_NAME, TEMPORAL_OUTPUT_DIR};
use crate::error::{Error, Result};
use crate::tasks::{one_or_many, ExtraTask};
use crate::template::TemplateData;
use crate::temporal::Snapshot;
use crate::vcs::VcsKind;

/// Parsed `ctt.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Shared template data. `None` when the section is missing.
    #[serde(default)]
    pub defaults: Option<DataTable>,
    /// Output directories (relative to the base directory) and their data.
    #[serde(default)]
    pub output: BTreeMap<String, DataTable>,
    #[serde(default)]
    pub temporal: Option<TemporalConfig>,
    /// Directory the configuration was loaded from.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A `[defaults]` or `[output."<dir>"]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataTable {
    #[serde(default, rename = "_extra_tasks", deserialize_with = "one_or_many")]
    pub extra_tasks: Option<Vec<ExtraTask>>,
    /// Everything else is template data.
    #[serde(flatten)]
    pub data: TemplateData,
}

/// How temporal trials are selected. Only snapshot lists exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalMode {
    #[default]
    Snapshots,
}

/// The `[temporal]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemporalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: TemporalMode,
    /// Project whose history is tested, relative to the config's directory.
    #[serde(default)]
    pub source_project: Option<PathBuf>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub keep_temp_dirs: bool,
    /// Where results are written, relative to the base directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub vcs: VcsKind,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

impl Config {
    /// Load and validate `ctt.toml` from `base_dir`.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            let path = std::path::absolute(&path).unwrap_or(path);
            return Err(Error::ConfigNotFound { path });
        }
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::parse(&content)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.message().to_string(),
            hint: Some(format!(
                "check {} near line {}",
                CONFIG_FILE_NAME,
                e.span()
                    .map(|span| line_of(content, span.start))
                    .unwrap_or(1)
            )),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.defaults.is_none() {
            warn!("You probably want a section: [defaults]");
        }
        if let Some(temporal) = &self.temporal {
            temporal.validate()?;
        }
        Ok(())
    }

    /// Fail unless at least one `[output."<dir>"]` table exists.
    pub fn require_outputs(&self) -> Result<()> {
        if self.output.is_empty() {
            return Err(Error::ConfigParse {
                message: "no output directories configured".to_string(),
                hint: Some("ctt expects headers like: [output.\"<something>\"]".to_string()),
            });
        }
        Ok(())
    }

    /// Data for one output: `[defaults]` overlaid with the output's own table.
    pub fn output_data(&self, output: &DataTable) -> TemplateData {
        let mut data = self
            .defaults
            .as_ref()
            .map(|defaults| defaults.data.clone())
            .unwrap_or_default();
        data.extend(output.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        data
    }

    /// Tasks for one output: its own `_extra_tasks`, else those of `[defaults]`.
    pub fn extra_tasks<'a>(&'a self, output: &'a DataTable) -> &'a [ExtraTask] {
        output
            .extra_tasks
            .as_deref()
            .or_else(|| self.defaults.as_ref()?.extra_tasks.as_deref())
            .unwrap_or_default()
    }

    /// The `[temporal]` section, if it exists and is enabled.
    pub fn enabled_temporal(&self) -> Result<&TemporalConfig> {
        match &self.temporal {
            Some(temporal) if temporal.enabled => Ok(temporal),
            _ => Err(Error::TemporalDisabled),
        }
    }
}

impl TemporalConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.source_project.is_none() {
            return Err(Error::ConfigParse {
                message: "temporal testing is enabled but `source_project` is missing".to_string(),
                hint: Some(
                    "add `source_project = \"../my-project\"` to the [temporal] section"
                        .to_string(),
                ),
            });
        }
        if self.max_workers == Some(0) {
            return Err(Error::config("`max_workers` must be at least 1"));
        }

        let mut seen = HashSet::new();
        for (index, snapshot) in self.snapshots.iter().enumerate() {
            validate_snapshot_name(&snapshot.name).map_err(|message| Error::ConfigParse {
                message: format!("snapshot #{}: {}", index + 1, message),
                hint: Some("snapshot names become directory names; use letters, digits, '-', '_' or '.'".to_string()),
            })?;
            if snapshot.r#ref.trim().is_empty() {
                return Err(Error::config(format!(
                    "snapshot '{}' has an empty `ref`",
                    snapshot.name
                )));
            }
            if !seen.insert(snapshot.name.as_str()) {
                return Err(Error::config(format!(
                    "duplicate snapshot name '{}'",
                    snapshot.name
                )));
            }
        }
        Ok(())
    }

    /// Absolute or `config_dir`-relative path of the source project.
    pub fn source_project_path(&self, config_dir: &Path) -> Result<PathBuf> {
        let source = self
            .source_project
            .as_ref()
            .ok_or_else(|| Error::config("`source_project` is missing"))?;
        Ok(config_dir.join(source))
    }

    /// Directory receiving results, resolved against `base_dir`.
    pub fn output_dir_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(
            self.output_dir
                .as_deref()
                .unwrap_or(Path::new(TEMPORAL_OUTPUT_DIR)),
        )
    }
}

/// Check that a snapshot name is usable as a single directory name.
pub fn validate_snapshot_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("snapshot name must not be empty".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("'{}' is not a valid snapshot name", name));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("snapshot name '{}' must not contain path separators", name));
    }
    if name == METADATA_FILE_NAME {
        return Err(format!("'{}' is reserved", name));
    }
    Ok(())
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].matches('\n').count() + 1
}
