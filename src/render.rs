//! Rendering every configured output directory.
//!
//! Each `[output."<dir>"]` table in `ctt.toml` is rendered from the template
//! in the base directory with `[defaults]` overlaid by the table's own data.
//! Any `_extra_tasks` then run in the output directory. The rendered trees are
//! meant to be committed, so anything that would make them differ between
//! runs (a nested `.git`, machine-specific answers) is cleaned up afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::answers::{find_answers_file, stabilize_answers_file};
use crate::config::Config;
use crate::defaults::{ANSWERS_TEMPLATE_NAME, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use crate::filesystem::{is_vcs_metadata, remove_dir_all_force};
use crate::tasks::run_extra_tasks;
use crate::template::{read_template_config, CopyOptions, TemplateConfig, TemplateEngine};

/// Template paths never copied into rendered output.
pub const RENDER_EXCLUDES: &[&str] = &[".ctt", CONFIG_FILE_NAME];

/// Render all outputs configured in `base_dir/ctt.toml`.
///
/// Returns the rendered output directories in configuration key order. When
/// the base directory has no copier template configuration, a message is
/// printed and nothing is rendered.
pub fn run(base_dir: &Path, engine: &dyn TemplateEngine) -> Result<Vec<PathBuf>> {
    let config = Config::load(base_dir)?;
    config.require_outputs()?;

    let template_config = match read_template_config(base_dir) {
        Ok(template_config) => template_config,
        Err(Error::TemplateConfigNotFound { .. }) => {
            println!(
                "Please add a 'copier.yaml' file to '{}'",
                base_dir.display()
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };
    let has_answers_template = has_answers_template(base_dir);

    let options = CopyOptions {
        exclude: RENDER_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        vcs_ref: Some("HEAD".to_string()),
    };

    let mut rendered = Vec::with_capacity(config.output.len());
    for (relative, table) in &config.output {
        let output_path = base_dir.join(relative);
        fs::create_dir_all(&output_path)?;
        info!("Creating: {}", output_path.display());

        engine.copy(base_dir, &output_path, &config.output_data(table), &options)?;
        run_extra_tasks(config.extra_tasks(table), &output_path)?;

        let git_dir = output_path.join(".git");
        if git_dir.is_dir() {
            info!("Removing git created by copier: {}", git_dir.display());
            remove_dir_all_force(&git_dir)?;
        }

        finalize_answers(&template_config, &output_path, has_answers_template)?;
        rendered.push(output_path);
    }

    Ok(rendered)
}

/// Whether the template writes its own answers file through
/// `{{ _copier_conf.answers_file }}.jinja`.
pub fn has_answers_template(template_dir: &Path) -> bool {
    WalkDir::new(template_dir)
        .into_iter()
        .filter_entry(|entry| !is_vcs_metadata(entry.file_name()))
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file() && entry.file_name() == ANSWERS_TEMPLATE_NAME)
}

fn finalize_answers(
    template_config: &TemplateConfig,
    output_path: &Path,
    has_answers_template: bool,
) -> Result<()> {
    if has_answers_template {
        return stabilize_answers_file(template_config, output_path).inspect_err(|e| {
            warn!("{}", e);
        });
    }

    // Without a custom answers template the answers file is just noise
    match find_answers_file(template_config, output_path) {
        Ok(path) if path.is_file() => {
            debug!("Removing {}", path.display());
            fs::remove_file(path)?;
        }
        Ok(_) => {}
        Err(e) => debug!("No answers file to remove: {}", e),
    }
    Ok(())
}
