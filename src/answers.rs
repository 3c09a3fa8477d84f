//! Copier answers file handling.
//!
//! copier records the absolute template path and the template commit in the
//! answers file it writes. Both change between machines and commits, so
//! rendered output is stabilized before it is compared or committed.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use regex::Regex;

use crate::error::{Error, Result};
use crate::template::TemplateConfig;

/// Locate the answers file copier wrote into `dst`.
///
/// Names containing `{{ ... }}` expressions are matched as globs, and exactly
/// one file must match. Static names are returned as-is without checking that
/// the file exists.
pub fn find_answers_file(template_config: &TemplateConfig, dst: &Path) -> Result<PathBuf> {
    resolve_answers_file(template_config.answers_file_name(), dst)
}

/// [`find_answers_file`] for a raw answers file name.
pub fn resolve_answers_file(name: &str, dst: &Path) -> Result<PathBuf> {
    if !name.contains("{{") {
        return Ok(dst.join(name));
    }

    let search_name = Regex::new(r"\{\{[^}]+\}\}")?.replace_all(name, "*");
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dst.to_string_lossy()),
        search_name
    );
    let matches = glob::glob(&pattern)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Io(e.into_error()))?;

    match matches.as_slice() {
        [single] => Ok(single.clone()),
        _ => Err(Error::AnswersFile {
            message: format!(
                "can't find just one copier answers file matching {}. Found: {:?}",
                pattern, matches
            ),
        }),
    }
}

/// Replace machine-specific values in one answers file line.
///
/// `_src_path` becomes relative to the answers file when the answers file
/// lives below it, and `_commit` is pinned to `HEAD`, a value copier still
/// accepts.
pub fn stabilize_line(line: &str, answers_path: &Path) -> String {
    if line.starts_with("_src_path") {
        info!("Replacing with deterministic value: {}", line);
        let raw = line
            .rsplit("_src_path:")
            .next()
            .unwrap_or_default()
            .trim();
        let raw_path = Path::new(raw);
        let answers_dir = answers_path.parent().unwrap_or(Path::new(""));
        if let Ok(relative) = answers_dir.strip_prefix(raw_path) {
            let name = raw_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut parts = vec![".."; relative.components().count()];
            parts.push(&name);
            return format!("_src_path: {}", parts.join("/"));
        }
        return line.to_string();
    }
    if line.starts_with("_commit") {
        info!("Replacing with deterministic value: {}", line);
        return "_commit: HEAD".to_string();
    }
    line.to_string()
}

/// Rewrite the answers file in `dst` with stable values and no blank lines.
pub fn stabilize_answers_file(template_config: &TemplateConfig, dst: &Path) -> Result<()> {
    let answers_path = find_answers_file(template_config, dst)?;
    let content = fs::read_to_string(&answers_path)?;
    let mut stabilized = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| stabilize_line(line, &answers_path))
        .collect::<Vec<_>>()
        .join("\n");
    stabilized.push('\n');
    fs::write(&answers_path, stabilized)?;
    Ok(())
}
