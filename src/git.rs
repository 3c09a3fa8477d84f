//! Thin wrappers around the system `git` command.
//!
//! Only the plumbing the temporal orchestrator needs lives here: a
//! full-history clone, a checkout and the raw `git diff --no-index` call used
//! by [`crate::diff`]. Repository detection lives in [`crate::vcs`].

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::{Error, Result};

/// Raw output of `git diff --no-index`.
#[derive(Debug, Clone)]
pub struct NoIndexDiff {
    /// The unified diff text.
    pub stdout: String,
    /// Whether git reported differences (exit status 1).
    pub differences_found: bool,
}

/// Clone a repository with its full history.
///
/// This uses the system git command, so local paths, SSH keys and credential
/// helpers configured for the user all work as usual.
pub fn clone_full(source: &Path, target_dir: &Path) -> Result<()> {
    // git won't clone into an existing non-empty directory
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Cloning {} into {}", source.display(), target_dir.display());

    let output = Command::new("git")
        .arg("clone")
        .arg(source)
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            source_path: source.display().to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitClone {
            source_path: source.display().to_string(),
            message: stderr_of(&output),
        });
    }

    Ok(())
}

/// Check out `ref_name` (tag, branch or commit) in `repo_dir`.
pub fn checkout(repo_dir: &Path, ref_name: &str) -> Result<()> {
    debug!("Checking out {} in {}", ref_name, repo_dir.display());

    let output = Command::new("git")
        .args(["-c", "advice.detachedHead=false", "checkout", ref_name])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| Error::GitCheckout {
            ref_name: ref_name.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCheckout {
            ref_name: ref_name.to_string(),
            message: stderr_of(&output),
        });
    }

    Ok(())
}

/// Run `git diff --no-index <original> <updated>` from `cwd`.
///
/// git exits with 1 when differences are found; that is reported through
/// [`NoIndexDiff::differences_found`], not as an error. Any other non-zero
/// status is an error.
pub fn diff_no_index(cwd: &Path, original: &Path, updated: &Path) -> Result<NoIndexDiff> {
    let output = Command::new("git")
        .args([
            "-c",
            "core.quotepath=off",
            "diff",
            "--no-index",
            "--no-color",
            "--no-ext-diff",
            "--no-renames",
        ])
        .arg(original)
        .arg(updated)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::Diff {
            message: format!("failed to run git diff: {}", e),
        })?;

    match output.status.code() {
        Some(0) | Some(1) => Ok(NoIndexDiff {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            differences_found: output.status.code() == Some(1),
        }),
        code => Err(Error::Diff {
            message: format!(
                "git diff --no-index exited with {}: {}",
                code.map(|c| c.to_string())
                    .unwrap_or_else(|| "a signal".to_string()),
                stderr_of(&output)
            ),
        }),
    }
}

pub(crate) fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
