//! # Diff Engine
//!
//! Compares two directory trees with `git diff --no-index`, persists the
//! unified diff as a patch file and classifies every file mentioned in it as
//! added, removed or changed.
//!
//! The diff is run from the common parent of both trees with relative
//! arguments, so file headers look like
//! `diff --git a/original/src/lib.rs b/updated/src/lib.rs`. The tree
//! directory names are stripped again while classifying, leaving paths
//! relative to the tree roots.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git;

/// Result of diffing two directories.
///
/// When `has_changes` is false every list is empty and `patch_file` is `None`.
/// A path never appears in more than one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub has_changes: bool,
    pub patch_file: Option<PathBuf>,
    pub changed: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl DiffResult {
    /// A result with no differences.
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// How a file differs between the two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// A single classified file entry from a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// Diff `original` against `updated` and write the patch to `output_file`.
///
/// Nothing is written when the trees are identical.
pub fn generate_diff(original: &Path, updated: &Path, output_file: &Path) -> Result<DiffResult> {
    debug!(
        "Generating diff between {} and {}",
        original.display(),
        updated.display()
    );

    let (cwd, original_rel, updated_rel) = relative_to_common_parent(original, updated)?;
    let raw = git::diff_no_index(&cwd, &original_rel, &updated_rel)?;

    if raw.stdout.trim().is_empty() {
        if raw.differences_found {
            return Err(Error::Diff {
                message: "git reported differences but produced no output".to_string(),
            });
        }
        return Ok(DiffResult::unchanged());
    }

    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_file, &raw.stdout)?;

    let prefixes = [
        format!("{}/", slash_path(&original_rel)),
        format!("{}/", slash_path(&updated_rel)),
    ];
    let mut result = DiffResult {
        has_changes: true,
        patch_file: Some(output_file.to_path_buf()),
        ..DiffResult::default()
    };
    for change in classify_patch(&raw.stdout, &prefixes) {
        match change.kind {
            ChangeKind::Added => result.added.push(change.path),
            ChangeKind::Removed => result.removed.push(change.path),
            ChangeKind::Changed => result.changed.push(change.path),
        }
    }

    Ok(result)
}

/// Parse the file headers of a git patch into classified changes.
///
/// `tree_prefixes` are stripped from the start of each path (after the `a/`
/// or `b/` marker). Each path is reported at most once.
pub fn classify_patch(patch: &str, tree_prefixes: &[String]) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut current: Option<PendingEntry> = None;

    for line in patch.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some(entry) = current.take() {
                changes.push(entry.finish());
            }
            current = Some(PendingEntry::from_header(header));
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if line.starts_with("new file mode") {
            entry.kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            entry.kind = ChangeKind::Removed;
        } else if let Some(path) = line.strip_prefix("--- ") {
            entry.old_path = side_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            entry.new_path = side_path(path, "b/");
        }
    }
    if let Some(entry) = current.take() {
        changes.push(entry.finish());
    }

    let mut seen = HashSet::new();
    changes
        .into_iter()
        .filter_map(|mut change| {
            change.path = strip_tree_prefix(&change.path, tree_prefixes);
            if change.path.is_empty() || !seen.insert(change.path.clone()) {
                return None;
            }
            Some(change)
        })
        .collect()
}

#[derive(Debug)]
struct PendingEntry {
    header_old: Option<String>,
    header_new: Option<String>,
    old_path: Option<String>,
    new_path: Option<String>,
    kind: ChangeKind,
}

impl PendingEntry {
    fn from_header(header: &str) -> Self {
        // "a/<old> b/<new>"; split on the last " b/" so spaces in names survive
        let (old, new) = match header.rfind(" b/") {
            Some(idx) => (
                header[..idx].strip_prefix("a/").map(str::to_string),
                Some(header[idx + 3..].to_string()),
            ),
            None => (None, None),
        };
        Self {
            header_old: old,
            header_new: new,
            old_path: None,
            new_path: None,
            kind: ChangeKind::Changed,
        }
    }

    fn finish(self) -> FileChange {
        let path = match self.kind {
            ChangeKind::Removed => self.old_path.or(self.header_old).or(self.header_new),
            _ => self.new_path.or(self.header_new).or(self.header_old),
        };
        FileChange {
            path: path.unwrap_or_default(),
            kind: self.kind,
        }
    }
}

/// Path from a `---`/`+++` line, or `None` for `/dev/null`.
fn side_path(raw: &str, marker: &str) -> Option<String> {
    let raw = raw.trim_end().trim_matches('"');
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(marker).unwrap_or(raw).to_string())
}

fn strip_tree_prefix(path: &str, prefixes: &[String]) -> String {
    prefixes
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix.as_str()))
        .unwrap_or(path)
        .to_string()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split two paths into their shared parent and the relative remainders.
fn relative_to_common_parent(a: &Path, b: &Path) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let a = std::path::absolute(a)?;
    let b = std::path::absolute(b)?;

    let mut common = PathBuf::new();
    for (left, right) in a.components().zip(b.components()) {
        if left != right {
            break;
        }
        common.push(left.as_os_str());
    }

    let a_rel = a.strip_prefix(&common).unwrap_or(&a).to_path_buf();
    let b_rel = b.strip_prefix(&common).unwrap_or(&b).to_path_buf();
    if a_rel.as_os_str().is_empty() || b_rel.as_os_str().is_empty() {
        return Err(Error::Diff {
            message: format!(
                "cannot diff a directory against itself or its parent: {} vs {}",
                a.display(),
                b.display()
            ),
        });
    }
    Ok((common, a_rel, b_rel))
}
