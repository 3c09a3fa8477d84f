//! # Error Suggestions
//!
//! Helpers that turn failures the user can fix into messages that say what
//! went wrong and how to fix it, as `hint:` lines under the error.
//!
//! ```rust,ignore
//! use ctt::suggestions;
//!
//! return Err(suggestions::temporal_disabled());
//! ```

use std::path::{Path, PathBuf};

use crate::error::Error;

const VCS_KINDS: [&str; 4] = ["auto", "git", "jj", "jujutsu"];

/// `ctt.toml` does not exist in the base directory.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "No configuration file found. Expected: {path}\n\n\
         hint: Run ctt from the template directory that contains ctt.toml\n\
         hint: Use --base-dir to point at another template directory",
        path = path.display()
    )
}

/// `ctt temporal` was run without an enabled `[temporal]` section.
pub fn temporal_disabled() -> anyhow::Error {
    anyhow::anyhow!(
        "Temporal testing is not enabled\n\n\
         hint: Add to ctt.toml:\n\
         \n    [temporal]\n    enabled = true\n    source_project = \"../my-project\"\n\n\
         hint: Then list refs to test with [[temporal.snapshots]] tables"
    )
}

/// Temporal testing is enabled but no snapshots are listed.
pub fn no_snapshots() -> anyhow::Error {
    anyhow::anyhow!(
        "No snapshots configured for temporal testing\n\n\
         hint: Add one table per ref to test:\n\
         \n    [[temporal.snapshots]]\n    name = \"v1\"\n    ref = \"v1.0.0\""
    )
}

/// The configured source project does not exist.
pub fn source_project_missing(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Source project not found: {path}\n\n\
         hint: `source_project` is resolved relative to the directory containing ctt.toml\n\
         hint: The source project must be a git repository with the snapshot refs",
        path = path.display()
    )
}

/// An unknown `--vcs` value.
pub fn invalid_vcs_kind(value: &str) -> anyhow::Error {
    let did_you_mean = find_similar(&value.to_lowercase(), &VCS_KINDS)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Invalid VCS type '{value}'{did_you_mean}\n\n\
         Valid values are: {kinds}",
        kinds = VCS_KINDS.join(", ")
    )
}

/// Rendered output that still has to be added to version control.
pub fn untracked_files(paths: &[PathBuf]) -> anyhow::Error {
    let listing = paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    anyhow::anyhow!(
        "pre-commit error: untracked files must be added\n{listing}\n\n\
         hint: Stage the rendered output (e.g. `git add .ctt`) and commit again"
    )
}

/// Some temporal trials failed.
pub fn trials_failed(failed: usize, total: usize) -> anyhow::Error {
    anyhow::anyhow!(
        "{failed} of {total} temporal test(s) failed\n\n\
         hint: Re-run with --log-level debug to see each step\n\
         hint: Use --keep-temp-dirs to inspect the failing checkout"
    )
}

/// Convert library errors the user can act on into hinted messages.
pub fn for_error(error: Error) -> anyhow::Error {
    match error {
        Error::ConfigNotFound { path } => config_not_found(&path),
        Error::TemporalDisabled => temporal_disabled(),
        Error::InvalidVcsKind { value } => invalid_vcs_kind(&value),
        Error::UntrackedFiles { paths } => untracked_files(&paths),
        other => other.into(),
    }
}

/// Closest candidate within an edit distance of two.
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, edit_distance(input, candidate)))
        .filter(|&(_, distance)| distance <= 2 && distance < input.len())
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance, keeping only the previous row.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        previous = current;
    }

    previous[b.len()]
}
