//! pre-commit support.
//!
//! pre-commit only fails a hook when tracked files change. Output rendered
//! into brand new files would slip through, so `--check-untracked` fails the
//! run when any rendered output is not yet tracked.

use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::error::{Error, Result};
use crate::vcs::{self, VcsKind};

/// Untracked files below any of `output_paths`.
pub fn untracked_outputs(
    output_paths: &[PathBuf],
    base_dir: &Path,
    kind: VcsKind,
) -> Result<Vec<PathBuf>> {
    let kind = vcs::resolve_kind(kind, base_dir)?;
    debug!("Listing untracked files with {}", kind);
    let backend = vcs::backend(kind, base_dir)?;

    let untracked = backend
        .untracked_files(base_dir)?
        .into_iter()
        .map(|relative| base_dir.join(relative.trim()))
        .filter(|path| output_paths.iter().any(|output| path.starts_with(output)))
        .collect();
    Ok(untracked)
}

/// Fail with [`Error::UntrackedFiles`] when rendered output is untracked.
pub fn check_for_untracked(output_paths: &[PathBuf], base_dir: &Path, kind: VcsKind) -> Result<()> {
    let paths = untracked_outputs(output_paths, base_dir, kind)?;
    if paths.is_empty() {
        return Ok(());
    }
    error!("pre-commit error: untracked files must be added");
    Err(Error::UntrackedFiles { paths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::{commit_all, git, init_repo};
    use std::fs;
    use tempfile::TempDir;

    fn repo_with_outputs() -> TempDir {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        fs::create_dir_all(temp.path().join("out")).unwrap();
        fs::write(temp.path().join("out/tracked.txt"), "tracked").unwrap();
        fs::write(temp.path().join("copier.yaml"), "").unwrap();
        commit_all(temp.path(), "init");
        temp
    }

    #[test]
    fn test_clean_outputs_pass() {
        let temp = repo_with_outputs();
        check_for_untracked(&[temp.path().join("out")], temp.path(), VcsKind::Git).unwrap();
    }

    #[test]
    fn test_untracked_output_fails() {
        let temp = repo_with_outputs();
        fs::create_dir_all(temp.path().join("out/nested")).unwrap();
        fs::write(temp.path().join("out/nested/new.txt"), "new").unwrap();

        let err = check_for_untracked(&[temp.path().join("out")], temp.path(), VcsKind::Git)
            .unwrap_err();
        match err {
            Error::UntrackedFiles { paths } => {
                assert_eq!(paths, vec![temp.path().join("out/nested/new.txt")]);
            }
            other => panic!("Expected UntrackedFiles, got {:?}", other),
        }
    }

    #[test]
    fn test_untracked_files_outside_outputs_are_ignored() {
        let temp = repo_with_outputs();
        fs::create_dir_all(temp.path().join("out_2")).unwrap();
        fs::write(temp.path().join("out_2/other.txt"), "x").unwrap();
        fs::write(temp.path().join("scratch.txt"), "x").unwrap();

        let untracked =
            untracked_outputs(&[temp.path().join("out")], temp.path(), VcsKind::Git).unwrap();
        assert!(untracked.is_empty());
    }

    #[test]
    fn test_added_files_pass() {
        let temp = repo_with_outputs();
        fs::write(temp.path().join("out/new.txt"), "new").unwrap();
        git(temp.path(), &["add", "out/new.txt"]);

        check_for_untracked(&[temp.path().join("out")], temp.path(), VcsKind::Git).unwrap();
    }

    #[test]
    fn test_auto_detects_git() {
        let temp = repo_with_outputs();
        fs::write(temp.path().join("out/new.txt"), "new").unwrap();

        let untracked =
            untracked_outputs(&[temp.path().join("out")], temp.path(), VcsKind::Auto).unwrap();
        assert_eq!(untracked, vec![temp.path().join("out/new.txt")]);
    }
}
