//! # Version Control Abstraction
//!
//! A small interface over the version-control systems ctt supports, so the
//! pre-commit check and root-directory resolution work the same way in a git
//! repository and in a Jujutsu (`jj`) workspace.
//!
//! ## Backend selection
//!
//! [`VcsKind`] names a backend explicitly (`git`, `jj`/`jujutsu`) or asks for
//! auto-detection (`auto`). Auto-detection ([`detect`]) first looks for a
//! marker directory, which needs no subprocess, and only then falls back to
//! running each backend's root command:
//!
//! 1. `.jj` marker
//! 2. `.git` marker
//! 3. `jj workspace root`
//! 4. `git rev-parse --show-toplevel`
//!
//! A colocated workspace has both markers; jj wins that tie.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};
use crate::git::stderr_of;

/// Operations ctt needs from a version-control system.
pub trait VcsBackend: Send + Sync {
    /// Resolve the repository (or workspace) root containing `cwd`.
    fn root_dir(&self, cwd: &Path) -> Result<PathBuf>;

    /// List untracked paths, relative to `cwd`.
    fn untracked_files(&self, cwd: &Path) -> Result<Vec<String>>;

    /// Check whether `path` is inside a repository of this backend.
    fn is_repository(&self, path: &Path) -> bool;
}

/// Selects a VCS backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VcsKind {
    #[default]
    Auto,
    Git,
    Jujutsu,
}

impl VcsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsKind::Auto => "auto",
            VcsKind::Git => "git",
            VcsKind::Jujutsu => "jj",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(VcsKind::Auto),
            "git" => Ok(VcsKind::Git),
            "jj" | "jujutsu" => Ok(VcsKind::Jujutsu),
            _ => Err(Error::InvalidVcsKind {
                value: s.to_string(),
            }),
        }
    }
}

impl<'de> serde::Deserialize<'de> for VcsKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Git backend using the git CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVcs;

/// Jujutsu backend using the jj CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct JujutsuVcs;

impl VcsBackend for GitVcs {
    fn root_dir(&self, cwd: &Path) -> Result<PathBuf> {
        let stdout = run_vcs("git", &["rev-parse", "--show-toplevel"], cwd, "git")?;
        Ok(PathBuf::from(stdout.trim()))
    }

    fn untracked_files(&self, cwd: &Path) -> Result<Vec<String>> {
        // `--porcelain` prints paths relative to the repository root
        let stdout = run_vcs(
            "git",
            &["status", "--porcelain", "--untracked-files=all", "--", "."],
            cwd,
            "git",
        )?;
        let prefix = run_vcs("git", &["rev-parse", "--show-prefix"], cwd, "git")?;
        Ok(parse_git_untracked(&stdout, prefix.trim()))
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".git").exists() || self.root_dir(path).is_ok()
    }
}

impl VcsBackend for JujutsuVcs {
    fn root_dir(&self, cwd: &Path) -> Result<PathBuf> {
        let stdout = run_vcs("jj", &["workspace", "root"], cwd, "jj")?;
        Ok(PathBuf::from(stdout.trim()))
    }

    fn untracked_files(&self, cwd: &Path) -> Result<Vec<String>> {
        let stdout = run_vcs("jj", &["status"], cwd, "jj")?;
        Ok(parse_jj_untracked(&stdout))
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".jj").exists() || self.root_dir(path).is_ok()
    }
}

/// Marker entry of each concrete backend, in detection priority order.
const MARKERS: [(VcsKind, &str); 2] = [(VcsKind::Jujutsu, ".jj"), (VcsKind::Git, ".git")];

/// Auto-detect the VCS in use at `cwd`.
///
/// Marker directories are checked first for every backend, so no subprocess
/// runs in the common case. jj wins when both markers exist.
pub fn detect(cwd: &Path) -> Result<VcsKind> {
    MARKERS
        .iter()
        .find(|(_, marker)| cwd.join(marker).exists())
        .or_else(|| {
            MARKERS
                .iter()
                .find(|(kind, _)| concrete(*kind).is_repository(cwd))
        })
        .map(|(kind, _)| *kind)
        .ok_or_else(|| Error::NoVcsDetected {
            path: cwd.to_path_buf(),
        })
}

/// Resolve [`VcsKind::Auto`] through [`detect`]; other kinds are returned as is.
pub fn resolve_kind(kind: VcsKind, cwd: &Path) -> Result<VcsKind> {
    match kind {
        VcsKind::Auto => detect(cwd),
        kind => Ok(kind),
    }
}

/// Get the backend for `kind`, auto-detecting from `cwd` for [`VcsKind::Auto`].
pub fn backend(kind: VcsKind, cwd: &Path) -> Result<Box<dyn VcsBackend>> {
    Ok(concrete(resolve_kind(kind, cwd)?))
}

fn concrete(kind: VcsKind) -> Box<dyn VcsBackend> {
    match kind {
        VcsKind::Jujutsu => Box::new(JujutsuVcs),
        VcsKind::Git | VcsKind::Auto => Box::new(GitVcs),
    }
}

/// Run a VCS command in `cwd` and return its stdout.
///
/// A command that cannot be spawned, or that fails while complaining about a
/// missing repository, maps to [`Error::NotARepository`].
fn run_vcs(program: &str, args: &[&str], cwd: &Path, vcs: &str) -> Result<String> {
    debug!("Running {} {} in {}", program, args.join(" "), cwd.display());

    let not_a_repo = || Error::NotARepository {
        vcs: vcs.to_string(),
        path: cwd.to_path_buf(),
    };

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|_| not_a_repo())?;

    if !output.status.success() {
        let stderr = stderr_of(&output);
        let lowered = stderr.to_lowercase();
        if lowered.contains("not a git repository") || lowered.contains("no jj repo") {
            return Err(not_a_repo());
        }
        return Err(Error::VcsCommand {
            command: format!("{} {}", program, args.join(" ")),
            cwd: cwd.to_path_buf(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract `??` entries from `git status --porcelain`, relative to `prefix`.
fn parse_git_untracked(stdout: &str, prefix: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("?? "))
        .map(|path| path.trim().trim_matches('"'))
        .map(|path| path.strip_prefix(prefix).unwrap_or(path).to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

/// Extract untracked entries (`? path`) from `jj status`.
fn parse_jj_untracked(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.starts_with('?'))
        .filter_map(|line| line.split_whitespace().last())
        .filter(|path| *path != "?")
        .map(str::to_string)
        .collect()
}
