//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::RENDER_ONLY);
//!     fixture.command().assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// `ctt.toml` snippets.
#[allow(dead_code)]
pub mod configs {
    /// One output directory and shared defaults.
    pub const RENDER_ONLY: &str = r#"
[defaults]
project_name = "demo"

[output.".ctt/default"]
"#;

    /// Defaults without any output table.
    pub const NO_OUTPUTS: &str = r#"
[defaults]
project_name = "demo"
"#;

    /// A `[temporal]` section that is switched off.
    pub const TEMPORAL_DISABLED: &str = r#"
[defaults]
project_name = "demo"

[temporal]
enabled = false
source_project = "project"
"#;

    /// A snapshot without the required `ref`.
    pub const SNAPSHOT_WITHOUT_REF: &str = r#"
[temporal]
enabled = true
source_project = "project"

[[temporal.snapshots]]
name = "v1"
"#;

    /// Enabled, but nothing to test.
    pub const NO_SNAPSHOTS: &str = r#"
[temporal]
enabled = true
source_project = "project"
"#;

    /// Temporal testing of `./project` at a ref that does not exist.
    pub const MISSING_REF: &str = r#"
[defaults]
project_name = "demo"

[temporal]
enabled = true
source_project = "project"

[[temporal.snapshots]]
name = "gone"
ref = "v9.9.9"
description = "never tagged"
"#;
}

/// A temporary template directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `ctt.toml`.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("ctt.toml", content)
    }

    /// Write a minimal `copier.yaml`.
    pub fn with_template(self) -> Self {
        self.with_file("copier.yaml", "project_name:\n  type: str\n")
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Create a git repository at `path` with `README.md` tagged `v1.0`.
    pub fn with_git_project(self, path: &str) -> Self {
        let project = self.path().join(path);
        std::fs::create_dir_all(&project).expect("Failed to create project directory");
        for args in [
            &["init", "-q"][..],
            &["config", "user.email", "tester@example.com"],
            &["config", "user.name", "Tester"],
            &["config", "commit.gpgsign", "false"],
        ] {
            git(&project, args);
        }
        std::fs::write(project.join("README.md"), "# Project\n").expect("Failed to write README");
        git(&project, &["add", "."]);
        git(&project, &["commit", "-q", "-m", "Initial commit"]);
        git(&project, &["tag", "v1.0"]);
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Path below the fixture root.
    pub fn join(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// A `ctt` command running in this fixture's directory without colors.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ctt");
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env_remove("CLICOLOR_FORCE")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `cwd`, panicking on failure.
#[allow(dead_code)]
pub fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::RENDER_ONLY);
        assert!(fixture.join("ctt.toml").exists());
    }

    #[test]
    fn test_configs_are_valid_toml() {
        for config in [
            configs::RENDER_ONLY,
            configs::NO_OUTPUTS,
            configs::TEMPORAL_DISABLED,
            configs::SNAPSHOT_WITHOUT_REF,
            configs::NO_SNAPSHOTS,
            configs::MISSING_REF,
        ] {
            toml::from_str::<toml::Value>(config).expect("Config should be valid TOML");
        }
    }
}
