//! Default values for ctt configuration.
//!
//! This module provides centralized default names and locations used across
//! commands, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the ctt configuration file looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "ctt.toml";

/// Preferred copier template configuration file name.
///
/// `copier.yml` is also accepted, see [`crate::template::read_template_config`].
pub const TEMPLATE_FILE_NAME: &str = "copier.yaml";

/// Copier's default answers file name.
pub const ANSWERS_FILE_NAME: &str = ".copier-answers.yml";

/// Name of the template file that makes copier write a custom answers file.
pub const ANSWERS_TEMPLATE_NAME: &str = "{{ _copier_conf.answers_file }}.jinja";

/// Directory (relative to the base directory) that receives temporal results.
pub const TEMPORAL_OUTPUT_DIR: &str = ".ctt-temporal";

/// Name of the per-snapshot patch file.
pub const PATCH_FILE_NAME: &str = "diff.patch";

/// Name of the machine-readable run summary.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Version-control metadata directories never copied into snapshots.
pub const VCS_METADATA_DIRS: &[&str] = &[".git", ".jj"];

/// Returns the default root for per-trial temporary directories.
///
/// Each trial allocates its own uniquely named directory below this root, so
/// concurrent trials never share a working directory.
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("ctt-temporal")
}
