//! Host filesystem helpers for snapshotting project trees.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::defaults::VCS_METADATA_DIRS;
use crate::error::{Error, Result};

/// Returns true for version-control metadata entries (`.git`, `.jj`).
pub fn is_vcs_metadata(name: &std::ffi::OsStr) -> bool {
    VCS_METADATA_DIRS.iter().any(|dir| name == *dir)
}

/// Copy the tree at `source` into `destination`, skipping VCS metadata.
///
/// `destination` is created if needed and existing files in it are
/// overwritten. File permissions are preserved; symlinks are recreated as
/// symlinks on unix.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    debug!(
        "Snapshotting {} into {}",
        source.display(),
        destination.display()
    );
    fs::create_dir_all(destination)?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_vcs_metadata(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| Error::Filesystem {
            message: format!("failed to walk {}: {}", source.display(), e),
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Filesystem {
                message: e.to_string(),
            })?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee = fs::read_link(link)?;
    if target.symlink_metadata().is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(pointee, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    // Follow the link and copy what it points to
    if link.is_file() {
        fs::copy(link, target)?;
    } else {
        warn!("Skipping symlink {}", link.display());
    }
    Ok(())
}

/// Remove a directory tree, clearing read-only bits if the first attempt
/// fails with a permission error.
///
/// git marks pack files read-only, which makes a plain `remove_dir_all` fail
/// on Windows.
pub fn remove_dir_all_force(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Clearing read-only bits to remove {}: {}",
                path.display(),
                e
            );
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if let Ok(metadata) = entry.metadata() {
                    let mut permissions = metadata.permissions();
                    if permissions.readonly() {
                        #[allow(clippy::permissions_set_readonly_false)]
                        permissions.set_readonly(false);
                        let _ = fs::set_permissions(entry.path(), permissions);
                    }
                }
            }
            fs::remove_dir_all(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
