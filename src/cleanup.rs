use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively delete `dir`, clearing read-only flags first since extracted
/// archive entries may carry them.
///
/// Returns `Ok(false)` when there was nothing to delete.
pub fn remove_working_dir(dir: &Path) -> io::Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if metadata.file_type().is_symlink() {
            continue;
        }
        let perms = metadata.permissions();
        if perms.readonly() {
            tracing::trace!("Clearing read-only flag on {}", path.display());
            fs::set_permissions(path, owner_writable(perms))?;
        }
    }

    fs::remove_dir_all(dir)?;
    tracing::debug!("Removed working directory {}", dir.display());
    Ok(true)
}

#[cfg(unix)]
fn owner_writable(perms: fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::Permissions::from_mode(perms.mode() | 0o200)
}

#[cfg(not(unix))]
fn owner_writable(mut perms: fs::Permissions) -> fs::Permissions {
    // only the owner-write bit exists here
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    perms
}
