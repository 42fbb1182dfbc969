//! Lock-aware, crash-safe replacement of a backing file.
//!
//! Before anything is serialized the target is checked: a read-only file or one
//! held exclusively by another process fails with `PermissionDenied` and the
//! target is left untouched. Content is then written to a sibling temp file,
//! synced, and renamed over the target.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Check that `path` can be replaced right now. Returns the current
/// permissions, or `None` when the file does not exist yet.
pub fn check_writable(path: &Path) -> StoreResult<Option<fs::Permissions>> {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::from_io(path, e)),
    };
    if meta.permissions().readonly() {
        tracing::warn!(path = %path.display(), "file is read-only");
        return Err(StoreError::permission_denied(path));
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "cannot open file for writing");
            StoreError::from_io(path, e)
        })?;
    if let Err(e) = file.try_lock_exclusive() {
        tracing::warn!(path = %path.display(), error = %e, "file is locked by another process");
        return Err(StoreError::permission_denied(path));
    }
    // Dropping the handle releases the trial lock.
    let _ = file.unlock();
    Ok(Some(meta.permissions()))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".into());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Replace `path` with the bytes from `produce`, after the writability checks pass.
pub fn persist<F>(path: &Path, produce: F) -> StoreResult<()>
where
    F: FnOnce() -> StoreResult<Vec<u8>>,
{
    let permissions = check_writable(path)?;
    let bytes = produce()?;

    let tmp = temp_path(path);
    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        // The rename replaces the inode; carry the old mode over.
        if let Some(p) = permissions {
            fs::set_permissions(&tmp, p)?;
        }
        fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::from_io(path, e));
    }
    sync_parent(path);
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "persisted");
    Ok(())
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        persist(&path, || Ok(b"Part Name\nDrill\n".to_vec())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Part Name\nDrill\n");
    }

    #[test]
    fn replaces_existing_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        fs::write(&path, "old").unwrap();
        persist(&path, || Ok(b"new".to_vec())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn read_only_file_is_permission_denied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        fs::write(&path, "old").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let mut produced = false;
        let err = persist(&path, || {
            produced = true;
            Ok(b"new".to_vec())
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(!produced);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn exclusively_locked_file_is_permission_denied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        fs::write(&path, "old").unwrap();
        let holder = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let err = persist(&path, || Ok(b"new".to_vec())).unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(err.to_string().contains("Open in another application"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        holder.unlock().unwrap();
        persist(&path, || Ok(b"new".to_vec())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn missing_directory_is_io_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("tools.csv");
        match persist(&path, || Ok(b"x".to_vec())) {
            Err(StoreError::Io { reason, .. }) => assert!(reason.contains("does not exist")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn replacement_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        persist(&path, || Ok(b"new".to_vec())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o664);
    }

    #[test]
    fn producer_errors_propagate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.csv");
        let err = persist(&path, || Err(StoreError::Validation("boom".into()))).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!path.exists());
    }
}
