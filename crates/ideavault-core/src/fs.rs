//! Filesystem helpers for atomic writes of key, list, and handle files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Write `contents` to `path` atomically: write a fresh sibling temp file,
/// sync it, then rename it over the destination.
///
/// Parent directories are created as needed. When `owner_only` is set the
/// temp file is created with mode `0600` on Unix, so the contents are never
/// readable by others.
pub fn write_atomic(path: &Path, contents: &[u8], owner_only: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = temp_sibling(path);
    if let Err(err) = write_temp(&temp_path, contents, owner_only) {
        if err.kind() != io::ErrorKind::AlreadyExists {
            let _ = fs::remove_file(&temp_path);
        }
        return Err(err);
    }
    rename_with_fallback(&temp_path, path)
}

/// Create `temp_path` (never reusing or following an existing entry) and
/// write `contents` to it.
fn write_temp(temp_path: &Path, contents: &[u8], owner_only: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if owner_only {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = owner_only;

    let mut file = options.open(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Rename a file, removing the destination first on platforms where rename
/// fails if the target exists.
///
/// If the rename ultimately fails, the temp file is cleaned up.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "Atomic rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}.{}.{}.tmp", std::process::id(), nanos, seq));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a").join("b").join("handles.json");

        write_atomic(&dest, b"{}", false).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "{}");
        let leftovers = fs::read_dir(dest.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("list.list");

        File::create(&dest).unwrap().write_all(b"old").unwrap();
        write_atomic(&dest, b"new", false).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_owner_only_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("key.json");

        write_atomic(&dest, b"secret", true).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_file_never_follows_symlink() {
        let dir = tempdir().unwrap();
        let victim = dir.path().join("victim.txt");
        fs::write(&victim, b"untouched").unwrap();
        let temp = dir.path().join("key.json.1234.tmp");
        std::os::unix::fs::symlink(&victim, &temp).unwrap();

        let err = write_temp(&temp, b"SECRET-KEY-BYTES", true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&victim).unwrap(), b"untouched");
        assert!(fs::symlink_metadata(&temp).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_temp_names_are_unique() {
        let dest = Path::new("/keys/key.json");
        assert_ne!(temp_sibling(dest), temp_sibling(dest));
    }

    #[test]
    fn test_rename_overwrites_existing() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("temp.txt");
        let dest = dir.path().join("dest.txt");

        File::create(&dest).unwrap().write_all(b"old").unwrap();
        File::create(&temp).unwrap().write_all(b"new").unwrap();

        rename_with_fallback(&temp, &dest).unwrap();

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }
}
