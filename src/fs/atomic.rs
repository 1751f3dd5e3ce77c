//! Atomic filesystem writes for agentlock.
//!
//! Content is written to a uniquely named temporary file in the target
//! directory, synced to disk, and renamed over the target. Readers see either
//! the old content or the new, never a partial file.
//!
//! Source and destination must be on the same filesystem. On crash a
//! temporary file may remain (named `.{filename}.{pid}.{n}.tmp`); readers skip
//! dot-prefixed names.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Atomically replace `path` with `content`.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = unique_sibling(path)?;
    write_and_sync(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    sync_parent(path);
    Ok(())
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// `.{filename}.{pid}.{n}.tmp` in the same directory as `target`.
fn unique_sibling(target: &Path) -> io::Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid file path"))?;

    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!(".{}.{}.{}.tmp", filename, std::process::id(), n);
    Ok(parent.join(name))
}

fn write_and_sync(path: &Path, content: &[u8]) -> io::Result<()> {
    let result = File::create(path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });

    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

/// Best-effort sync of the directory entry.
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftover_hidden_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with('.'))
            .collect()
    }

    #[test]
    fn test_atomic_write_new_and_replace() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("lease.lock");

        atomic_write(&file_path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "first");

        atomic_write(&file_path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
        assert!(leftover_hidden_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dirs").join("x.lock");

        atomic_write(&file_path, b"nested").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "nested");
    }

    #[test]
    fn test_unique_sibling_names_differ() {
        let target = Path::new("/some/path/file.lock");
        let a = unique_sibling(target).unwrap();
        let b = unique_sibling(target).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent().unwrap(), Path::new("/some/path"));
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".file.lock."));
        assert!(name.ends_with(".tmp"));
    }
}
