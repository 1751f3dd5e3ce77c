//! Filesystem-backed lease store.
//!
//! One JSON record per locked path lives in the lock directory, named
//! `<url-encoded path>.lock`, or `#<sha256 of path>.lock` when the encoded
//! form would be too long for a file name. The store is the only place that
//! touches those files.
//!
//! Every read-check-write sequence (create/reclaim, remove, renew, clear) runs
//! under an exclusive advisory lock on the path's `<key>.guard` file, so the
//! record cannot change between the check and the write. Records are written
//! by rename, so lock-free readers never see a partial record. Guard files are
//! left in place after use; deleting them would let two processes lock
//! different inodes for the same path.
//!
//! Any I/O failure surfaces as `StoreUnavailable`; it is never read as
//! "no lease".

use super::record::Lease;
use super::types::{CreateOutcome, RemoveOutcome, RenewOutcome};
use crate::error::{AgentLockError, Result};
use crate::fs::atomic_write;
use chrono::{Duration, Utc};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Longest url-encoded key used verbatim as a file name; longer keys are
/// hashed. Leaves room for the `.lock`/`.guard` suffix and temp-file decoration
/// under the usual 255-byte name limit.
const MAX_ENCODED_KEY_LEN: usize = 160;

/// Lease records under one directory.
#[derive(Debug, Clone)]
pub struct LeaseStore {
    dir: PathBuf,
    clock_skew: Duration,
}

/// What a record file currently holds.
enum Slot {
    Empty,
    Held(Lease),
    Corrupt,
}

/// Exclusive lock on one path's guard file, released on drop.
struct PathLock {
    _file: File,
}

impl LeaseStore {
    /// Create a store rooted at `dir`. The directory is created lazily.
    pub fn new<P: Into<PathBuf>>(dir: P, clock_skew: Duration) -> Self {
        Self {
            dir: dir.into(),
            clock_skew,
        }
    }

    /// Record file for a repo-relative path.
    pub fn record_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", record_key(path)))
    }

    fn guard_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.guard", record_key(path)))
    }

    /// Create a lease for `path` unless a live one exists.
    ///
    /// An expired or corrupt record is overwritten in place.
    ///
    /// # Returns
    ///
    /// * `Ok(CreateOutcome::Created)` - The caller now holds the lease
    /// * `Ok(CreateOutcome::Conflict)` - A live lease is held (possibly by the caller)
    /// * `Err(AgentLockError::StoreUnavailable)` - I/O failure
    pub fn try_create(&self, path: &str, owner_id: &str, timeout: Duration) -> Result<CreateOutcome> {
        let record = self.record_path(path);
        let _lock = self.lock_path(path)?;

        match self.load(&record)? {
            Slot::Held(held) if !held.is_expired_at(Utc::now(), self.clock_skew) => {
                return Ok(CreateOutcome::Conflict(held));
            }
            Slot::Held(stale) => {
                debug!(
                    path,
                    stale_owner = %stale.owner_id,
                    expired_at = %stale.expires_at,
                    "reclaiming expired lease"
                );
            }
            Slot::Corrupt => {
                warn!(record = %record.display(), "reclaiming corrupt lease record");
            }
            Slot::Empty => {}
        }

        let lease = Lease::new(path, owner_id, timeout);
        write_record(&record, &lease)?;
        debug!(path, owner_id, expires_at = %lease.expires_at, "lease created");
        Ok(CreateOutcome::Created(lease))
    }

    /// Read the lease for `path`, expired or not.
    pub fn read(&self, path: &str) -> Result<Option<Lease>> {
        let record = self.record_path(path);
        match self.load(&record)? {
            Slot::Empty => Ok(None),
            Slot::Held(lease) => Ok(Some(lease)),
            Slot::Corrupt => Err(corrupt(&record)),
        }
    }

    /// Remove the lease for `path` if `owner_id` holds it.
    ///
    /// # Returns
    ///
    /// * `Ok(RemoveOutcome::Removed)` - The caller's record is gone
    /// * `Ok(RemoveOutcome::NotOwner)` - Someone else holds it; left untouched
    /// * `Ok(RemoveOutcome::NotFound)` - Nothing to remove (idempotent release)
    pub fn remove(&self, path: &str, owner_id: &str) -> Result<RemoveOutcome> {
        let record = self.record_path(path);
        if let Slot::Empty = self.load(&record)? {
            return Ok(RemoveOutcome::NotFound);
        }

        let _lock = self.lock_path(path)?;
        match self.load(&record)? {
            Slot::Empty => Ok(RemoveOutcome::NotFound),
            Slot::Corrupt => Err(corrupt(&record)),
            Slot::Held(lease) if lease.owner_id != owner_id => Ok(RemoveOutcome::NotOwner(lease)),
            Slot::Held(lease) => {
                delete_record(&record)?;
                debug!(path, owner_id, "lease removed");
                Ok(RemoveOutcome::Removed(lease))
            }
        }
    }

    /// Push the expiry of `owner_id`'s live lease on `path` to `timeout` from
    /// now. A lapsed lease is never revived, whoever held it.
    pub fn extend(&self, path: &str, owner_id: &str, timeout: Duration) -> Result<RenewOutcome> {
        let record = self.record_path(path);
        if let Slot::Empty = self.load(&record)? {
            return Ok(RenewOutcome::Expired);
        }

        let _lock = self.lock_path(path)?;
        let mut lease = match self.load(&record)? {
            Slot::Empty => return Ok(RenewOutcome::Expired),
            Slot::Corrupt => return Err(corrupt(&record)),
            Slot::Held(lease) => lease,
        };

        let now = Utc::now();
        if lease.is_expired_at(now, self.clock_skew) {
            return Ok(RenewOutcome::Expired);
        }
        if lease.owner_id != owner_id {
            return Ok(RenewOutcome::NotOwner {
                owner_id: lease.owner_id,
            });
        }

        lease.expires_at = now + timeout;
        write_record(&record, &lease)?;
        Ok(RenewOutcome::Renewed(lease))
    }

    /// Remove the lease for `path` regardless of owner.
    ///
    /// Returns the removed lease, or `None` when there was none (or it was
    /// unreadable).
    pub fn clear(&self, path: &str) -> Result<Option<Lease>> {
        let record = self.record_path(path);
        if let Slot::Empty = self.load(&record)? {
            return Ok(None);
        }

        let _lock = self.lock_path(path)?;
        let cleared = match self.load(&record)? {
            Slot::Empty => return Ok(None),
            Slot::Held(lease) => Some(lease),
            Slot::Corrupt => None,
        };
        delete_record(&record)?;
        Ok(cleared)
    }

    /// All readable leases, sorted by path. Corrupt records are skipped.
    pub fn list_all(&self) -> Result<Vec<Lease>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AgentLockError::store(
                    format!("failed to read lock directory '{}'", self.dir.display()),
                    e,
                ));
            }
        };

        let mut leases = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AgentLockError::store("failed to read lock directory entry", e)
            })?;
            let path = entry.path();

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || !name.ends_with(".lock") {
                continue;
            }

            match self.load(&path)? {
                Slot::Held(lease) => leases.push(lease),
                Slot::Corrupt => {
                    warn!(record = %path.display(), "skipping corrupt lease record");
                }
                Slot::Empty => {}
            }
        }

        leases.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(leases)
    }

    /// Block until this process holds the guard lock for `path`.
    fn lock_path(&self, path: &str) -> Result<PathLock> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AgentLockError::store(
                format!("failed to create lock directory '{}'", self.dir.display()),
                e,
            )
        })?;

        let guard = self.guard_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&guard)
            .map_err(|e| {
                AgentLockError::store(format!("failed to open guard '{}'", guard.display()), e)
            })?;
        file.lock_exclusive().map_err(|e| {
            AgentLockError::store(format!("failed to lock guard '{}'", guard.display()), e)
        })?;
        Ok(PathLock { _file: file })
    }

    fn load(&self, record: &Path) -> Result<Slot> {
        match fs::read(record) {
            Ok(raw) => Ok(match Lease::from_json(&raw) {
                Ok(lease) => Slot::Held(lease),
                Err(_) => Slot::Corrupt,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Slot::Empty),
            Err(e) => Err(AgentLockError::store(
                format!("failed to read lease '{}'", record.display()),
                e,
            )),
        }
    }
}

/// File-name key for `path`: url-encoded, or a digest when that is too long.
///
/// Url-encoding escapes `#`, so hashed keys never collide with encoded ones.
fn record_key(path: &str) -> String {
    let encoded = urlencoding::encode(path);
    if encoded.len() <= MAX_ENCODED_KEY_LEN {
        encoded.into_owned()
    } else {
        format!("#{:x}", Sha256::digest(path.as_bytes()))
    }
}

fn write_record(record: &Path, lease: &Lease) -> Result<()> {
    let json = lease.to_json().map_err(|e| {
        AgentLockError::StoreUnavailable(format!("failed to serialize lease: {}", e))
    })?;
    atomic_write(record, json.as_bytes()).map_err(|e| {
        AgentLockError::store(format!("failed to write lease '{}'", record.display()), e)
    })
}

fn delete_record(record: &Path) -> Result<()> {
    match fs::remove_file(record) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AgentLockError::store(
            format!("failed to remove lease '{}'", record.display()),
            e,
        )),
    }
}

fn corrupt(record: &Path) -> AgentLockError {
    AgentLockError::StoreUnavailable(format!("corrupt lease record '{}'", record.display()))
}
