//! Outcome types for lease store and lock manager operations.
//!
//! Denials and ownership mismatches are ordinary outcomes here, not errors;
//! `AgentLockError` is reserved for failures of the durable medium.

use super::record::Lease;
use chrono::{DateTime, Utc};

/// Result of [`LeaseStore::try_create`](super::LeaseStore::try_create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// No live lease existed; this one is now on disk.
    Created(Lease),
    /// A live lease is already held.
    Conflict(Lease),
}

/// Result of [`LeaseStore::remove`](super::LeaseStore::remove).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The caller's lease was removed.
    Removed(Lease),
    /// The record belongs to someone else and was left in place.
    NotOwner(Lease),
    /// No record exists for the path.
    NotFound,
}

/// Why an acquisition did not touch the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The path matched an exclusion pattern.
    Filtered { pattern: String },
}

/// Result of [`LockManager::acquire`](super::LockManager::acquire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller holds the lease (newly created or already owned).
    Granted(Lease),
    /// Another agent holds a live lease.
    Denied {
        owner_id: String,
        expires_at: DateTime<Utc>,
    },
    /// The path is not lockable.
    Skipped(SkipReason),
}

impl AcquireOutcome {
    /// Whether the caller may proceed with the operation.
    pub fn is_permitted(&self) -> bool {
        !matches!(self, AcquireOutcome::Denied { .. })
    }
}

/// Result of [`LockManager::release`](super::LockManager::release).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller's lease was removed.
    Released,
    /// The lease is held by `owner_id`; nothing was removed.
    NotOwner { owner_id: String },
    /// There was nothing to release.
    NoOp,
}

/// Result of [`LockManager::renew`](super::LockManager::renew).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewOutcome {
    /// Expiry pushed forward; carries the updated lease.
    Renewed(Lease),
    /// Someone else holds the path.
    NotOwner { owner_id: String },
    /// The caller's lease lapsed or was already reclaimed.
    Expired,
}

/// A lease plus its liveness at the time it was listed.
#[derive(Debug, Clone)]
pub struct LeaseInfo {
    /// The lease record.
    pub lease: Lease,

    /// Whether the lease is past expiry (reclaimable by the next acquire).
    pub is_stale: bool,
}

impl std::fmt::Display for LeaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, expires: {}{})",
            self.lease.path,
            self.lease.owner_id,
            self.lease.age_string(),
            self.lease.remaining_string(),
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
