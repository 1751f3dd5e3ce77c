//! Lock manager: acquire / release / renew on top of the lease store.
//!
//! Per path the state machine is `Unlocked -> Locked(owner) -> Unlocked`, with
//! an implicit `Locked -> Unlocked` edge when a lease is found past expiry.
//! Expiry is checked lazily on access; there is no background sweeper.

use super::record::Lease;
use super::store::LeaseStore;
use super::types::{
    AcquireOutcome, CreateOutcome, LeaseInfo, ReleaseOutcome, RemoveOutcome, RenewOutcome,
    SkipReason,
};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::filter::PathFilter;
use chrono::{Duration, Utc};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Mutual-exclusion front end used by the hooks and the CLI.
#[derive(Debug, Clone)]
pub struct LockManager {
    store: LeaseStore,
    filter: PathFilter,
    timeout: Duration,
    clock_skew: Duration,
}

impl LockManager {
    /// Assemble a manager from its parts.
    pub fn new(store: LeaseStore, filter: PathFilter, timeout: Duration, clock_skew: Duration) -> Self {
        Self {
            store,
            filter,
            timeout,
            clock_skew,
        }
    }

    /// Build the manager for a workspace from static configuration.
    ///
    /// The lease and activity directories are always excluded from locking.
    pub fn from_config(ctx: &WorkspaceContext, config: &Config) -> Result<Self> {
        let filter = PathFilter::new(
            &config.exclude_patterns,
            &[
                config.lock_directory.clone(),
                config.activity_directory.clone(),
            ],
        )?;
        let store = LeaseStore::new(&ctx.lock_dir, config.clock_skew());
        Ok(Self::new(
            store,
            filter,
            config.lock_timeout(),
            config.clock_skew(),
        ))
    }

    /// The path filter this manager applies.
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// The underlying store.
    pub fn store(&self) -> &LeaseStore {
        &self.store
    }

    /// Try to take the lease on `path` for `agent_id`.
    ///
    /// Re-acquiring a live lease the caller already holds is granted and
    /// returns the existing lease unchanged.
    pub fn acquire(&self, path: &str, agent_id: &str) -> Result<AcquireOutcome> {
        if let Some(pattern) = self.filter.matched_pattern(path) {
            debug!(path, pattern, "path excluded from locking");
            return Ok(AcquireOutcome::Skipped(SkipReason::Filtered {
                pattern: pattern.to_string(),
            }));
        }

        match self.store.try_create(path, agent_id, self.timeout)? {
            CreateOutcome::Created(lease) => {
                info!(path, agent_id, expires_at = %lease.expires_at, "lease granted");
                Ok(AcquireOutcome::Granted(lease))
            }
            CreateOutcome::Conflict(held) if held.owner_id == agent_id => {
                debug!(path, agent_id, "lease already held by caller");
                Ok(AcquireOutcome::Granted(held))
            }
            CreateOutcome::Conflict(held) => {
                info!(
                    path,
                    agent_id,
                    owner = %held.owner_id,
                    expires_at = %held.expires_at,
                    "lease denied"
                );
                Ok(AcquireOutcome::Denied {
                    owner_id: held.owner_id,
                    expires_at: held.expires_at,
                })
            }
        }
    }

    /// Keep retrying [`acquire`](Self::acquire) until granted or `wait` elapses.
    ///
    /// Waiters poll independently; whoever finds the path free first wins.
    pub fn acquire_with_wait(
        &self,
        path: &str,
        agent_id: &str,
        wait: std::time::Duration,
        poll: std::time::Duration,
    ) -> Result<AcquireOutcome> {
        let deadline = Instant::now() + wait;
        loop {
            let outcome = self.acquire(path, agent_id)?;
            if outcome.is_permitted() {
                return Ok(outcome);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(outcome);
            }
            std::thread::sleep(poll.min(deadline - now));
        }
    }

    /// Release `agent_id`'s lease on `path`.
    ///
    /// Releasing someone else's lease is reported, logged and otherwise
    /// ignored; releasing nothing is a no-op.
    pub fn release(&self, path: &str, agent_id: &str) -> Result<ReleaseOutcome> {
        match self.store.remove(path, agent_id)? {
            RemoveOutcome::Removed(_) => {
                info!(path, agent_id, "lease released");
                Ok(ReleaseOutcome::Released)
            }
            RemoveOutcome::NotOwner(held) => {
                warn!(path, agent_id, owner = %held.owner_id, "release by non-owner ignored");
                Ok(ReleaseOutcome::NotOwner {
                    owner_id: held.owner_id,
                })
            }
            RemoveOutcome::NotFound => {
                debug!(path, agent_id, "nothing to release");
                Ok(ReleaseOutcome::NoOp)
            }
        }
    }

    /// Push the expiry of `agent_id`'s live lease on `path` forward by one
    /// timeout window from now.
    pub fn renew(&self, path: &str, agent_id: &str) -> Result<RenewOutcome> {
        let outcome = self.store.extend(path, agent_id, self.timeout)?;
        match &outcome {
            RenewOutcome::Renewed(lease) => {
                info!(path, agent_id, expires_at = %lease.expires_at, "lease renewed");
            }
            RenewOutcome::NotOwner { owner_id } => {
                debug!(path, agent_id, owner = %owner_id, "renewal refused: not owner");
            }
            RenewOutcome::Expired => debug!(path, agent_id, "lease lapsed before renewal"),
        }
        Ok(outcome)
    }

    /// The live lease on `path`, if any. Expired records read as `None`.
    pub fn read(&self, path: &str) -> Result<Option<Lease>> {
        let lease = self.store.read(path)?;
        Ok(lease.filter(|l| !l.is_expired_at(Utc::now(), self.clock_skew)))
    }

    /// Release every lease held by `agent_id`. Returns the released paths.
    pub fn release_all(&self, agent_id: &str) -> Result<Vec<String>> {
        let mut released = Vec::new();
        for lease in self.store.list_all()? {
            if lease.owner_id != agent_id {
                continue;
            }
            if let ReleaseOutcome::Released = self.release(&lease.path, agent_id)? {
                released.push(lease.path);
            }
        }
        Ok(released)
    }

    /// Every lease on disk, with a stale flag.
    pub fn status(&self) -> Result<Vec<LeaseInfo>> {
        let now = Utc::now();
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .map(|lease| {
                let is_stale = lease.is_expired_at(now, self.clock_skew);
                LeaseInfo { lease, is_stale }
            })
            .collect())
    }

    /// Operator override: remove the lease on `path` whoever holds it.
    pub fn clear(&self, path: &str) -> Result<Option<Lease>> {
        let cleared = self.store.clear(path)?;
        if let Some(lease) = &cleared {
            warn!(path, owner = %lease.owner_id, "lease cleared by operator");
        }
        Ok(cleared)
    }
}
