//! Lease subsystem for agentlock.
//!
//! This module implements per-file mutual exclusion between agent processes
//! that share nothing but a filesystem:
//! - [`LeaseStore`]: one durable record per locked path; every
//!   check-then-write runs under a per-path advisory file lock
//! - [`LockManager`]: acquire / release / renew with lazy expiry, plus the
//!   path filter in front of the store
//! - [`LeaseGuard`]: rollback of partially acquired multi-path operations
//!
//! # Lease Files
//!
//! Records are stored in `<root>/.agent-locks/` by default, one
//! `<url-encoded path>.lock` JSON file per path (`#<sha256>.lock` for very
//! long paths), next to a `<key>.guard` file used only for locking:
//! - `path`: repo-relative path
//! - `owner_id`: holding agent
//! - `acquired_at` / `expires_at`: RFC3339 timestamps
//! - `pid`, `host`: diagnostics only
//!
//! # Expiry
//!
//! A lease whose `expires_at` has passed is stale. Nothing deletes it on a
//! timer; the next `acquire` on that path reclaims it.

mod guard;
mod manager;
mod record;
mod store;
mod types;


// Re-export public API
pub use guard::LeaseGuard;
pub use manager::LockManager;
pub use record::Lease;
pub(crate) use record::get_host_string;
pub use store::LeaseStore;
pub use types::{
    AcquireOutcome, CreateOutcome, LeaseInfo, ReleaseOutcome, RemoveOutcome, RenewOutcome,
    SkipReason,
};
