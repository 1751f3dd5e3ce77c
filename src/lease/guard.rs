//! RAII guard for leases granted partway through a multi-path acquisition.

use super::manager::LockManager;
use tracing::warn;

/// Releases its lease when dropped unless [`keep`](LeaseGuard::keep) is called.
///
/// The pre-operation hook acquires every target path of an operation; if a
/// later path is denied, guards for the earlier ones drop and undo the
/// partial acquisition. Release failures on drop are logged, never panicked on.
#[derive(Debug)]
pub struct LeaseGuard<'a> {
    manager: &'a LockManager,
    path: String,
    agent_id: String,

    /// Whether the lease should outlive the guard.
    kept: bool,
}

impl<'a> LeaseGuard<'a> {
    /// Guard a lease `agent_id` holds on `path`.
    pub fn new(manager: &'a LockManager, path: &str, agent_id: &str) -> Self {
        Self {
            manager,
            path: path.to_string(),
            agent_id: agent_id.to_string(),
            kept: false,
        }
    }

    /// Disarm the guard; the lease stays on disk for the post-operation hook.
    pub fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        if let Err(e) = self.manager.release(&self.path, &self.agent_id) {
            warn!(path = %self.path, error = %e, "failed to roll back lease");
        }
    }
}
