//! Error types for agentlock.
//!
//! Uses thiserror for derive macros. Expected lock outcomes (denied, not owner,
//! filtered) are modelled as result enums in `lease`, not as errors; this enum
//! only carries genuine failures.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for agentlock operations.
#[derive(Error, Debug)]
pub enum AgentLockError {
    /// Invalid arguments, hook payload, or configuration.
    #[error("{0}")]
    UserError(String),

    /// The lease directory could not be read or written.
    #[error("Lease store unavailable: {0}")]
    StoreUnavailable(String),

    /// The activity ledger could not be appended to or read.
    #[error("Activity ledger failed: {0}")]
    LedgerError(String),

    /// Repository root discovery failed.
    #[error("Git operation failed: {0}")]
    GitError(String),
}

impl AgentLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgentLockError::UserError(_) => exit_codes::USER_ERROR,
            AgentLockError::StoreUnavailable(_) => exit_codes::STORE_FAILURE,
            AgentLockError::LedgerError(_) => exit_codes::STORE_FAILURE,
            AgentLockError::GitError(_) => exit_codes::GIT_FAILURE,
        }
    }

    /// Wrap an I/O failure on the lease directory.
    pub(crate) fn store(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        AgentLockError::StoreUnavailable(format!("{}: {}", context, err))
    }

    /// Wrap an I/O failure on the activity directory.
    pub(crate) fn ledger(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        AgentLockError::LedgerError(format!("{}: {}", context, err))
    }
}

/// Result type alias for agentlock operations.
pub type Result<T> = std::result::Result<T, AgentLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = AgentLockError::UserError("bad payload".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn store_and_ledger_errors_share_store_exit_code() {
        let err = AgentLockError::StoreUnavailable("disk gone".to_string());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);

        let err = AgentLockError::LedgerError("disk gone".to_string());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
    }

    #[test]
    fn git_error_has_correct_exit_code() {
        let err = AgentLockError::GitError("not a repository".to_string());
        assert_eq!(err.exit_code(), exit_codes::GIT_FAILURE);
    }

    #[test]
    fn io_helpers_keep_context() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AgentLockError::store("failed to read lease 'a.lock'", io);
        assert!(matches!(err, AgentLockError::StoreUnavailable(_)));
        assert_eq!(
            err.to_string(),
            "Lease store unavailable: failed to read lease 'a.lock': denied"
        );
    }
}
