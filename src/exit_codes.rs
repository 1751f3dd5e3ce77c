//! Exit code constants for the agentlock CLI.
//!
//! - 0: Success (hook decision: proceed)
//! - 1: User error (bad args, bad payload, invalid config)
//! - 2: Blocked (hook decision: block or deny; host runtimes treat 2 as "blocked")
//! - 3: Lease store or activity ledger failure
//! - 4: Git operation failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, malformed hook payload, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The hook refused the operation.
pub const BLOCKED: i32 = 2;

/// The lease store or activity ledger could not be accessed.
pub const STORE_FAILURE: i32 = 3;

/// Git operation failure while resolving the repository root.
pub const GIT_FAILURE: i32 = 4;
