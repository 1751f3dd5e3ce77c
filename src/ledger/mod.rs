//! Activity ledger for agentlock.
//!
//! Append-only record of what each agent did to which path, and what the
//! lock engine decided about it. Each agent appends only to its own NDJSON
//! partition (`<activity_dir>/<url-encoded agent>.ndjson`); every partition is
//! readable by all agents.
//!
//! # Record Format
//!
//! One JSON object per line:
//! - `seq`: index of the record within its partition
//! - `ts`: RFC3339 timestamp, non-decreasing within a partition
//! - `agent_id`, `path`
//! - `operation`: read / write / edit / multi_edit / glob / grep
//! - `outcome`: locked / unlocked / denied / released
//! - `tool`: host tool name, when known
//!
//! Records are never rewritten or deleted by agentlock; rotation is left to
//! the operator.

mod query;
mod record;
mod store;


pub use query::{ActivityFilter, ActivityIter};
pub use record::{ActivityRecord, OperationKind, Outcome, RecordId};
pub use store::ActivityLedger;
