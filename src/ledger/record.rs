//! Activity record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of tool operation that was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    Edit,
    MultiEdit,
    Glob,
    Grep,
}

impl OperationKind {
    /// Map a host tool name to an operation kind (case-insensitive).
    ///
    /// Returns `None` for tools this engine does not track.
    pub fn from_tool_name(tool: &str) -> Option<Self> {
        let normalized: String = tool
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "edit" | "notebookedit" => Some(Self::Edit),
            "multiedit" => Some(Self::MultiEdit),
            "glob" => Some(Self::Glob),
            "grep" => Some(Self::Grep),
            _ => None,
        }
    }

    /// Whether the operation changes file content and therefore needs a lease.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Write | Self::Edit | Self::MultiEdit)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Read => write!(f, "read"),
            OperationKind::Write => write!(f, "write"),
            OperationKind::Edit => write!(f, "edit"),
            OperationKind::MultiEdit => write!(f, "multi_edit"),
            OperationKind::Glob => write!(f, "glob"),
            OperationKind::Grep => write!(f, "grep"),
        }
    }
}

/// What the lock engine did for the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A lease was granted before the operation.
    Locked,
    /// The operation ran without a lease (read-like or excluded path).
    Unlocked,
    /// The lease was held by another agent.
    Denied,
    /// The agent's lease was released after the operation.
    Released,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Locked => write!(f, "locked"),
            Outcome::Unlocked => write!(f, "unlocked"),
            Outcome::Denied => write!(f, "denied"),
            Outcome::Released => write!(f, "released"),
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Position within the agent's partition (assigned on append).
    #[serde(default)]
    pub seq: u64,

    /// When the operation was recorded.
    pub ts: DateTime<Utc>,

    /// Agent that performed the operation.
    pub agent_id: String,

    /// Repo-relative path the operation targeted.
    pub path: String,

    /// What was done.
    pub operation: OperationKind,

    /// What the lock engine decided.
    pub outcome: Outcome,

    /// Host tool name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl ActivityRecord {
    /// Create a record stamped with the current time.
    pub fn new(agent_id: &str, path: &str, operation: OperationKind, outcome: Outcome) -> Self {
        Self {
            seq: 0,
            ts: Utc::now(),
            agent_id: agent_id.to_string(),
            path: path.to_string(),
            operation,
            outcome,
            tool: None,
        }
    }

    /// Attach the host tool name.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Serialize the record to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} #{} {} {} -> {}",
            self.ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.agent_id,
            self.seq,
            self.operation,
            self.path,
            self.outcome
        )
    }
}

/// Identifies a record: the agent partition plus the record's position in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub agent_id: String,
    pub seq: u64,
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.agent_id, self.seq)
    }
}
