//! Hook payload parsing and agent identity.

use crate::error::{AgentLockError, Result};
use crate::lease::get_host_string;
use crate::ledger::OperationKind;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

/// Environment variable consulted when the payload carries no identity.
pub const AGENT_ID_ENV: &str = "AGENTLOCK_AGENT_ID";

/// JSON payload the host runtime passes on stdin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub tool_name: String,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,

    /// Explicit targets; when absent, targets are read from `tool_input`.
    pub target_paths: Option<Vec<String>>,

    pub tool_input: Option<Value>,

    /// Tool result, present on the post-operation payload only.
    pub result: Option<Value>,
}

impl HookInput {
    /// Parse a payload from `reader`.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| AgentLockError::UserError(format!("failed to read hook payload: {}", e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(AgentLockError::UserError("empty hook payload".to_string()));
        }
        serde_json::from_str(raw)
            .map_err(|e| AgentLockError::UserError(format!("invalid hook payload: {}", e)))
    }

    /// The tracked operation this payload describes, if any.
    pub fn operation(&self) -> Option<OperationKind> {
        OperationKind::from_tool_name(&self.tool_name)
    }

    /// Target paths in payload order, without duplicates.
    pub fn target_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();

        if let Some(explicit) = &self.target_paths {
            for p in explicit {
                push_unique(&mut paths, p);
            }
            return paths;
        }

        let Some(input) = &self.tool_input else {
            return paths;
        };
        for key in ["file_path", "notebook_path", "path"] {
            if let Some(p) = input.get(key).and_then(Value::as_str) {
                push_unique(&mut paths, p);
            }
        }
        if let Some(edits) = input.get("edits").and_then(Value::as_array) {
            for edit in edits {
                if let Some(p) = edit.get("file_path").and_then(Value::as_str) {
                    push_unique(&mut paths, p);
                }
            }
        }
        paths
    }

    /// Identity of the calling agent.
    pub fn agent_id(&self) -> String {
        resolve_agent_id(self.agent_id.as_deref().or(self.session_id.as_deref()))
    }
}

fn push_unique(paths: &mut Vec<String>, path: &str) {
    if !path.is_empty() && !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}

/// `explicit`, else `$AGENTLOCK_AGENT_ID`, else `user@HOST:pid`.
pub fn resolve_agent_id(explicit: Option<&str>) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Ok(id) = std::env::var(AGENT_ID_ENV)
        && !id.trim().is_empty()
    {
        return id.trim().to_string();
    }
    format!("{}:{}", get_host_string(), std::process::id())
}
