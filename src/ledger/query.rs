//! Read side of the activity ledger.

use super::record::ActivityRecord;
use crate::error::{AgentLockError, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use tracing::warn;

/// Query predicate. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub agent_id: Option<String>,
    pub path: Option<String>,
    /// Only records at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Whether `record` satisfies every set field.
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        if let Some(agent_id) = &self.agent_id
            && &record.agent_id != agent_id
        {
            return false;
        }
        if let Some(path) = &self.path
            && &record.path != path
        {
            return false;
        }
        if let Some(since) = self.since
            && record.ts < since
        {
            return false;
        }
        true
    }
}

/// Streaming iterator over matching records.
///
/// Files are opened one at a time as the iterator advances. Malformed lines
/// are logged and skipped; a partition that disappears mid-query is skipped.
pub struct ActivityIter {
    partitions: VecDeque<PathBuf>,
    current: Option<(PathBuf, Lines<BufReader<File>>)>,
    filter: ActivityFilter,
}

impl ActivityIter {
    pub(super) fn new(partitions: Vec<PathBuf>, filter: ActivityFilter) -> Self {
        Self {
            partitions: partitions.into(),
            current: None,
            filter,
        }
    }

    /// Open the next partition. `Ok(false)` once every partition is consumed.
    fn advance(&mut self) -> Result<bool> {
        while let Some(path) = self.partitions.pop_front() {
            match File::open(&path) {
                Ok(file) => {
                    self.current = Some((path, BufReader::new(file).lines()));
                    return Ok(true);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AgentLockError::ledger(
                        format!("failed to open activity log '{}'", path.display()),
                        e,
                    ));
                }
            }
        }
        Ok(false)
    }
}

impl Iterator for ActivityIter {
    type Item = Result<ActivityRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                match self.advance() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }

            let (path, lines) = self.current.as_mut()?;
            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    let err = AgentLockError::ledger(
                        format!("failed to read activity log '{}'", path.display()),
                        e,
                    );
                    self.current = None;
                    return Some(Err(err));
                }
                None => {
                    self.current = None;
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ActivityRecord>(&line) {
                Ok(record) if self.filter.matches(&record) => return Some(Ok(record)),
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "skipping malformed activity line"),
            }
        }
    }
}

impl std::fmt::Debug for ActivityIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityIter")
            .field("remaining_partitions", &self.partitions.len())
            .field("filter", &self.filter)
            .finish()
    }
}
