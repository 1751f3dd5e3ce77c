//! Append side of the activity ledger.

use super::query::{ActivityFilter, ActivityIter};
use super::record::{ActivityRecord, OperationKind, Outcome, RecordId};
use crate::error::{AgentLockError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Bytes read per step when scanning a partition backwards from its end.
const TAIL_CHUNK: u64 = 4096;

/// Per-agent partitioned NDJSON ledger rooted at one directory.
#[derive(Debug, Clone)]
pub struct ActivityLedger {
    dir: PathBuf,
}

impl ActivityLedger {
    /// Ledger rooted at `dir`. The directory is created on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Partition file for `agent_id`.
    pub fn partition_path(&self, agent_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.ndjson", urlencoding::encode(agent_id)))
    }

    /// Record one operation for `agent_id`, optionally tagged with the raw
    /// tool name that triggered it.
    pub fn record(
        &self,
        agent_id: &str,
        path: &str,
        operation: OperationKind,
        outcome: Outcome,
        tool: Option<&str>,
    ) -> Result<RecordId> {
        let record = ActivityRecord::new(agent_id, path, operation, outcome);
        self.append(match tool {
            Some(tool) => record.with_tool(tool),
            None => record,
        })
    }

    /// Append `record` to its agent's partition.
    ///
    /// `seq` is one past the last record in the partition, and `ts` is clamped
    /// so it never precedes that record. Only the tail of the partition is
    /// read. A torn final line left by a crashed writer is terminated first so
    /// the new record lands on its own line. The partition is locked for the
    /// duration and the line is synced to disk before returning.
    ///
    /// # Returns
    ///
    /// * `Ok(RecordId)` - The record is durable
    /// * `Err(AgentLockError::LedgerError)` - Serialization or I/O failed
    pub(super) fn append(&self, mut record: ActivityRecord) -> Result<RecordId> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                AgentLockError::ledger(
                    format!("failed to create activity directory '{}'", self.dir.display()),
                    e,
                )
            })?;
        }

        let partition = self.partition_path(&record.agent_id);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&partition)
            .map_err(|e| {
                AgentLockError::ledger(
                    format!("failed to open activity log '{}'", partition.display()),
                    e,
                )
            })?;

        file.lock_exclusive().map_err(|e| {
            AgentLockError::ledger(
                format!("failed to lock activity log '{}'", partition.display()),
                e,
            )
        })?;

        let tail = read_tail(&mut file).map_err(|e| {
            AgentLockError::ledger(
                format!("failed to read activity log '{}'", partition.display()),
                e,
            )
        })?;

        record.seq = tail.last.as_ref().map_or(0, |last| last.seq + 1);
        if let Some(last) = &tail.last
            && record.ts < last.ts
        {
            debug!(agent_id = %record.agent_id, "clamping activity timestamp to previous record");
            record.ts = last.ts;
        }

        let mut line = String::new();
        if tail.torn {
            warn!(partition = %partition.display(), "terminating torn activity line");
            line.push('\n');
        }
        line.push_str(&record.to_ndjson_line().map_err(|e| {
            AgentLockError::LedgerError(format!("failed to serialize activity record: {}", e))
        })?);
        line.push('\n');

        file.write_all(line.as_bytes()).map_err(|e| {
            AgentLockError::ledger(
                format!("failed to write activity log '{}'", partition.display()),
                e,
            )
        })?;
        file.sync_all().map_err(|e| {
            AgentLockError::ledger(
                format!("failed to sync activity log '{}'", partition.display()),
                e,
            )
        })?;

        Ok(RecordId {
            agent_id: record.agent_id,
            seq: record.seq,
        })
    }

    /// Lazily iterate records matching `filter`.
    ///
    /// Partitions are visited in file-name order; records within a partition
    /// come out in append order. Calling `query` again restarts from the top.
    pub fn query(&self, filter: ActivityFilter) -> Result<ActivityIter> {
        let partitions = match &filter.agent_id {
            Some(agent_id) => vec![self.partition_path(agent_id)],
            None => self.list_partitions()?,
        };
        Ok(ActivityIter::new(partitions, filter))
    }

    fn list_partitions(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AgentLockError::ledger(
                    format!("failed to list activity directory '{}'", self.dir.display()),
                    e,
                ));
            }
        };

        let mut partitions: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                !name.starts_with('.') && name.ends_with(".ndjson")
            })
            .collect();
        partitions.sort();
        Ok(partitions)
    }
}

/// End-of-partition state needed to append.
struct Tail {
    /// Last parsable record.
    last: Option<ActivityRecord>,

    /// The file does not end with a newline.
    torn: bool,
}

/// Walk the partition backwards from its end until a parsable record is found.
fn read_tail(file: &mut File) -> std::io::Result<Tail> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(Tail {
            last: None,
            torn: false,
        });
    }

    let mut torn = false;
    let mut pos = len;
    // Unscanned bytes; everything before the first newline may be a partial line.
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let start = pos.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (pos - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        if pos == len {
            torn = chunk.last() != Some(&b'\n');
        }
        chunk.extend_from_slice(&pending);
        pending = chunk;
        pos = start;

        while let Some(newline) = pending.iter().rposition(|b| *b == b'\n') {
            let line = pending.split_off(newline + 1);
            pending.truncate(newline);
            if let Some(last) = parse_line(&line) {
                return Ok(Tail {
                    last: Some(last),
                    torn,
                });
            }
        }

        if pos == 0 {
            return Ok(Tail {
                last: parse_line(&pending),
                torn,
            });
        }
    }
}

fn parse_line(line: &[u8]) -> Option<ActivityRecord> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "malformed activity line");
            None
        }
    }
}
