//! Implementation of the `agentlock activity` command.

use super::Session;
use crate::cli::ActivityArgs;
use crate::error::{AgentLockError, Result};
use crate::exit_codes;
use crate::ledger::{ActivityFilter, ActivityLedger};
use chrono::{DateTime, Utc};

/// Execute `agentlock activity`.
///
/// Streams matching records, either as one line of text each or, with
/// `--json`, as the raw NDJSON records.
pub fn cmd_activity(session: &Session, args: ActivityArgs) -> Result<i32> {
    let filter = build_filter(session, &args)?;
    let ledger = ActivityLedger::new(&session.ctx.activity_dir);

    let mut count = 0usize;
    for record in ledger.query(filter)? {
        let record = record?;
        if args.json {
            let line = record.to_ndjson_line().map_err(|e| {
                AgentLockError::LedgerError(format!("failed to serialize activity record: {}", e))
            })?;
            println!("{}", line);
        } else {
            println!("{}", record);
        }
        count += 1;
    }

    if count == 0 && !args.json {
        println!("No activity recorded.");
    }
    Ok(exit_codes::SUCCESS)
}

fn build_filter(session: &Session, args: &ActivityArgs) -> Result<ActivityFilter> {
    let mut filter = ActivityFilter::default();
    if let Some(agent) = &args.agent {
        filter = filter.agent(agent.clone());
    }
    if let Some(path) = &args.path {
        filter = filter.path(session.ctx.relative_path(path)?);
    }
    if let Some(since) = &args.since {
        filter = filter.since(parse_since(since)?);
    }
    Ok(filter)
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            AgentLockError::UserError(format!(
                "invalid --since timestamp '{}': {} (expected RFC3339, e.g. 2026-01-01T00:00:00Z)",
                raw, e
            ))
        })
}
