//! Implementation of the manual `acquire`, `release` and `renew` commands.

use super::Session;
use crate::cli::{AcquireArgs, LeaseArgs, ReleaseArgs};
use crate::error::{AgentLockError, Result};
use crate::exit_codes;
use crate::hooks::resolve_agent_id;
use crate::lease::{AcquireOutcome, LockManager, ReleaseOutcome, RenewOutcome, SkipReason};
use std::time::Duration;

/// Execute `agentlock acquire`.
///
/// Exits 2 when the lease is still held elsewhere after the wait budget.
pub fn cmd_acquire(session: &Session, args: AcquireArgs) -> Result<i32> {
    let manager = LockManager::from_config(&session.ctx, &session.config)?;
    let path = session.ctx.relative_path(&args.path)?;
    let agent_id = resolve_agent_id(args.agent.as_deref());
    let wait = args
        .wait
        .map(Duration::from_secs)
        .unwrap_or_else(|| session.config.acquire_wait());

    match manager.acquire_with_wait(&path, &agent_id, wait, session.config.acquire_poll())? {
        AcquireOutcome::Granted(lease) => {
            println!("Acquired lease on {}", path);
            println!("  Owner:      {}", lease.owner_id);
            println!("  Expires:    {} (in {})", lease.expires_at.format("%Y-%m-%d %H:%M:%S UTC"), lease.remaining_string());
            Ok(exit_codes::SUCCESS)
        }
        AcquireOutcome::Denied {
            owner_id,
            expires_at,
        } => {
            println!(
                "{} is locked by {} until {}",
                path,
                owner_id,
                expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            Ok(exit_codes::BLOCKED)
        }
        AcquireOutcome::Skipped(SkipReason::Filtered { pattern }) => {
            println!("{} is excluded from locking (pattern '{}')", path, pattern);
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Execute `agentlock release`.
pub fn cmd_release(session: &Session, args: ReleaseArgs) -> Result<i32> {
    let manager = LockManager::from_config(&session.ctx, &session.config)?;
    let agent_id = resolve_agent_id(args.agent.as_deref());

    if args.all {
        let released = manager.release_all(&agent_id)?;
        if released.is_empty() {
            println!("No leases held by {}", agent_id);
        } else {
            println!("Released {} lease(s) held by {}:", released.len(), agent_id);
            for path in &released {
                println!("  {}", path);
            }
        }
        return Ok(exit_codes::SUCCESS);
    }

    let Some(raw_path) = args.path.as_deref() else {
        return Err(AgentLockError::UserError(
            "release needs a path or --all".to_string(),
        ));
    };
    let path = session.ctx.relative_path(raw_path)?;

    match manager.release(&path, &agent_id)? {
        ReleaseOutcome::Released => println!("Released lease on {}", path),
        ReleaseOutcome::NoOp => println!("No lease on {}", path),
        ReleaseOutcome::NotOwner { owner_id } => {
            return Err(AgentLockError::UserError(format!(
                "lease on {} is held by {}, not {}.\n\n\
                 To remove it anyway, run:\n  agentlock lock clear {} --force",
                path, owner_id, agent_id, path
            )));
        }
    }
    Ok(exit_codes::SUCCESS)
}

/// Execute `agentlock renew`.
///
/// Exits 2 when the lease already lapsed; the caller must acquire again.
pub fn cmd_renew(session: &Session, args: LeaseArgs) -> Result<i32> {
    let manager = LockManager::from_config(&session.ctx, &session.config)?;
    let path = session.ctx.relative_path(&args.path)?;
    let agent_id = resolve_agent_id(args.agent.as_deref());

    match manager.renew(&path, &agent_id)? {
        RenewOutcome::Renewed(lease) => {
            println!(
                "Renewed lease on {} until {}",
                path,
                lease.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            Ok(exit_codes::SUCCESS)
        }
        RenewOutcome::Expired => {
            println!("Lease on {} has expired; acquire it again", path);
            Ok(exit_codes::BLOCKED)
        }
        RenewOutcome::NotOwner { owner_id } => Err(AgentLockError::UserError(format!(
            "lease on {} is held by {}, not {}",
            path, owner_id, agent_id
        ))),
    }
}
