//! Implementation of the `agentlock lock` subcommands.

use super::Session;
use crate::cli::LockClearArgs;
use crate::error::{AgentLockError, Result};
use crate::exit_codes;
use crate::lease::LockManager;

/// Execute `agentlock lock list`.
pub fn cmd_lock_list(session: &Session) -> Result<i32> {
    let manager = LockManager::from_config(&session.ctx, &session.config)?;
    let leases = manager.status()?;

    if leases.is_empty() {
        println!("No active leases.");
        return Ok(exit_codes::SUCCESS);
    }

    println!("Leases ({}):", leases.len());
    println!();

    for info in &leases {
        let lease = &info.lease;
        println!("  {}:", lease.path);
        println!("    Owner:      {}", lease.owner_id);
        if let Some(host) = &lease.host {
            println!("    Host:       {}", host);
        }
        if let Some(pid) = lease.pid {
            println!("    PID:        {}", pid);
        }
        println!("    Acquired:   {}", lease.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("    Age:        {}", lease.age_string());
        println!("    Expires:    {}", lease.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if info.is_stale {
            println!("    Status:     STALE (reclaimed by the next acquire)");
        } else {
            println!("    Remaining:  {}", lease.remaining_string());
        }
        println!();
    }

    let stale_count = leases.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "Note: {} lease(s) are stale. Use `agentlock lock clear <path> --force` to clear.",
            stale_count
        );
    }

    Ok(exit_codes::SUCCESS)
}

/// Execute `agentlock lock clear`.
pub fn cmd_lock_clear(session: &Session, args: LockClearArgs) -> Result<i32> {
    if !args.force {
        return Err(AgentLockError::UserError(
            "refusing to clear lease without --force flag.\n\n\
             Clearing a live lease lets another agent edit the file concurrently.\n\
             Only clear leases if you are certain the holder has stopped.\n\n\
             To clear the lease, run:\n  agentlock lock clear {} --force"
                .replace("{}", &args.path),
        ));
    }

    let manager = LockManager::from_config(&session.ctx, &session.config)?;
    let path = session.ctx.relative_path(&args.path)?;

    match manager.clear(&path)? {
        Some(lease) => {
            println!("Cleared lease: {}", path);
            println!();
            println!("Lease details:");
            println!("  Owner:      {}", lease.owner_id);
            if let Some(pid) = lease.pid {
                println!("  PID:        {}", pid);
            }
            println!("  Acquired:   {}", lease.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Age:        {}", lease.age_string());
        }
        None => println!("No lease on {}", path),
    }

    Ok(exit_codes::SUCCESS)
}
