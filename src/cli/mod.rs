//! CLI argument parsing for agentlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentlock: advisory per-file leases for agents sharing one working tree.
///
/// Host runtimes call `agentlock pre` before a mutating tool call and
/// `agentlock post` after it. Leases live as JSON files in the lock
/// directory; activity is appended to per-agent NDJSON files.
#[derive(Parser, Debug)]
#[command(name = "agentlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Repository root (default: git toplevel, else current directory).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file (default: <root>/.agentlock.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for agentlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pre-operation hook.
    ///
    /// Reads the tool payload from stdin, acquires leases on every target
    /// path and prints a JSON decision. Exits 2 when the operation must wait.
    Pre,

    /// Post-operation hook.
    ///
    /// Reads the tool payload from stdin, records activity and releases the
    /// caller's leases. Always exits 0.
    Post,

    /// Acquire a lease on a path.
    Acquire(AcquireArgs),

    /// Release a lease held by an agent, or all of its leases with --all.
    Release(ReleaseArgs),

    /// Extend a live lease by one timeout window.
    Renew(LeaseArgs),

    /// Lock management commands.
    ///
    /// List or clear leases.
    Lock(LockCommand),

    /// Query the activity ledger.
    Activity(ActivityArgs),

    /// Report whether paths are subject to locking.
    Check(CheckArgs),

    /// Configuration commands.
    Config(ConfigCommand),
}

/// Arguments for the `acquire` command.
#[derive(Parser, Debug)]
pub struct AcquireArgs {
    /// Path to lock (absolute or relative to the root).
    pub path: String,

    /// Agent identity (default: $AGENTLOCK_AGENT_ID, else user@HOST:pid).
    #[arg(long)]
    pub agent: Option<String>,

    /// Seconds to keep retrying while the lease is held elsewhere.
    #[arg(long)]
    pub wait: Option<u64>,
}

/// Arguments for the `release` command.
#[derive(Parser, Debug)]
pub struct ReleaseArgs {
    /// Path whose lease to release.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub path: Option<String>,

    /// Release every lease the agent holds.
    #[arg(long)]
    pub all: bool,

    /// Agent identity (default: $AGENTLOCK_AGENT_ID, else user@HOST:pid).
    #[arg(long)]
    pub agent: Option<String>,
}

/// Arguments for the `renew` command.
#[derive(Parser, Debug)]
pub struct LeaseArgs {
    /// Path whose lease to act on.
    pub path: String,

    /// Agent identity (default: $AGENTLOCK_AGENT_ID, else user@HOST:pid).
    #[arg(long)]
    pub agent: Option<String>,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all leases.
    ///
    /// Shows owner, age and expiry; expired leases are flagged STALE.
    List,

    /// Clear a lease regardless of owner.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Path whose lease should be cleared.
    pub path: String,

    /// Force clearing the lease (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `activity` command.
#[derive(Parser, Debug)]
pub struct ActivityArgs {
    /// Only records from this agent.
    #[arg(long)]
    pub agent: Option<String>,

    /// Only records for this path.
    #[arg(long)]
    pub path: Option<String>,

    /// Only records at or after this RFC3339 timestamp.
    #[arg(long)]
    pub since: Option<String>,

    /// Print raw NDJSON records.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Paths to check.
    #[arg(required = true)]
    pub paths: Vec<String>,
}

/// Config subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML.
    Show,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
