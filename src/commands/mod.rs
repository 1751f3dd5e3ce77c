//! Command implementations for agentlock.
//!
//! `run` resolves the workspace and configuration once, installs logging, and
//! routes each CLI command to its handler. Handlers return the process exit
//! code; genuine failures come back as `AgentLockError`.

mod activity;
mod hook;
mod inspect;
mod lease;
mod lock;

use crate::cli::{Cli, Command, ConfigAction, LockAction};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use std::path::Path;
use tracing::Level;

/// Workspace and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    pub ctx: WorkspaceContext,
    pub config: Config,
}

impl Session {
    /// Resolve the root and load the configuration it points at.
    pub fn load(root: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let root = WorkspaceContext::resolve_root(root)?;
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(WorkspaceContext::default_config_path(&root))?,
        };
        let ctx = WorkspaceContext::new(&root, &config);
        Ok(Self { ctx, config })
    }
}

/// Parse-independent entry point used by `main`.
pub fn run(cli: Cli) -> Result<i32> {
    let session = match Session::load(cli.root.as_deref(), cli.config.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            init_logging(cli.debug);
            return match cli.command {
                Command::Pre | Command::Post => hook::setup_failure(&cli.command, e),
                _ => Err(e),
            };
        }
    };

    init_logging(cli.debug || session.config.debug_logging);
    dispatch(cli.command, &session)
}

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, session: &Session) -> Result<i32> {
    match command {
        Command::Pre => hook::cmd_pre(session),
        Command::Post => hook::cmd_post(session),
        Command::Acquire(args) => lease::cmd_acquire(session, args),
        Command::Release(args) => lease::cmd_release(session, args),
        Command::Renew(args) => lease::cmd_renew(session, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(session),
            LockAction::Clear(args) => lock::cmd_lock_clear(session, args),
        },
        Command::Activity(args) => activity::cmd_activity(session, args),
        Command::Check(args) => inspect::cmd_check(session, args),
        Command::Config(config_cmd) => match config_cmd.action {
            ConfigAction::Show => inspect::cmd_config_show(session),
        },
    }
}

/// Install the stderr subscriber. Stdout is reserved for hook decisions.
fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
