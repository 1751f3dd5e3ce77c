//! Implementation of the `agentlock pre` and `agentlock post` hooks.
//!
//! Both read one JSON payload from stdin and print one JSON decision line on
//! stdout. Any human-readable reason is echoed to stderr for the host.

use super::Session;
use crate::cli::Command;
use crate::config::StoreFailurePolicy;
use crate::error::{AgentLockError, Result};
use crate::hooks::{self, HookDecision, HookInput, HookRunner};

pub fn cmd_pre(session: &Session) -> Result<i32> {
    let decision = match prepare(session) {
        Ok((runner, input)) => hooks::run_pre(&runner, &input),
        Err(e) => hooks::resolve_failure(session.config.on_store_failure, "unknown", e, Vec::new()),
    };
    emit(&decision)
}

pub fn cmd_post(session: &Session) -> Result<i32> {
    let decision = match prepare(session) {
        Ok((runner, input)) => hooks::run_post(&runner, &input),
        Err(e) => {
            tracing::warn!(error = %e, "post-operation hook could not start");
            HookDecision::proceed(Vec::new()).with_reason(e.to_string())
        }
    };
    emit(&decision)
}

/// A hook whose workspace or config could not be loaded still answers the
/// host: pre denies (the policy is unknown, so fail closed), post proceeds.
pub fn setup_failure(command: &Command, err: AgentLockError) -> Result<i32> {
    let decision = match command {
        Command::Pre => hooks::resolve_failure(StoreFailurePolicy::FailClosed, "unknown", err, Vec::new()),
        _ => HookDecision::proceed(Vec::new()).with_reason(err.to_string()),
    };
    emit(&decision)
}

fn prepare(session: &Session) -> Result<(HookRunner, HookInput)> {
    let runner = HookRunner::from_config(&session.ctx, &session.config)?;
    let input = HookInput::from_reader(std::io::stdin().lock())?;
    Ok((runner, input))
}

fn emit(decision: &HookDecision) -> Result<i32> {
    let line = decision.to_json_line().map_err(|e| {
        AgentLockError::UserError(format!("failed to serialize hook decision: {}", e))
    })?;
    println!("{}", line);
    if let Some(reason) = &decision.reason {
        eprintln!("{}", reason);
    }
    Ok(decision.exit_code())
}
