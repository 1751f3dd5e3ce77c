//! Implementation of the `agentlock check` and `agentlock config show` commands.

use super::Session;
use crate::cli::CheckArgs;
use crate::error::Result;
use crate::exit_codes;
use crate::lease::LockManager;

/// Execute `agentlock check`: report whether each path would be locked.
pub fn cmd_check(session: &Session, args: CheckArgs) -> Result<i32> {
    let manager = LockManager::from_config(&session.ctx, &session.config)?;

    for raw in &args.paths {
        match session.ctx.relative_path(raw) {
            Ok(path) => match manager.filter().matched_pattern(&path) {
                Some(pattern) => println!("{}: excluded (pattern '{}')", path, pattern),
                None => println!("{}: lockable", path),
            },
            Err(e) => println!("{}: not lockable ({})", raw, e),
        }
    }
    Ok(exit_codes::SUCCESS)
}

/// Execute `agentlock config show`.
pub fn cmd_config_show(session: &Session) -> Result<i32> {
    print!("{}", session.config.to_yaml()?);
    Ok(exit_codes::SUCCESS)
}
