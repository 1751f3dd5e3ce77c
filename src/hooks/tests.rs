//! Tests for the pre- and post-operation hooks.

use super::*;
use crate::config::{Config, StoreFailurePolicy};
use crate::context::WorkspaceContext;
use crate::ledger::{ActivityFilter, ActivityRecord, OperationKind, Outcome};
use serde_json::json;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_runner() -> (TempDir, HookRunner) {
    create_runner_with(Config::default())
}

fn create_runner_with(config: Config) -> (TempDir, HookRunner) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = WorkspaceContext::new(temp_dir.path(), &config);
    let runner = HookRunner::from_config(&ctx, &config).unwrap();
    (temp_dir, runner)
}

fn payload(tool: &str, agent: &str, file_path: &str) -> HookInput {
    HookInput::from_json(
        &json!({
            "tool_name": tool,
            "agent_id": agent,
            "tool_input": { "file_path": file_path }
        })
        .to_string(),
    )
    .unwrap()
}

fn activity(runner: &HookRunner, agent: &str) -> Vec<ActivityRecord> {
    runner
        .ledger
        .query(ActivityFilter::default().agent(agent))
        .unwrap()
        .collect::<crate::error::Result<Vec<_>>>()
        .unwrap()
}

// ============================================================================
// Payload parsing
// ============================================================================

#[test]
fn test_target_paths_from_tool_input() {
    let input = HookInput::from_json(
        &json!({
            "tool_name": "MultiEdit",
            "tool_input": {
                "file_path": "src/a.rs",
                "edits": [
                    { "file_path": "src/b.rs", "old_string": "x", "new_string": "y" },
                    { "file_path": "src/a.rs" }
                ]
            }
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(input.target_paths(), vec!["src/a.rs", "src/b.rs"]);
    assert_eq!(input.operation(), Some(OperationKind::MultiEdit));
}

#[test]
fn test_explicit_target_paths_win() {
    let input = HookInput::from_json(
        &json!({
            "tool_name": "Write",
            "target_paths": ["one.rs", "two.rs"],
            "tool_input": { "file_path": "ignored.rs" }
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(input.target_paths(), vec!["one.rs", "two.rs"]);
}

#[test]
fn test_notebook_path_is_a_target() {
    let input = HookInput::from_json(
        &json!({
            "tool_name": "NotebookEdit",
            "tool_input": { "notebook_path": "analysis.ipynb" }
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(input.target_paths(), vec!["analysis.ipynb"]);
    assert_eq!(input.operation(), Some(OperationKind::Edit));
}

#[test]
fn test_invalid_payloads_are_user_errors() {
    assert!(matches!(
        HookInput::from_json(""),
        Err(crate::error::AgentLockError::UserError(_))
    ));
    assert!(matches!(
        HookInput::from_json("{not json"),
        Err(crate::error::AgentLockError::UserError(_))
    ));
}

#[test]
fn test_unknown_payload_fields_are_ignored() {
    let input = HookInput::from_json(r#"{"tool_name":"Read","hook_event_name":"PreToolUse"}"#).unwrap();
    assert_eq!(input.operation(), Some(OperationKind::Read));
    assert!(input.target_paths().is_empty());
}

#[test]
#[serial]
fn test_agent_id_precedence() {
    unsafe { std::env::set_var(super::input::AGENT_ID_ENV, "from-env") };

    let both = HookInput::from_json(r#"{"agent_id":"explicit","session_id":"session"}"#).unwrap();
    assert_eq!(both.agent_id(), "explicit");

    let session = HookInput::from_json(r#"{"session_id":"session"}"#).unwrap();
    assert_eq!(session.agent_id(), "session");

    let none = HookInput::from_json(r#"{"tool_name":"Write"}"#).unwrap();
    assert_eq!(none.agent_id(), "from-env");

    unsafe { std::env::remove_var(super::input::AGENT_ID_ENV) };

    let fallback = none.agent_id();
    assert!(fallback.contains('@'));
    assert!(fallback.ends_with(&format!(":{}", std::process::id())));
}

// ============================================================================
// Decisions
// ============================================================================

#[test]
fn test_decision_json_and_exit_codes() {
    let proceed = HookDecision::proceed(vec!["a.rs".to_string()]);
    assert_eq!(proceed.exit_code(), crate::exit_codes::SUCCESS);
    assert_eq!(
        proceed.to_json_line().unwrap(),
        r#"{"decision":"proceed","paths":["a.rs"]}"#
    );

    let block = HookDecision::block("held", vec![]);
    assert_eq!(block.exit_code(), crate::exit_codes::BLOCKED);
    assert!(block.to_json_line().unwrap().contains(r#""decision":"block""#));

    let deny = HookDecision::deny("store down", vec![]);
    assert_eq!(deny.exit_code(), crate::exit_codes::BLOCKED);
}

#[test]
fn test_deadline_miss_is_store_unavailable() {
    let result = run_with_deadline("test", Duration::from_millis(20), || {
        std::thread::sleep(Duration::from_millis(500));
        Ok(())
    });
    assert!(matches!(
        result,
        Err(crate::error::AgentLockError::StoreUnavailable(_))
    ));
}

#[test]
fn test_deadline_passes_through_result() {
    let result = run_with_deadline("test", Duration::from_secs(5), || Ok(42));
    assert_eq!(result.unwrap(), 42);
}

// ============================================================================
// Pre/post scenarios
// ============================================================================

#[test]
fn test_two_agents_on_one_file() {
    let (_temp_dir, runner) = create_test_runner();

    let a = run_pre(&runner, &payload("Edit", "agent-A", "src/main.go"));
    assert_eq!(a.decision, Decision::Proceed);
    assert_eq!(a.paths, vec!["src/main.go"]);

    let b = run_pre(&runner, &payload("Edit", "agent-B", "src/main.go"));
    assert_eq!(b.decision, Decision::Block);
    assert_eq!(b.exit_code(), crate::exit_codes::BLOCKED);
    assert!(b.reason.as_deref().unwrap().contains("agent-A"));

    let done = run_post(&runner, &payload("Edit", "agent-A", "src/main.go"));
    assert_eq!(done.decision, Decision::Proceed);
    assert!(runner.manager.read("src/main.go").unwrap().is_none());

    let retry = run_pre(&runner, &payload("Edit", "agent-B", "src/main.go"));
    assert_eq!(retry.decision, Decision::Proceed);
    assert_eq!(
        runner.manager.read("src/main.go").unwrap().unwrap().owner_id,
        "agent-B"
    );

    let a_outcomes: Vec<Outcome> = activity(&runner, "agent-A").iter().map(|r| r.outcome).collect();
    assert_eq!(a_outcomes, vec![Outcome::Locked, Outcome::Released]);

    let b_outcomes: Vec<Outcome> = activity(&runner, "agent-B").iter().map(|r| r.outcome).collect();
    assert_eq!(b_outcomes, vec![Outcome::Denied, Outcome::Locked]);
}

#[test]
fn test_absolute_paths_are_keyed_relative_to_root() {
    let (temp_dir, runner) = create_test_runner();
    let absolute = temp_dir.path().join("src").join("lib.rs");

    let decision = run_pre(
        &runner,
        &payload("Write", "agent-A", absolute.to_str().unwrap()),
    );
    assert_eq!(decision.paths, vec!["src/lib.rs"]);
    assert!(runner.manager.read("src/lib.rs").unwrap().is_some());
}

#[test]
fn test_excluded_path_gets_no_lease_but_is_logged() {
    let (_temp_dir, runner) = create_test_runner();

    let pre = run_pre(&runner, &payload("Write", "agent-A", ".git/config"));
    assert_eq!(pre.decision, Decision::Proceed);
    assert!(runner.manager.store().list_all().unwrap().is_empty());
    assert!(activity(&runner, "agent-A").is_empty());

    let post = run_post(&runner, &payload("Write", "agent-A", ".git/config"));
    assert_eq!(post.decision, Decision::Proceed);

    let records = activity(&runner, "agent-A");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, ".git/config");
    assert_eq!(records[0].outcome, Outcome::Unlocked);
    assert!(runner.manager.store().list_all().unwrap().is_empty());
}

#[test]
fn test_read_tools_take_no_lease() {
    let (_temp_dir, runner) = create_test_runner();

    let pre = run_pre(&runner, &payload("Read", "agent-A", "src/a.rs"));
    assert_eq!(pre.decision, Decision::Proceed);
    assert!(runner.manager.read("src/a.rs").unwrap().is_none());

    run_post(&runner, &payload("Read", "agent-A", "src/a.rs"));
    let records = activity(&runner, "agent-A");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].operation, OperationKind::Read);
    assert_eq!(records[0].outcome, Outcome::Unlocked);
}

#[test]
fn test_multi_path_acquisition_is_all_or_nothing() {
    let (_temp_dir, runner) = create_test_runner();
    assert!(runner.manager.acquire("b.rs", "agent-B").unwrap().is_permitted());

    let input = HookInput::from_json(
        &json!({
            "tool_name": "MultiEdit",
            "agent_id": "agent-A",
            "target_paths": ["a.rs", "b.rs"]
        })
        .to_string(),
    )
    .unwrap();

    let decision = run_pre(&runner, &input);
    assert_eq!(decision.decision, Decision::Block);
    assert!(decision.reason.as_deref().unwrap().contains("b.rs"));
    assert!(runner.manager.read("a.rs").unwrap().is_none());
    assert_eq!(runner.manager.read("b.rs").unwrap().unwrap().owner_id, "agent-B");
}

#[test]
fn test_paths_are_acquired_in_sorted_order() {
    let (_temp_dir, runner) = create_test_runner();
    assert!(runner.manager.acquire("a.rs", "agent-B").unwrap().is_permitted());

    let input = HookInput::from_json(
        &json!({
            "tool_name": "MultiEdit",
            "agent_id": "agent-A",
            "target_paths": ["b.rs", "a.rs"]
        })
        .to_string(),
    )
    .unwrap();

    let decision = run_pre(&runner, &input);
    assert_eq!(decision.decision, Decision::Block);
    assert_eq!(decision.paths, vec!["a.rs", "b.rs"]);
    // Denied on the first path in order; the second was never touched.
    let records = activity(&runner, "agent-A");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, "a.rs");
    assert_eq!(records[0].outcome, Outcome::Denied);
    assert!(runner.manager.read("b.rs").unwrap().is_none());
}

#[test]
fn test_crosswise_path_sets_do_not_block_each_other() {
    let (_temp_dir, mut runner) = create_test_runner();
    runner.acquire_wait = Duration::from_millis(300);
    runner.acquire_poll = Duration::from_millis(10);

    let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));
    let handles: Vec<_> = [("agent-A", ["a.rs", "b.rs"]), ("agent-B", ["b.rs", "a.rs"])]
        .into_iter()
        .map(|(agent, paths)| {
            let runner = runner.clone();
            let barrier = std::sync::Arc::clone(&barrier);
            std::thread::spawn(move || {
                let input = HookInput::from_json(
                    &json!({
                        "tool_name": "MultiEdit",
                        "agent_id": agent,
                        "target_paths": paths
                    })
                    .to_string(),
                )
                .unwrap();
                barrier.wait();
                run_pre(&runner, &input).decision
            })
        })
        .collect();

    let decisions: Vec<Decision> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        decisions.iter().filter(|d| **d == Decision::Proceed).count(),
        1,
        "{:?}",
        decisions
    );
}

#[test]
fn test_rollback_keeps_leases_held_before_the_hook() {
    let (_temp_dir, runner) = create_test_runner();
    assert!(runner.manager.acquire("a.rs", "agent-A").unwrap().is_permitted());
    assert!(runner.manager.acquire("b.rs", "agent-B").unwrap().is_permitted());

    let input = HookInput::from_json(
        &json!({
            "tool_name": "Write",
            "agent_id": "agent-A",
            "target_paths": ["a.rs", "b.rs"]
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(run_pre(&runner, &input).decision, Decision::Block);
    assert_eq!(runner.manager.read("a.rs").unwrap().unwrap().owner_id, "agent-A");
}

#[test]
fn test_post_does_not_release_another_agents_lease() {
    let (_temp_dir, runner) = create_test_runner();
    assert!(runner.manager.acquire("a.rs", "agent-A").unwrap().is_permitted());

    let decision = run_post(&runner, &payload("Edit", "agent-B", "a.rs"));
    assert_eq!(decision.decision, Decision::Proceed);
    assert_eq!(runner.manager.read("a.rs").unwrap().unwrap().owner_id, "agent-A");

    let records = activity(&runner, "agent-B");
    assert_eq!(records[0].outcome, Outcome::Unlocked);
}

#[test]
fn test_released_record_is_corrected_when_lease_vanished() {
    use super::post::settled_outcome;
    use crate::lease::ReleaseOutcome;

    assert_eq!(
        settled_outcome(Outcome::Released, &ReleaseOutcome::NoOp),
        Some(Outcome::Unlocked)
    );
    assert_eq!(
        settled_outcome(
            Outcome::Released,
            &ReleaseOutcome::NotOwner {
                owner_id: "agent-B".to_string()
            }
        ),
        Some(Outcome::Unlocked)
    );
    assert_eq!(settled_outcome(Outcome::Released, &ReleaseOutcome::Released), None);
    assert_eq!(settled_outcome(Outcome::Unlocked, &ReleaseOutcome::NoOp), None);
}

#[test]
fn test_post_records_released_once_for_own_lease() {
    let (_temp_dir, runner) = create_test_runner();
    assert_eq!(
        run_pre(&runner, &payload("Write", "agent-A", "a.rs")).decision,
        Decision::Proceed
    );
    run_post(&runner, &payload("Write", "agent-A", "a.rs"));

    let records = activity(&runner, "agent-A");
    let outcomes: Vec<Outcome> = records.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Locked, Outcome::Released]);
    assert_eq!(records[1].tool.as_deref(), Some("Write"));
}

#[test]
fn test_ledger_failure_does_not_block_release() {
    let config = Config {
        activity_directory: "activity".to_string(),
        ..Config::default()
    };
    let (temp_dir, runner) = create_runner_with(config);
    fs::write(temp_dir.path().join("activity"), "not a directory").unwrap();

    assert_eq!(
        run_pre(&runner, &payload("Write", "agent-A", "a.rs")).decision,
        Decision::Proceed
    );
    assert!(runner.manager.read("a.rs").unwrap().is_some());

    let post = run_post(&runner, &payload("Write", "agent-A", "a.rs"));
    assert_eq!(post.decision, Decision::Proceed);
    assert!(runner.manager.read("a.rs").unwrap().is_none());
}

#[test]
fn test_store_failure_fail_closed_denies() {
    let config = Config {
        lock_directory: "locks".to_string(),
        ..Config::default()
    };
    let (temp_dir, runner) = create_runner_with(config);
    fs::write(temp_dir.path().join("locks"), "not a directory").unwrap();

    let decision = run_pre(&runner, &payload("Write", "agent-A", "a.rs"));
    assert_eq!(decision.decision, Decision::Deny);
    assert_eq!(decision.exit_code(), crate::exit_codes::BLOCKED);
    assert!(decision.reason.unwrap().contains("unavailable"));
}

#[test]
fn test_store_failure_fail_open_proceeds() {
    let config = Config {
        lock_directory: "locks".to_string(),
        on_store_failure: StoreFailurePolicy::FailOpen,
        ..Config::default()
    };
    let (temp_dir, runner) = create_runner_with(config);
    fs::write(temp_dir.path().join("locks"), "not a directory").unwrap();

    let decision = run_pre(&runner, &payload("Write", "agent-A", "a.rs"));
    assert_eq!(decision.decision, Decision::Proceed);
    assert!(decision.reason.is_some());
}

#[test]
fn test_post_always_proceeds_on_store_failure() {
    let config = Config {
        lock_directory: "locks".to_string(),
        ..Config::default()
    };
    let (temp_dir, runner) = create_runner_with(config);
    fs::write(temp_dir.path().join("locks"), "not a directory").unwrap();

    let decision = run_post(&runner, &payload("Write", "agent-A", "a.rs"));
    assert_eq!(decision.decision, Decision::Proceed);
    assert_eq!(decision.exit_code(), crate::exit_codes::SUCCESS);
}

#[test]
fn test_paths_outside_root_are_ignored() {
    let (_temp_dir, runner) = create_test_runner();

    let decision = run_pre(&runner, &payload("Write", "agent-A", "/definitely/elsewhere/x.rs"));
    assert_eq!(decision.decision, Decision::Proceed);
    assert!(decision.paths.is_empty());
    assert!(runner.manager.store().list_all().unwrap().is_empty());
}
