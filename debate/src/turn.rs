//! Orchestration for a single agent turn.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::error::DebateError;
use crate::core::queue::{TaskId, TaskStatus};
use crate::core::role_context::build_role_context;
use crate::core::router::Delivery;
use crate::core::types::Role;
use crate::io::executor::{ExecRequest, Executor};
use crate::io::prompt::PromptBuilder;
use crate::workspace::DebateWorkspace;

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub task: TaskId,
    pub round: u32,
    pub role: Role,
    /// Attempt that produced the result (1-based).
    pub attempt: u32,
    pub delivery: Delivery,
}

/// Subject line of the task for `role` in `round`.
pub fn task_subject(round: u32, role: Role) -> String {
    format!("round {round}: {role}")
}

/// Ensure the queue holds an outstanding task for `role`, returning its id.
///
/// A matching outstanding task (left behind by a crash or by `debate next`)
/// is reused; an outstanding task for any other turn is failed as stale.
pub fn ensure_task(
    ws: &mut DebateWorkspace,
    round: u32,
    role: Role,
    description: &str,
) -> Result<TaskId> {
    let subject = task_subject(round, role);
    if let Some(task) = ws.state.queue.outstanding() {
        let id = task.id;
        if task.subject == subject && task.owner == Some(role) {
            return Ok(id);
        }
        warn!(task = %id, subject = %task.subject, "failing stale outstanding task");
        ws.state
            .queue
            .fail(id, format!("superseded by {subject}"))?;
    }
    Ok(ws.state.queue.enqueue(subject, description, Some(role))?)
}

/// Run `role`'s turn in the open round through `executor`.
///
/// Enqueue, start, render, execute with the turn deadline, complete and
/// deliver. A missed deadline fails the task; under the retry policy a
/// fresh task is enqueued until this call has used up the configured
/// attempts, after which the [`DebateError::TurnTimedOut`] is returned.
/// Tasks failed by earlier runs do not count against the budget.
#[instrument(skip_all, fields(role = %role))]
pub fn run_turn<E: Executor>(
    ws: &mut DebateWorkspace,
    executor: &E,
    role: Role,
) -> Result<TurnOutcome> {
    let context = build_role_context(&ws.state.session, role, &ws.config.references)?;
    let round = context.round;
    let prompt = PromptBuilder::new(ws.config.prompt_budget_bytes)
        .build(&context)
        .with_context(|| format!("build {role} prompt for round {round}"))?;
    let max_attempts = ws.config.attempts_per_turn();
    let mut tries = 0u32;

    loop {
        tries += 1;
        let id = ensure_task(ws, round, role, &prompt)?;
        let (attempt, description) = {
            let task = ws
                .state
                .queue
                .get(id)
                .ok_or(DebateError::UnknownTask(id))?;
            (task.attempt, task.description.clone())
        };
        if ws.state.queue.get(id).map(|task| task.status) == Some(TaskStatus::Pending) {
            ws.state.queue.start(id)?;
        }
        ws.save()?;
        ws.feed.set_thinking(Some(role))?;
        info!(task = %id, round, attempt, "turn started");

        let request = ExecRequest {
            role,
            round,
            attempt,
            prompt: description,
            workdir: ws.paths.root.clone(),
            log_path: ws.paths.turn_log_path(round, role, attempt),
            timeout: Duration::from_secs(ws.config.turn_timeout_secs),
            output_limit_bytes: ws.config.output_limit_bytes,
        };

        match executor.exec(&request) {
            Ok(text) => {
                let delivery = ws.accept_result(role, &text, Some(id))?;
                info!(task = %id, round, early_ruling = delivery.early_ruling, "turn completed");
                return Ok(TurnOutcome {
                    task: id,
                    round,
                    role,
                    attempt,
                    delivery,
                });
            }
            Err(err) => {
                ws.state.queue.fail(id, format!("{err:#}"))?;
                ws.feed.set_thinking(None)?;
                ws.save()?;
                let timed_out = matches!(
                    err.downcast_ref::<DebateError>(),
                    Some(DebateError::TurnTimedOut { .. })
                );
                if timed_out && tries < max_attempts {
                    warn!(task = %id, attempt, tries, max_attempts, "turn timed out, retrying");
                    continue;
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::start_round;
    use crate::io::config::TimeoutPolicy;
    use crate::test_support::{ScriptedExecutor, ScriptedTurn, TestDebate};

    fn open_round(debate: &TestDebate) -> DebateWorkspace {
        let mut ws = debate.open().expect("open");
        start_round(&mut ws.state.session).expect("start");
        ws.save().expect("save");
        ws
    }

    #[test]
    fn successful_turn_completes_its_task_and_records_the_result() {
        let debate = TestDebate::new("Adopt Rust", 3).expect("debate");
        let mut ws = open_round(&debate);
        let executor = ScriptedExecutor::new(vec![ScriptedTurn::Reply("ISSUE C1 (major): x".into())]);

        let outcome = run_turn(&mut ws, &executor, Role::Critic).expect("turn");

        assert_eq!(outcome.round, 1);
        assert_eq!(outcome.attempt, 1);
        let task = ws.state.queue.get(outcome.task).expect("task");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.subject, "round 1: critic");
        assert_eq!(
            ws.state.session.rounds[0].critic.as_deref(),
            Some("ISSUE C1 (major): x")
        );
        assert!(executor.prompts()[0].contains("### Role: Critic"));
    }

    #[test]
    fn out_of_order_turn_is_refused_before_any_task_exists() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        let executor = ScriptedExecutor::new(vec![]);

        let err = run_turn(&mut ws, &executor, Role::Judge).expect_err("out of order");
        assert!(matches!(
            err.downcast_ref::<DebateError>(),
            Some(DebateError::OutOfOrder { .. })
        ));
        assert!(ws.state.queue.tasks().is_empty());
    }

    #[test]
    fn timeout_aborts_by_default() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        let executor = ScriptedExecutor::new(vec![ScriptedTurn::TimeOut]);

        let err = run_turn(&mut ws, &executor, Role::Critic).expect_err("timeout");
        assert!(matches!(
            err.downcast_ref::<DebateError>(),
            Some(DebateError::TurnTimedOut { .. })
        ));
        let tasks = ws.state.queue.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Failed);
        assert!(ws.state.session.rounds[0].critic.is_none());
    }

    #[test]
    fn timeout_retries_under_retry_policy() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        ws.config.on_timeout = TimeoutPolicy::Retry;
        ws.config.max_turn_attempts = 2;
        let executor = ScriptedExecutor::new(vec![
            ScriptedTurn::TimeOut,
            ScriptedTurn::Reply("late critique".into()),
        ]);

        let outcome = run_turn(&mut ws, &executor, Role::Critic).expect("turn");

        assert_eq!(outcome.attempt, 2);
        let statuses: Vec<TaskStatus> = ws.state.queue.tasks().iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Failed, TaskStatus::Completed]);
    }

    #[test]
    fn resumed_turn_gets_a_fresh_retry_budget() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        ws.config.on_timeout = TimeoutPolicy::Retry;
        ws.config.max_turn_attempts = 2;
        let first_run = ScriptedExecutor::new(vec![ScriptedTurn::TimeOut, ScriptedTurn::TimeOut]);
        run_turn(&mut ws, &first_run, Role::Critic).expect_err("first run exhausts retries");

        let mut ws = debate.open().expect("reopen");
        ws.config.on_timeout = TimeoutPolicy::Retry;
        ws.config.max_turn_attempts = 2;
        let second_run = ScriptedExecutor::new(vec![
            ScriptedTurn::TimeOut,
            ScriptedTurn::Reply("finally".into()),
        ]);
        let outcome = run_turn(&mut ws, &second_run, Role::Critic).expect("resumed turn");

        assert_eq!(outcome.attempt, 4);
        assert_eq!(second_run.remaining(), 0);
        let statuses: Vec<TaskStatus> = ws.state.queue.tasks().iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Failed,
                TaskStatus::Failed,
                TaskStatus::Failed,
                TaskStatus::Completed
            ]
        );
        assert_eq!(ws.state.session.rounds[0].critic.as_deref(), Some("finally"));
    }

    #[test]
    fn executor_failures_are_never_retried() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        ws.config.on_timeout = TimeoutPolicy::Retry;
        let executor = ScriptedExecutor::new(vec![
            ScriptedTurn::Fail("agent crashed".into()),
            ScriptedTurn::Reply("unused".into()),
        ]);

        let err = run_turn(&mut ws, &executor, Role::Critic).expect_err("failure");
        assert!(err.to_string().contains("agent crashed"));
        assert_eq!(executor.remaining(), 1);
        let task = &ws.state.queue.tasks()[0];
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failure.as_deref(), Some("agent crashed"));
    }

    #[test]
    fn stale_task_for_another_turn_is_failed() {
        let debate = TestDebate::new("topic", 3).expect("debate");
        let mut ws = open_round(&debate);
        let stale = ws
            .state
            .queue
            .enqueue("round 0: scribe", "left over", Some(Role::Scribe))
            .expect("enqueue");

        let id = ensure_task(&mut ws, 1, Role::Critic, "prompt").expect("task");
        assert_ne!(id, stale);
        assert_eq!(
            ws.state.queue.get(stale).map(|t| t.status),
            Some(TaskStatus::Failed)
        );
        assert_eq!(ensure_task(&mut ws, 1, Role::Critic, "prompt").expect("reuse"), id);
    }
}
