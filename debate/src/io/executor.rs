//! Executor abstraction for agent turns.
//!
//! The [`Executor`] trait decouples turn orchestration from the agent host.
//! [`CommandExecutor`] pipes the prompt into a configured command and takes
//! its stdout as the role's result; tests use scripted executors instead.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::error::DebateError;
use crate::core::types::Role;
use crate::io::config::AgentConfig;
use crate::io::process::run_command_with_timeout;

/// Parameters for one agent turn.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub role: Role,
    pub round: u32,
    pub attempt: u32,
    /// Rendered task description.
    pub prompt: String,
    /// Working directory for the agent process.
    pub workdir: PathBuf,
    /// Where the captured stdout/stderr of this attempt are written.
    pub log_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

pub trait Executor {
    /// Run one turn and return the role's free-text result.
    ///
    /// A missed deadline is reported as [`DebateError::TurnTimedOut`].
    fn exec(&self, request: &ExecRequest) -> Result<String>;
}

/// Runs `agent.command` with the prompt on stdin.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("agent.command must be a non-empty array"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Executor for CommandExecutor {
    #[instrument(skip_all, fields(role = %request.role, round = request.round, attempt = request.attempt))]
    fn exec(&self, request: &ExecRequest) -> Result<String> {
        info!(program = %self.program, "starting agent turn");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&request.workdir)
            .env("DEBATE_ROLE", request.role.as_str())
            .env("DEBATE_ROUND", request.round.to_string());

        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .with_context(|| format!("run agent command {}", self.program))?;

        if let Some(parent) = request.log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create turn log dir {}", parent.display()))?;
        }
        fs::write(&request.log_path, output.render_log())
            .with_context(|| format!("write turn log {}", request.log_path.display()))?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "agent turn timed out");
            return Err(DebateError::TurnTimedOut {
                role: request.role,
                round: request.round,
                timeout_secs: request.timeout.as_secs(),
            }
            .into());
        }
        if !output.status.success() {
            bail!(
                "agent command failed with status {:?} (see {})",
                output.status.code(),
                request.log_path.display()
            );
        }

        let result = output.stdout.text().trim().to_string();
        if result.is_empty() {
            bail!(
                "agent returned an empty {} result (see {})",
                request.role,
                request.log_path.display()
            );
        }
        debug!(bytes = result.len(), "agent turn completed");
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(temp: &tempfile::TempDir, timeout: Duration) -> ExecRequest {
        ExecRequest {
            role: Role::Critic,
            round: 1,
            attempt: 1,
            prompt: "ISSUE C1 (major): echo\n".to_string(),
            workdir: temp.path().to_path_buf(),
            log_path: temp.path().join("turns").join("1-critic-1.log"),
            timeout,
            output_limit_bytes: 10_000,
        }
    }

    fn executor(command: &[&str]) -> CommandExecutor {
        CommandExecutor::new(&AgentConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
        })
        .expect("executor")
    }

    #[test]
    fn stdout_becomes_the_result_and_a_log_is_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(&temp, Duration::from_secs(5));
        let result = executor(&["cat"]).exec(&req).expect("exec");
        assert_eq!(result, "ISSUE C1 (major): echo");
        assert!(req.log_path.exists());
    }

    #[test]
    fn deadline_maps_to_turn_timed_out() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(&temp, Duration::from_millis(200));
        let err = executor(&["sleep", "5"]).exec(&req).expect_err("timeout");
        assert!(matches!(
            err.downcast_ref::<DebateError>(),
            Some(DebateError::TurnTimedOut {
                role: Role::Critic,
                round: 1,
                ..
            })
        ));
    }

    #[test]
    fn failing_command_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(&temp, Duration::from_secs(5));
        let err = executor(&["false"]).exec(&req).expect_err("failure");
        assert!(err.to_string().contains("agent command failed"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandExecutor::new(&AgentConfig { command: vec![] }).expect_err("empty");
        assert!(err.to_string().contains("non-empty"));
    }
}
