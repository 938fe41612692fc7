//! Test-only helpers: scripted executors, session builders, temp debates.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::core::controller::{close_round, record_role_result, start_round};
use crate::core::error::DebateError;
use crate::core::types::{DebateSession, Role};
use crate::io::config::{DebateConfig, write_config};
use crate::io::executor::{ExecRequest, Executor};
use crate::io::init::{InitOptions, init_debate};
use crate::io::paths::DebatePaths;
use crate::workspace::DebateWorkspace;

/// One scripted executor response.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Reply(String),
    /// Behave like an agent that missed its deadline.
    TimeOut,
    Fail(String),
}

/// Executor that replays scripted turns in order and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    prompts: Mutex<Vec<String>>,
    roles: Mutex<Vec<Role>>,
}

impl ScriptedExecutor {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Self::default()
        }
    }

    /// Executor replying with `texts`, one per turn.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|text| ScriptedTurn::Reply(text.to_string()))
                .collect(),
        )
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    /// Prompts sent to `role`, in order.
    pub fn prompts_for(&self, role: Role) -> Vec<String> {
        let roles = self.roles.lock().expect("roles lock");
        let prompts = self.prompts.lock().expect("prompts lock");
        roles
            .iter()
            .zip(prompts.iter())
            .filter(|(r, _)| **r == role)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.turns.lock().expect("turns lock").len()
    }
}

impl Executor for ScriptedExecutor {
    fn exec(&self, request: &ExecRequest) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(request.prompt.clone());
        self.roles.lock().expect("roles lock").push(request.role);
        let turn = self
            .turns
            .lock()
            .expect("turns lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted executor exhausted"))?;
        match turn {
            ScriptedTurn::Reply(text) => Ok(text),
            ScriptedTurn::TimeOut => Err(DebateError::TurnTimedOut {
                role: request.role,
                round: request.round,
                timeout_secs: request.timeout.as_secs(),
            }
            .into()),
            ScriptedTurn::Fail(message) => Err(anyhow!(message)),
        }
    }
}

/// Four role results for one round, in role order.
pub type RoundScript<'a> = [&'a str; 4];

/// Build a session whose rounds are all recorded and closed.
pub fn session_with_rounds(topic: &str, limit: Option<u32>, rounds: &[RoundScript<'_>]) -> DebateSession {
    let mut session = DebateSession::new(topic, limit);
    for texts in rounds {
        start_round(&mut session).expect("start round");
        let round = session.open_round_mut().expect("open round");
        for (role, text) in Role::ORDER.into_iter().zip(texts.iter()) {
            record_role_result(round, role, text).expect("record result");
        }
        close_round(&mut session).expect("close round");
    }
    session
}

/// An initialized debate in a temporary directory.
pub struct TestDebate {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl TestDebate {
    pub fn new(topic: &str, rounds: u32) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("debate-output");
        init_debate(
            &root,
            &InitOptions {
                topic: topic.to_string(),
                rounds: Some(rounds),
                force: false,
            },
        )?;
        Ok(Self { _dir: dir, root })
    }

    pub fn paths(&self) -> DebatePaths {
        DebatePaths::new(&self.root)
    }

    pub fn write_config(&self, config: &DebateConfig) -> Result<()> {
        write_config(&self.paths().config_path, config)
    }

    pub fn open(&self) -> Result<DebateWorkspace> {
        DebateWorkspace::open(&self.root)
    }
}
