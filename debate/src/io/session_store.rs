//! Persisted session state (`session.json`): the debate plus its task queue.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::write_atomic;
use crate::core::invariants::validate_session;
use crate::core::queue::TaskQueue;
use crate::core::types::DebateSession;

/// Everything needed to resume a debate after a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    pub session: DebateSession,
    #[serde(default)]
    pub queue: TaskQueue,
}

impl SessionState {
    pub fn new(session: DebateSession) -> Self {
        Self {
            session,
            queue: TaskQueue::new(),
        }
    }
}

/// Load and validate session state.
///
/// A file that parses but violates session invariants is rejected, so a
/// hand-edited or corrupted session never reaches the controller.
pub fn load_session(path: &Path) -> Result<SessionState> {
    debug!(path = %path.display(), "loading session");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read session {}", path.display()))?;
    let state: SessionState = serde_json::from_str(&contents)
        .with_context(|| format!("parse session {}", path.display()))?;
    let errors = validate_session(&state.session);
    if !errors.is_empty() {
        bail!(
            "invalid session {}:\n- {}",
            path.display(),
            errors.join("\n- ")
        );
    }
    debug!(
        rounds = state.session.rounds.len(),
        tasks = state.queue.tasks().len(),
        "session loaded"
    );
    Ok(state)
}

/// Atomically write session state (temp file + rename).
pub fn write_session(path: &Path, state: &SessionState) -> Result<()> {
    debug!(path = %path.display(), rounds = state.session.rounds.len(), "writing session");
    let mut buf = serde_json::to_string_pretty(state).context("serialize session")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
