//! Full-debate orchestration for `debate run`.
//!
//! Every step persists the session before returning, so an interrupted run
//! resumes from `session.json` at the exact step it stopped on.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::controller::{
    NextAction, close_round, next_action, record_synthesis, should_continue, start_round,
    termination_mode,
};
use crate::core::error::DebateError;
use crate::core::types::{Role, TerminationMode};
use crate::io::executor::Executor;
use crate::io::live::{EntryKind, FeedStatus};
use crate::turn::{TurnOutcome, run_turn};
use crate::workspace::DebateWorkspace;

/// Outcome of closing a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundClosed {
    pub index: u32,
    pub path: PathBuf,
    pub early_ruling: bool,
    /// No further round will be started.
    pub debate_over: bool,
}

/// Summary of a `run_debate` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateOutcome {
    pub rounds: u32,
    pub termination: TerminationMode,
    /// Turns executed by this invocation (a resumed run counts only its own).
    pub turns_executed: u32,
    pub synthesis_path: PathBuf,
}

/// Open the next round and point the live feed at it.
pub fn begin_round(ws: &mut DebateWorkspace) -> Result<u32> {
    let index = start_round(&mut ws.state.session)?.index;
    ws.feed.set_round(index)?;
    ws.save()?;
    info!(round = index, "round started");
    Ok(index)
}

/// Write the open round's document and close it.
///
/// Fails with `IncompleteRound` while a role result is missing; nothing is
/// written in that case.
#[instrument(skip_all)]
pub fn finish_round(ws: &mut DebateWorkspace) -> Result<RoundClosed> {
    let round = ws
        .state
        .session
        .open_round()
        .ok_or(DebateError::NoOpenRound)?;
    let path = ws.writer.write_round(round)?;
    let closed = close_round(&mut ws.state.session)?;
    let (index, early_ruling) = (closed.index, closed.early_ruling);
    let debate_over = !should_continue(&ws.state.session);
    ws.save()?;
    info!(round = index, early_ruling, debate_over, "round closed");
    Ok(RoundClosed {
        index,
        path,
        early_ruling,
        debate_over,
    })
}

/// Write the synthesis for a terminated debate and mark the feed completed.
#[instrument(skip_all)]
pub fn synthesize(ws: &mut DebateWorkspace) -> Result<PathBuf> {
    if ws.state.session.rounds.is_empty() {
        return Err(DebateError::NoRounds.into());
    }
    match next_action(&ws.state.session) {
        NextAction::Synthesize => {}
        NextAction::Finished => {
            return Err(DebateError::InvalidState("synthesis already written".to_string()).into());
        }
        other => {
            return Err(DebateError::InvalidState(format!(
                "debate has not terminated (next: {other:?})"
            ))
            .into());
        }
    }

    let document = ws.writer.write_synthesis(&ws.state.session)?;
    record_synthesis(&mut ws.state.session, document.clone())?;
    ws.feed.upsert_entry(0, Role::Scribe, EntryKind::Synthesis, &document)?;
    ws.feed.set_status(FeedStatus::Completed)?;
    ws.save()?;
    Ok(ws.paths.synthesis_path.clone())
}

/// Drive the debate to completion.
///
/// Rounds run while the controller says to continue; each round runs the
/// four roles in order, is written after the scribe, then closed. Once the
/// debate terminates the synthesis is written. Stops on the first error
/// (protocol violations, executor failures, exhausted turn attempts).
pub fn run_debate<E: Executor, F: FnMut(&TurnOutcome)>(
    ws: &mut DebateWorkspace,
    executor: &E,
    mut on_turn: F,
) -> Result<DebateOutcome> {
    let mut turns_executed = 0u32;
    loop {
        match next_action(&ws.state.session) {
            NextAction::StartRound => {
                begin_round(ws)?;
            }
            NextAction::Turn { role, .. } => {
                let outcome = run_turn(ws, executor, role)?;
                turns_executed += 1;
                on_turn(&outcome);
            }
            NextAction::CloseRound { .. } => {
                finish_round(ws)?;
            }
            NextAction::Synthesize => {
                synthesize(ws)?;
            }
            NextAction::Finished => break,
        }
    }

    let session = &ws.state.session;
    let termination = termination_mode(session).unwrap_or(TerminationMode::FullRounds);
    info!(rounds = session.rounds.len(), %termination, turns_executed, "debate finished");
    Ok(DebateOutcome {
        rounds: session.rounds.len() as u32,
        termination,
        turns_executed,
        synthesis_path: ws.paths.synthesis_path.clone(),
    })
}
