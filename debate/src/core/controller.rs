//! Round controller: enforces the fixed role order and decides continuation.
//!
//! All functions mutate an in-memory [`DebateSession`] and perform no I/O.

use crate::core::error::DebateError;
use crate::core::types::{DebateSession, EARLY_RULING_MARKER, Role, Round, TerminationMode};

/// What the orchestrator has to do next for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// No round is open and the debate continues.
    StartRound,
    /// The open round expects a result from this role.
    Turn { round: u32, role: Role },
    /// All four results are in; write and close the round.
    CloseRound { round: u32 },
    /// The debate terminated and has no synthesis yet.
    Synthesize,
    /// Synthesis recorded; nothing left to do.
    Finished,
}

/// Open a new round. The previous round must be closed and the debate must
/// not have terminated.
pub fn start_round(session: &mut DebateSession) -> Result<&Round, DebateError> {
    if let Some(open) = session.open_round() {
        return Err(DebateError::InvalidState(format!(
            "round {} is still open",
            open.index
        )));
    }
    if !should_continue(session) {
        return Err(DebateError::InvalidState(
            "debate has terminated; no further rounds".to_string(),
        ));
    }
    let index = session.rounds.len() as u32 + 1;
    session.rounds.push(Round::new(index));
    Ok(&session.rounds[session.rounds.len() - 1])
}

/// Fail with `OutOfOrder` unless `role` is the next expected role of `round`.
pub fn expect_role(round: &Round, role: Role) -> Result<(), DebateError> {
    if round.closed {
        return Err(DebateError::InvalidState(format!(
            "round {} is closed",
            round.index
        )));
    }
    let expected = round.next_role();
    if expected != Some(role) {
        return Err(DebateError::OutOfOrder {
            expected,
            got: role,
        });
    }
    Ok(())
}

/// Write `text` into the slot for `role`, enforcing critic → advocate → judge → scribe.
pub fn record_role_result(round: &mut Round, role: Role, text: &str) -> Result<(), DebateError> {
    expect_role(round, role)?;
    if role == Role::Judge {
        round.early_ruling = is_early_ruling(text);
    }
    *round.slot_mut(role) = Some(text.to_string());
    Ok(())
}

/// Close the open round once every role has reported.
///
/// Callers write the round document before closing it.
pub fn close_round(session: &mut DebateSession) -> Result<&Round, DebateError> {
    let limit = session.effective_round_limit();
    let round = session.open_round_mut().ok_or(DebateError::NoOpenRound)?;
    let missing = round.missing_roles();
    if !missing.is_empty() {
        return Err(DebateError::IncompleteRound {
            index: round.index,
            missing,
        });
    }
    round.closed = true;
    let early = round.early_ruling && round.index < limit;
    if early {
        session.terminated_early = true;
    }
    Ok(&session.rounds[session.rounds.len() - 1])
}

/// True iff the judge text carries the early-ruling marker.
pub fn is_early_ruling(judge_text: &str) -> bool {
    judge_text.contains(EARLY_RULING_MARKER)
}

/// False once the judge ruled early or the round limit is reached. Monotone:
/// closed rounds only accumulate and `terminated_early` is never cleared.
///
/// Only closed rounds count toward the limit, so an open final round still
/// reads as "continue" until its scribe reports.
pub fn should_continue(session: &DebateSession) -> bool {
    if session.terminated_early {
        return false;
    }
    if session
        .last_closed_round()
        .is_some_and(|round| round.early_ruling)
    {
        return false;
    }
    session.closed_round_count() < session.effective_round_limit()
}

/// How the debate ended, or `None` while it continues.
pub fn termination_mode(session: &DebateSession) -> Option<TerminationMode> {
    if should_continue(session) {
        return None;
    }
    if session.terminated_early {
        Some(TerminationMode::EarlyRuling)
    } else {
        Some(TerminationMode::FullRounds)
    }
}

/// Fill the write-once synthesis slot.
///
/// A session has a synthesis iff it has rounds and the debate terminated.
pub fn record_synthesis(session: &mut DebateSession, synthesis: String) -> Result<(), DebateError> {
    if session.rounds.is_empty() {
        return Err(DebateError::NoRounds);
    }
    if should_continue(session) {
        return Err(DebateError::InvalidState(
            "debate has not terminated".to_string(),
        ));
    }
    if session.synthesis.is_some() {
        return Err(DebateError::InvalidState(
            "synthesis already recorded".to_string(),
        ));
    }
    session.synthesis = Some(synthesis);
    Ok(())
}

/// Decide the next orchestration step.
pub fn next_action(session: &DebateSession) -> NextAction {
    if let Some(round) = session.open_round() {
        return match round.next_role() {
            Some(role) => NextAction::Turn {
                round: round.index,
                role,
            },
            None => NextAction::CloseRound { round: round.index },
        };
    }
    if should_continue(session) {
        return NextAction::StartRound;
    }
    if session.synthesis.is_none() {
        return NextAction::Synthesize;
    }
    NextAction::Finished
}
