//! Per-role input context for the next turn.
//!
//! Each role sees its own prior outputs plus what the preceding roles said
//! this round. The round limit is only ever exposed to the judge, so the
//! critic, advocate and scribe cannot steer their arguments toward an
//! expected end of the debate.

use serde::Serialize;

use crate::core::controller::expect_role;
use crate::core::error::DebateError;
use crate::core::types::{DebateSession, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorOutput {
    pub round: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleContext {
    pub role: Role,
    pub topic: String,
    pub round: u32,
    /// This role's own outputs from earlier rounds, oldest first.
    pub own_history: Vec<PriorOutput>,
    /// Scribe summary of the previous round.
    pub previous_summary: Option<String>,
    pub critique: Option<String>,
    pub defense: Option<String>,
    pub assessment: Option<String>,
    /// Reference material paths the host may consult.
    pub references: Vec<String>,
    /// Judge only.
    pub round_limit: Option<u32>,
    /// Judge only: this round must end with a ruling.
    pub final_round: Option<bool>,
}

/// Build the context for `role` against the session's open round.
///
/// Fails with `NoOpenRound`, or `OutOfOrder` if `role` is not next.
pub fn build_role_context(
    session: &DebateSession,
    role: Role,
    references: &[String],
) -> Result<RoleContext, DebateError> {
    let round = session.open_round().ok_or(DebateError::NoOpenRound)?;
    expect_role(round, role)?;

    let own_history = session
        .role_history(role, round.index)
        .into_iter()
        .map(|(index, text)| PriorOutput {
            round: index,
            text: text.to_string(),
        })
        .collect();
    let previous_summary = session
        .last_closed_round()
        .and_then(|prev| prev.result(Role::Scribe))
        .map(str::to_string);
    let current = |r: Role| round.result(r).map(str::to_string);

    let mut context = RoleContext {
        role,
        topic: session.topic.clone(),
        round: round.index,
        own_history,
        previous_summary,
        critique: None,
        defense: None,
        assessment: None,
        references: references.to_vec(),
        round_limit: None,
        final_round: None,
    };

    match role {
        Role::Critic => {}
        Role::Advocate => {
            context.critique = current(Role::Critic);
        }
        Role::Judge => {
            let limit = session.effective_round_limit();
            context.critique = current(Role::Critic);
            context.defense = current(Role::Advocate);
            context.round_limit = Some(limit);
            context.final_round = Some(round.index >= limit);
        }
        Role::Scribe => {
            context.critique = current(Role::Critic);
            context.defense = current(Role::Advocate);
            context.assessment = current(Role::Judge);
        }
    }

    Ok(context)
}
