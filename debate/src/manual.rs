//! Manual host mode: an external host pulls tasks and pushes results.
//!
//! `debate next` hands out the pending task for the next role; `debate
//! deliver` records a result produced outside this program. Round documents
//! and the synthesis are written as soon as the protocol allows.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::core::controller::{NextAction, expect_role, next_action};
use crate::core::error::DebateError;
use crate::core::queue::{TaskId, TaskStatus};
use crate::core::role_context::build_role_context;
use crate::core::router::Delivery;
use crate::core::types::Role;
use crate::io::prompt::PromptBuilder;
use crate::run::{RoundClosed, begin_round, finish_round, synthesize};
use crate::turn::ensure_task;
use crate::workspace::DebateWorkspace;

/// What `debate next` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTask {
    Pending {
        id: TaskId,
        round: u32,
        role: Role,
        description: String,
    },
    /// The debate is over and the synthesis is written.
    Complete,
}

/// Result of `deliver_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualDelivery {
    pub task: TaskId,
    pub delivery: Delivery,
    /// Set when this delivery completed the round.
    pub closed: Option<RoundClosed>,
    /// Set when this delivery ended the debate.
    pub synthesis: Option<PathBuf>,
}

/// Return the outstanding task for the next turn, creating it if needed.
pub fn next_task(ws: &mut DebateWorkspace) -> Result<NextTask> {
    loop {
        match next_action(&ws.state.session) {
            NextAction::StartRound => {
                begin_round(ws)?;
            }
            NextAction::CloseRound { .. } => {
                finish_round(ws)?;
            }
            NextAction::Synthesize => {
                synthesize(ws)?;
            }
            NextAction::Finished => return Ok(NextTask::Complete),
            NextAction::Turn { round, role } => {
                let context = build_role_context(&ws.state.session, role, &ws.config.references)?;
                let prompt = PromptBuilder::new(ws.config.prompt_budget_bytes).build(&context)?;
                let id = ensure_task(ws, round, role, &prompt)?;
                if ws.state.queue.get(id).map(|task| task.status) == Some(TaskStatus::Pending) {
                    ws.state.queue.start(id)?;
                }
                ws.feed.set_thinking(Some(role))?;
                ws.save()?;
                let description = ws
                    .state
                    .queue
                    .get(id)
                    .map(|task| task.description.clone())
                    .ok_or(DebateError::UnknownTask(id))?;
                return Ok(NextTask::Pending {
                    id,
                    round,
                    role,
                    description,
                });
            }
        }
    }
}

/// Record `text` as `role`'s result for the open round.
///
/// Out-of-order deliveries are rejected with `OutOfOrder` and change
/// nothing. A delivery without a prior `next` gets an audit task of its own.
pub fn deliver_result(ws: &mut DebateWorkspace, role: Role, text: &str) -> Result<ManualDelivery> {
    let round = ws
        .state
        .session
        .open_round()
        .ok_or(DebateError::NoOpenRound)?;
    expect_role(round, role)?;
    let index = round.index;

    let task = ensure_task(ws, index, role, "result delivered by an external host")?;
    if ws.state.queue.get(task).map(|t| t.status) == Some(TaskStatus::Pending) {
        ws.state.queue.start(task)?;
    }
    let delivery = ws.accept_result(role, text, Some(task))?;
    info!(task = %task, round = index, role = %role, "manual result delivered");

    let mut closed = None;
    let mut synthesis = None;
    if delivery.round_complete {
        let round_closed = finish_round(ws)?;
        if round_closed.debate_over {
            synthesis = Some(synthesize(ws)?);
        }
        closed = Some(round_closed);
    }

    Ok(ManualDelivery {
        task,
        delivery,
        closed,
        synthesis,
    })
}
