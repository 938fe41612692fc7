//! Message router: delivers role results to the controller and the transcript.
//!
//! Deliveries are processed strictly in arrival order. An out-of-order
//! result is rejected, never buffered, and leaves no transcript entry.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::controller::{expect_role, record_role_result};
use crate::core::error::DebateError;
use crate::core::types::{DebateSession, Role};

/// One accepted role result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub round: u32,
    pub role: Role,
    pub text: String,
}

/// Durable destination for accepted results, in delivery order.
pub trait TranscriptSink {
    fn append(&mut self, entry: &TranscriptEntry) -> Result<()>;
}

impl TranscriptSink for Vec<TranscriptEntry> {
    fn append(&mut self, entry: &TranscriptEntry) -> Result<()> {
        self.push(entry.clone());
        Ok(())
    }
}

/// What a successful delivery did to the open round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub round: u32,
    pub role: Role,
    /// Set when the judge result carried the early-ruling marker.
    pub early_ruling: bool,
    /// All four roles have now reported for this round.
    pub round_complete: bool,
}

pub struct MessageRouter<S> {
    sink: S,
}

impl<S: TranscriptSink> MessageRouter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Record `text` for `role` in the session's open round.
    ///
    /// Protocol violations surface as [`DebateError`] (`NoOpenRound`,
    /// `OutOfOrder`) and can be recovered with `downcast_ref`.
    pub fn deliver(
        &mut self,
        session: &mut DebateSession,
        role: Role,
        text: &str,
    ) -> Result<Delivery> {
        let round = session.open_round_mut().ok_or(DebateError::NoOpenRound)?;
        expect_role(round, role)?;

        self.sink.append(&TranscriptEntry {
            round: round.index,
            role,
            text: text.to_string(),
        })?;
        record_role_result(round, role, text)?;

        Ok(Delivery {
            round: round.index,
            role,
            early_ruling: role == Role::Judge && round.early_ruling,
            round_complete: round.is_complete(),
        })
    }
}
