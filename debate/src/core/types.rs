//! Shared deterministic types for the debate core.
//!
//! These types define the session data model: a debate owns an ordered list
//! of rounds, each round collects one free-text result per role. They carry
//! no I/O and serialize deterministically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Round limit used when the session does not configure one.
pub const DEFAULT_ROUND_LIMIT: u32 = 3;

/// Literal marker a judge emits to end the debate before the round limit.
pub const EARLY_RULING_MARKER: &str = "JUDGE'S RULING";

/// A fixed position in the per-round sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Critic,
    Advocate,
    Judge,
    Scribe,
}

impl Role {
    /// Hard precedence within a round. Each role reads the previous role's output.
    pub const ORDER: [Role; 4] = [Role::Critic, Role::Advocate, Role::Judge, Role::Scribe];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Critic => "critic",
            Role::Advocate => "advocate",
            Role::Judge => "judge",
            Role::Scribe => "scribe",
        }
    }

    /// Display name used in transcripts.
    pub fn title(self) -> &'static str {
        match self {
            Role::Critic => "Critic",
            Role::Advocate => "Advocate",
            Role::Judge => "Judge",
            Role::Scribe => "Scribe",
        }
    }

    /// Role that follows `self` within the same round.
    pub fn next(self) -> Option<Role> {
        match self {
            Role::Critic => Some(Role::Advocate),
            Role::Advocate => Some(Role::Judge),
            Role::Judge => Some(Role::Scribe),
            Role::Scribe => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critic" => Ok(Role::Critic),
            "advocate" => Ok(Role::Advocate),
            "judge" => Ok(Role::Judge),
            "scribe" => Ok(Role::Scribe),
            other => Err(format!(
                "unknown role '{other}' (expected critic, advocate, judge or scribe)"
            )),
        }
    }
}

/// One complete pass through all four roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round index.
    pub index: u32,
    pub critic: Option<String>,
    pub advocate: Option<String>,
    pub judge: Option<String>,
    pub scribe: Option<String>,
    /// Judge text carried the early-ruling marker.
    pub early_ruling: bool,
    /// All four roles completed and the round document was written.
    pub closed: bool,
}

impl Round {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            critic: None,
            advocate: None,
            judge: None,
            scribe: None,
            early_ruling: false,
            closed: false,
        }
    }

    pub fn result(&self, role: Role) -> Option<&str> {
        match role {
            Role::Critic => self.critic.as_deref(),
            Role::Advocate => self.advocate.as_deref(),
            Role::Judge => self.judge.as_deref(),
            Role::Scribe => self.scribe.as_deref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Critic => &mut self.critic,
            Role::Advocate => &mut self.advocate,
            Role::Judge => &mut self.judge,
            Role::Scribe => &mut self.scribe,
        }
    }

    /// First role without a recorded result, in fixed order.
    pub fn next_role(&self) -> Option<Role> {
        Role::ORDER
            .into_iter()
            .find(|role| self.result(*role).is_none())
    }

    pub fn missing_roles(&self) -> Vec<Role> {
        Role::ORDER
            .into_iter()
            .filter(|role| self.result(*role).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.next_role().is_none()
    }
}

/// How a finished debate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationMode {
    /// The configured round limit was reached.
    FullRounds,
    /// The judge issued a ruling before the limit.
    EarlyRuling,
}

impl TerminationMode {
    pub fn label(self) -> &'static str {
        match self {
            TerminationMode::FullRounds => "full rounds completed",
            TerminationMode::EarlyRuling => "early ruling",
        }
    }
}

impl fmt::Display for TerminationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single debate over one topic. Append-only except for `synthesis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateSession {
    pub topic: String,
    /// Configured round limit; `None` means [`DEFAULT_ROUND_LIMIT`].
    pub round_limit: Option<u32>,
    pub rounds: Vec<Round>,
    pub terminated_early: bool,
    pub synthesis: Option<String>,
}

impl DebateSession {
    pub fn new(topic: impl Into<String>, round_limit: Option<u32>) -> Self {
        Self {
            topic: topic.into(),
            round_limit,
            rounds: Vec::new(),
            terminated_early: false,
            synthesis: None,
        }
    }

    pub fn effective_round_limit(&self) -> u32 {
        self.round_limit.unwrap_or(DEFAULT_ROUND_LIMIT)
    }

    /// The last round, if it has not been closed yet.
    pub fn open_round(&self) -> Option<&Round> {
        self.rounds.last().filter(|round| !round.closed)
    }

    pub fn open_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut().filter(|round| !round.closed)
    }

    pub fn last_closed_round(&self) -> Option<&Round> {
        self.rounds.iter().rev().find(|round| round.closed)
    }

    pub fn closed_round_count(&self) -> u32 {
        self.rounds.iter().filter(|round| round.closed).count() as u32
    }

    /// Prior outputs of `role` from rounds before `before_round`, oldest first.
    pub fn role_history(&self, role: Role, before_round: u32) -> Vec<(u32, &str)> {
        self.rounds
            .iter()
            .filter(|round| round.index < before_round)
            .filter_map(|round| round.result(role).map(|text| (round.index, text)))
            .collect()
    }
}
