//! Final synthesis assembly from closed rounds.
//!
//! Pure aggregation over the structured markers found in each round. The
//! output writer renders the resulting [`Synthesis`] to markdown.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::controller::termination_mode;
use crate::core::error::DebateError;
use crate::core::markers::{
    Severity, Stance, Verdict, overall_verdict, parse_issues, parse_responses, parse_rulings,
};
use crate::core::types::{DebateSession, Role, TerminationMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    pub topic: String,
    pub rounds_completed: u32,
    pub termination: TerminationMode,
    pub round_outcomes: Vec<RoundOutcome>,
    pub agreements: Vec<IssueDigest>,
    pub concessions: Vec<ConcessionEntry>,
    pub dismissed: Vec<IssueDigest>,
    pub rulings: Vec<RulingEntry>,
    pub unresolved: Vec<IssueDigest>,
    pub verdict: String,
}

/// Per-round issue bookkeeping, keyed by round index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    pub index: u32,
    pub early_ruling: bool,
    /// Issues ruled ACCEPTED or REJECTED in this round.
    pub resolved: Vec<String>,
    /// Issues ruled REVISION REQUIRED, or raised without a ruling, in this round.
    pub open: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDigest {
    pub id: String,
    pub summary: String,
    pub severity: Option<Severity>,
    /// Round of the latest ruling, or the round that raised the issue.
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcessionEntry {
    pub round: u32,
    pub issue: String,
    pub stance: Stance,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulingEntry {
    pub round: u32,
    pub issue: String,
    pub verdict: Verdict,
    pub reason: String,
}

#[derive(Debug, Clone)]
struct IssueState {
    summary: String,
    severity: Option<Severity>,
    raised_in: u32,
    last_stance: Option<Stance>,
    last_ruling: Option<(u32, Verdict, String)>,
}

/// Aggregate every round of `session` into a synthesis.
///
/// Fails with `NoRounds` on an empty session and with `IncompleteRound` when
/// any round lacks a role result; partial rounds are never presented as
/// complete.
pub fn build_synthesis(session: &DebateSession) -> Result<Synthesis, DebateError> {
    if session.rounds.is_empty() {
        return Err(DebateError::NoRounds);
    }
    for round in &session.rounds {
        let missing = round.missing_roles();
        if !missing.is_empty() {
            return Err(DebateError::IncompleteRound {
                index: round.index,
                missing,
            });
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut issues: HashMap<String, IssueState> = HashMap::new();
    let mut round_outcomes = Vec::new();
    let mut concessions = Vec::new();
    let mut rulings = Vec::new();

    for round in &session.rounds {
        let critic = round.result(Role::Critic).unwrap_or_default();
        let advocate = round.result(Role::Advocate).unwrap_or_default();
        let judge = round.result(Role::Judge).unwrap_or_default();

        let mut raised_here = Vec::new();
        for issue in parse_issues(critic) {
            raised_here.push(issue.id.clone());
            issues
                .entry(issue.id.clone())
                .and_modify(|state| state.summary = issue.summary.clone())
                .or_insert_with(|| {
                    order.push(issue.id.clone());
                    IssueState {
                        summary: issue.summary.clone(),
                        severity: Some(issue.severity),
                        raised_in: round.index,
                        last_stance: None,
                        last_ruling: None,
                    }
                });
        }

        for response in parse_responses(advocate) {
            if matches!(response.stance, Stance::Concede | Stance::Partial) {
                concessions.push(ConcessionEntry {
                    round: round.index,
                    issue: response.id.clone(),
                    stance: response.stance,
                    text: response.text.clone(),
                });
            }
            issue_entry(&mut issues, &mut order, &response.id, round.index).last_stance =
                Some(response.stance);
        }

        let mut resolved = Vec::new();
        let mut open = Vec::new();
        for ruling in parse_rulings(judge) {
            if ruling.verdict.is_resolved() {
                push_unique(&mut resolved, &ruling.id);
            } else {
                push_unique(&mut open, &ruling.id);
            }
            let state = issue_entry(&mut issues, &mut order, &ruling.id, round.index);
            if state.summary.is_empty() {
                state.summary = ruling.reason.clone();
            }
            state.last_ruling = Some((round.index, ruling.verdict, ruling.reason.clone()));
            rulings.push(RulingEntry {
                round: round.index,
                issue: ruling.id,
                verdict: ruling.verdict,
                reason: ruling.reason,
            });
        }
        for id in raised_here {
            if !resolved.contains(&id) {
                push_unique(&mut open, &id);
            }
        }

        round_outcomes.push(RoundOutcome {
            index: round.index,
            early_ruling: round.early_ruling,
            resolved,
            open,
        });
    }

    let mut agreements = Vec::new();
    let mut dismissed = Vec::new();
    let mut unresolved = Vec::new();
    for id in &order {
        let state = &issues[id];
        match &state.last_ruling {
            Some((ruled_in, Verdict::Accepted, _)) => {
                if state.last_stance == Some(Stance::Concede) {
                    agreements.push(digest(id, state, *ruled_in));
                }
            }
            Some((ruled_in, Verdict::Rejected, _)) => dismissed.push(digest(id, state, *ruled_in)),
            Some((ruled_in, Verdict::RevisionRequired, _)) => {
                unresolved.push(digest(id, state, *ruled_in));
            }
            None => unresolved.push(digest(id, state, state.raised_in)),
        }
    }

    let last_judge = session
        .rounds
        .last()
        .and_then(|round| round.result(Role::Judge))
        .unwrap_or_default();

    Ok(Synthesis {
        topic: session.topic.clone(),
        rounds_completed: session.rounds.len() as u32,
        termination: termination_mode(session).unwrap_or(TerminationMode::FullRounds),
        round_outcomes,
        agreements,
        concessions,
        dismissed,
        rulings,
        unresolved,
        verdict: overall_verdict(last_judge),
    })
}

fn issue_entry<'a>(
    issues: &'a mut HashMap<String, IssueState>,
    order: &mut Vec<String>,
    id: &str,
    round: u32,
) -> &'a mut IssueState {
    issues.entry(id.to_string()).or_insert_with(|| {
        order.push(id.to_string());
        IssueState {
            summary: String::new(),
            severity: None,
            raised_in: round,
            last_stance: None,
            last_ruling: None,
        }
    })
}

fn digest(id: &str, state: &IssueState, round: u32) -> IssueDigest {
    IssueDigest {
        id: id.to_string(),
        summary: state.summary.clone(),
        severity: state.severity,
        round,
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::{close_round, record_role_result, start_round};

    fn push_round(session: &mut DebateSession, texts: [&str; 4]) {
        start_round(session).expect("start");
        let round = session.open_round_mut().expect("open");
        for (role, text) in Role::ORDER.into_iter().zip(texts) {
            record_role_result(round, role, text).expect("record");
        }
        close_round(session).expect("close");
    }

    #[test]
    fn empty_session_has_no_synthesis() {
        let session = DebateSession::new("topic", None);
        assert_eq!(build_synthesis(&session), Err(DebateError::NoRounds));
    }

    #[test]
    fn incomplete_round_fails_loudly() {
        let mut session = DebateSession::new("topic", None);
        start_round(&mut session).expect("start");
        let round = session.open_round_mut().expect("open");
        record_role_result(round, Role::Critic, "c").expect("critic");

        assert_eq!(
            build_synthesis(&session),
            Err(DebateError::IncompleteRound {
                index: 1,
                missing: vec![Role::Advocate, Role::Judge, Role::Scribe],
            })
        );
    }

    #[test]
    fn classifies_issues_by_latest_ruling() {
        let mut session = DebateSession::new("Adopt event sourcing", Some(2));
        push_round(
            &mut session,
            [
                "ISSUE C1 (major): replay cost\nISSUE C2 (minor): naming\nISSUE C3 (critical): no migration plan",
                "RESPONSE C1 (concede): true\nRESPONSE C2 (defend): conventional\nRESPONSE C3 (partial): sketch exists",
                "RULING C1: ACCEPTED - replay is slow\nRULING C2: REJECTED - naming is fine\nRULING C3: REVISION REQUIRED - flesh it out",
                "Round one summary",
            ],
        );
        push_round(
            &mut session,
            [
                "ISSUE C4 (minor): docs",
                "RESPONSE C3 (defend): plan attached",
                "RULING C3: REVISION REQUIRED - still thin\nVERDICT: Adopt with a migration plan",
                "Round two summary",
            ],
        );

        let synthesis = build_synthesis(&session).expect("synthesis");
        assert_eq!(synthesis.rounds_completed, 2);
        assert_eq!(synthesis.termination, TerminationMode::FullRounds);
        assert_eq!(synthesis.verdict, "Adopt with a migration plan");

        let ids = |list: &[IssueDigest]| list.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&synthesis.agreements), vec!["C1"]);
        assert_eq!(ids(&synthesis.dismissed), vec!["C2"]);
        assert_eq!(ids(&synthesis.unresolved), vec!["C3", "C4"]);
        assert_eq!(synthesis.concessions.len(), 2);
        assert_eq!(synthesis.rulings.len(), 4);

        assert_eq!(synthesis.round_outcomes[0].resolved, vec!["C1", "C2"]);
        assert_eq!(synthesis.round_outcomes[0].open, vec!["C3"]);
        assert_eq!(synthesis.round_outcomes[1].open, vec!["C3", "C4"]);
    }

    #[test]
    fn every_round_is_referenced_without_markers() {
        let mut session = DebateSession::new("topic", None);
        push_round(&mut session, ["c1", "a1", "j1", "s1"]);
        push_round(&mut session, ["c2", "a2", "JUDGE'S RULING\n\nDone.", "s2"]);

        let synthesis = build_synthesis(&session).expect("synthesis");
        let indices: Vec<u32> = synthesis.round_outcomes.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(synthesis.termination, TerminationMode::EarlyRuling);
        assert_eq!(synthesis.verdict, "Done.");
    }
}
