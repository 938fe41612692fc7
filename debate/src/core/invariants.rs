//! Semantic invariants of a persisted debate session.

use crate::core::controller::{is_early_ruling, should_continue};
use crate::core::types::{DebateSession, Role};

/// Check invariants that serde alone cannot enforce:
/// - Round indices are contiguous from 1
/// - Only the last round may be open
/// - Results are filled in role order (judge before scribe, and so on)
/// - Closed rounds have all four results
/// - `early_ruling` matches the judge text
/// - `terminated_early` and `synthesis` agree with the round history
pub fn validate_session(session: &DebateSession) -> Vec<String> {
    let mut errors = Vec::new();

    if session.round_limit == Some(0) {
        errors.push("round_limit must be > 0".to_string());
    }

    let last = session.rounds.len();
    for (pos, round) in session.rounds.iter().enumerate() {
        let expected_index = pos as u32 + 1;
        let label = format!("round {}", round.index);
        if round.index != expected_index {
            errors.push(format!(
                "{label}: expected index {expected_index} (rounds must be contiguous)"
            ));
        }
        if !round.closed && pos + 1 != last {
            errors.push(format!("{label}: only the last round may be open"));
        }

        let mut gap: Option<Role> = None;
        for role in Role::ORDER {
            match (round.result(role), gap) {
                (None, None) => gap = Some(role),
                (Some(_), Some(missing)) => errors.push(format!(
                    "{label}: {role} recorded before {missing}"
                )),
                _ => {}
            }
        }
        if round.closed && !round.is_complete() {
            errors.push(format!("{label}: closed with missing results"));
        }

        let marker = round.judge.as_deref().is_some_and(is_early_ruling);
        if round.early_ruling != marker {
            errors.push(format!(
                "{label}: early_ruling={} disagrees with judge text",
                round.early_ruling
            ));
        }
    }

    if session.terminated_early {
        let ruled = session.last_closed_round().is_some_and(|round| {
            round.early_ruling && round.index < session.effective_round_limit()
        });
        if !ruled {
            errors.push("terminated_early set without an early ruling".to_string());
        }
    }

    if session.synthesis.is_some() {
        if session.rounds.is_empty() {
            errors.push("synthesis present on a session without rounds".to_string());
        } else if should_continue(session) || session.open_round().is_some() {
            errors.push("synthesis present before the debate terminated".to_string());
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Round;

    fn closed_round(index: u32, judge: &str) -> Round {
        let mut round = Round::new(index);
        round.critic = Some("c".to_string());
        round.advocate = Some("a".to_string());
        round.judge = Some(judge.to_string());
        round.scribe = Some("s".to_string());
        round.early_ruling = is_early_ruling(judge);
        round.closed = true;
        round
    }

    #[test]
    fn valid_session_has_no_errors() {
        let mut session = DebateSession::new("topic", Some(3));
        session.rounds = vec![closed_round(1, "j"), closed_round(2, "JUDGE'S RULING")];
        session.terminated_early = true;
        session.synthesis = Some("synthesis".to_string());
        assert!(validate_session(&session).is_empty());
    }

    #[test]
    fn reports_scribe_before_judge_and_open_middle_round() {
        let mut session = DebateSession::new("topic", None);
        let mut broken = Round::new(1);
        broken.critic = Some("c".to_string());
        broken.advocate = Some("a".to_string());
        broken.scribe = Some("s".to_string());
        session.rounds = vec![broken, closed_round(3, "j")];

        let errors = validate_session(&session);
        assert!(errors.iter().any(|err| err.contains("scribe recorded before judge")));
        assert!(errors.iter().any(|err| err.contains("only the last round may be open")));
        assert!(errors.iter().any(|err| err.contains("rounds must be contiguous")));
    }

    #[test]
    fn reports_premature_synthesis() {
        let mut session = DebateSession::new("topic", Some(3));
        session.rounds = vec![closed_round(1, "j")];
        session.synthesis = Some("too early".to_string());

        let errors = validate_session(&session);
        assert_eq!(errors, vec!["synthesis present before the debate terminated"]);
    }
}
