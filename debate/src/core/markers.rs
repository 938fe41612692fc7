//! Structured single-line markers embedded in role prose.
//!
//! Roles are prompted to annotate their free text with:
//!
//! ```text
//! ISSUE <id> (<critical|major|minor>): <summary>               critic
//! RESPONSE <id> (<defend|concede|partial>): <text>              advocate
//! RULING <id>: <ACCEPTED|REJECTED|REVISION REQUIRED> - <reason> judge
//! VERDICT: <overall verdict>                                    judge
//! ```
//!
//! Lines may carry list bullets or `**bold**` wrapping. Anything that does
//! not match is treated as prose and ignored here.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::types::EARLY_RULING_MARKER;

const LINE_PREFIX: &str = r"^\s*(?:[-*+]\s+|\d+[.)]\s+)?(?:\*\*)?";

static ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){LINE_PREFIX}ISSUE\s+([A-Za-z0-9_.-]+)\s*\(\s*(critical|major|minor)\s*\)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.+?)\s*$"
    ))
    .expect("issue marker regex")
});

static RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){LINE_PREFIX}RESPONSE\s+([A-Za-z0-9_.-]+)\s*\(\s*(defend|concede|partial)\s*\)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.+?)\s*$"
    ))
    .expect("response marker regex")
});

static RULING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){LINE_PREFIX}RULING\s+([A-Za-z0-9_.-]+)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(ACCEPTED|REJECTED|REVISION\s+REQUIRED)(?:\*\*)?\s*(?:[-–—:]\s*(.*?))?\s*$"
    ))
    .expect("ruling marker regex")
});

static VERDICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){LINE_PREFIX}(?:overall\s+)?VERDICT(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.+?)\s*$"
    ))
    .expect("verdict marker regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Defend,
    Concede,
    Partial,
}

/// Judge's per-issue verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "REVISION REQUIRED")]
    RevisionRequired,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Accepted => "ACCEPTED",
            Verdict::Rejected => "REJECTED",
            Verdict::RevisionRequired => "REVISION REQUIRED",
        }
    }

    /// Accepted and rejected issues are settled; revision keeps them open.
    pub fn is_resolved(self) -> bool {
        !matches!(self, Verdict::RevisionRequired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueMarker {
    pub id: String,
    pub severity: Severity,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseMarker {
    pub id: String,
    pub stance: Stance,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulingMarker {
    pub id: String,
    pub verdict: Verdict,
    pub reason: String,
}

pub fn parse_issues(text: &str) -> Vec<IssueMarker> {
    text.lines()
        .filter_map(|line| ISSUE_RE.captures(line))
        .map(|caps| IssueMarker {
            id: normalize_id(&caps[1]),
            severity: match caps[2].to_ascii_lowercase().as_str() {
                "critical" => Severity::Critical,
                "major" => Severity::Major,
                _ => Severity::Minor,
            },
            summary: strip_bold(&caps[3]),
        })
        .collect()
}

pub fn parse_responses(text: &str) -> Vec<ResponseMarker> {
    text.lines()
        .filter_map(|line| RESPONSE_RE.captures(line))
        .map(|caps| ResponseMarker {
            id: normalize_id(&caps[1]),
            stance: match caps[2].to_ascii_lowercase().as_str() {
                "defend" => Stance::Defend,
                "concede" => Stance::Concede,
                _ => Stance::Partial,
            },
            text: strip_bold(&caps[3]),
        })
        .collect()
}

pub fn parse_rulings(text: &str) -> Vec<RulingMarker> {
    text.lines()
        .filter_map(|line| RULING_RE.captures(line))
        .map(|caps| {
            let verdict = caps[2].to_ascii_uppercase();
            RulingMarker {
                id: normalize_id(&caps[1]),
                verdict: if verdict.starts_with("ACCEPTED") {
                    Verdict::Accepted
                } else if verdict.starts_with("REJECTED") {
                    Verdict::Rejected
                } else {
                    Verdict::RevisionRequired
                },
                reason: caps.get(3).map(|m| strip_bold(m.as_str())).unwrap_or_default(),
            }
        })
        .collect()
}

/// Overall verdict from a judge's text.
///
/// Preference: the last `VERDICT:` marker, then the paragraph following the
/// last early-ruling marker, then the last non-empty paragraph.
pub fn overall_verdict(judge_text: &str) -> String {
    if let Some(caps) = judge_text
        .lines()
        .rev()
        .find_map(|line| VERDICT_RE.captures(line))
    {
        return strip_bold(&caps[1]);
    }

    if let Some(pos) = judge_text.rfind(EARLY_RULING_MARKER) {
        let after = judge_text[pos + EARLY_RULING_MARKER.len()..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | ':' | '-'));
        if let Some(paragraph) = first_paragraph(after) {
            return paragraph;
        }
    }

    judge_text
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

fn first_paragraph(text: &str) -> Option<String> {
    text.split("\n\n")
        .map(str::trim)
        .find(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
}

fn normalize_id(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '.' || c == '-')
        .to_ascii_uppercase()
}

fn strip_bold(raw: &str) -> String {
    raw.replace("**", "").trim().to_string()
}
