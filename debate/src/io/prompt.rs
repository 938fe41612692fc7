//! Per-role prompt rendering for turn tasks.
//!
//! Templates mark their sections with `<!-- section:KEY required|droppable -->`.
//! When a prompt exceeds the byte budget, the role's oldest own outputs are
//! dropped first, then whole droppable sections, then the largest role inputs
//! are truncated. The contract, round budget and output format are never cut,
//! so a budget smaller than those alone yields an over-budget prompt and a
//! warning.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::{debug, warn};

use crate::core::role_context::RoleContext;
use crate::core::types::Role;

const SHARED_TEMPLATE: &str = include_str!("prompts/shared.md");
const CRITIC_TEMPLATE: &str = include_str!("prompts/critic.md");
const ADVOCATE_TEMPLATE: &str = include_str!("prompts/advocate.md");
const JUDGE_TEMPLATE: &str = include_str!("prompts/judge.md");
const SCRIBE_TEMPLATE: &str = include_str!("prompts/scribe.md");

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").expect("section marker regex")
});

/// Droppable sections, least important first.
const DROP_ORDER: [&str; 2] = ["references", "history"];

/// Sections never truncated: the role contract, the round budget and the
/// output format.
const KEEP_WHOLE: [&str; 3] = ["contract", "limit", "format"];

const SEPARATOR: &str = "\n\n";
const TRUNCATION_MARKER: &str = "\n[truncated]";

struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in [
            ("shared.md", SHARED_TEMPLATE),
            ("critic.md", CRITIC_TEMPLATE),
            ("advocate.md", ADVOCATE_TEMPLATE),
            ("judge.md", JUDGE_TEMPLATE),
            ("scribe.md", SCRIBE_TEMPLATE),
        ] {
            env.add_template(name, source)
                .expect("prompt template should be valid");
        }
        Self { env }
    }

    fn render(&self, ctx: &RoleContext) -> Result<String> {
        let name = format!("{}.md", ctx.role);
        let template = self.env.get_template(&name)?;
        let trimmed = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };
        let rendered = match ctx.role {
            Role::Judge => template.render(context! {
                topic => ctx.topic.trim(),
                round => ctx.round,
                own_history => &ctx.own_history,
                references => &ctx.references,
                critique => trimmed(&ctx.critique),
                defense => trimmed(&ctx.defense),
                round_limit => ctx.round_limit,
                final_round => ctx.final_round.unwrap_or(false),
            })?,
            _ => template.render(context! {
                topic => ctx.topic.trim(),
                round => ctx.round,
                own_history => &ctx.own_history,
                references => &ctx.references,
                previous_summary => trimmed(&ctx.previous_summary),
                critique => trimmed(&ctx.critique),
                defense => trimmed(&ctx.defense),
                assessment => trimmed(&ctx.assessment),
            })?,
        };
        Ok(rendered)
    }
}

#[derive(Debug, Clone)]
struct Section {
    key: String,
    required: bool,
    content: String,
}

fn parse_sections(rendered: &str) -> Vec<Section> {
    let markers: Vec<_> = SECTION_RE.captures_iter(rendered).collect();
    let mut sections = Vec::new();
    for (i, caps) in markers.iter().enumerate() {
        let Some(marker) = caps.get(0) else { continue };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(rendered.len(), |next| next.start());
        let content = rendered[marker.end()..end].trim().to_string();
        let required = &caps[2] == "required";
        if !content.is_empty() || required {
            sections.push(Section {
                key: caps[1].to_string(),
                required,
                content,
            });
        }
    }
    sections
}

/// Length of the prompt `join_sections` would produce, separators included.
fn joined_len(sections: &[Section]) -> usize {
    let parts: Vec<usize> = sections
        .iter()
        .map(|s| s.content.len())
        .filter(|len| *len > 0)
        .collect();
    parts.iter().sum::<usize>() + SEPARATOR.len() * parts.len().saturating_sub(1)
}

fn join_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Cut `section` to at most `max_len` bytes, ending with the truncation marker.
fn truncate_section(section: &mut Section, max_len: usize) {
    let before_len = section.content.len();
    let mut cut = max_len.saturating_sub(TRUNCATION_MARKER.len());
    while cut > 0 && !section.content.is_char_boundary(cut) {
        cut -= 1;
    }
    section.content.truncate(cut);
    if cut == 0 {
        section.content.push_str(TRUNCATION_MARKER.trim_start());
    } else {
        section.content.push_str(TRUNCATION_MARKER);
    }
    debug!(
        section = %section.key,
        before_len,
        after_len = section.content.len(),
        "truncated section for budget"
    );
}

fn apply_budget(sections: &mut Vec<Section>, budget: usize) {
    for key in DROP_ORDER {
        if joined_len(sections) <= budget {
            return;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    // Largest role input first; the role contract and output format stay whole.
    let mut candidates: Vec<usize> = (0..sections.len())
        .filter(|&idx| {
            !KEEP_WHOLE.contains(&sections[idx].key.as_str())
                && sections[idx].content.len() > TRUNCATION_MARKER.len()
        })
        .collect();
    candidates.sort_by_key(|&idx| std::cmp::Reverse(sections[idx].content.len()));
    for idx in candidates {
        let total = joined_len(sections);
        if total <= budget {
            return;
        }
        let max_len = sections[idx].content.len().saturating_sub(total - budget);
        truncate_section(&mut sections[idx], max_len);
    }

    let total = joined_len(sections);
    if total > budget {
        warn!(total, budget, "prompt exceeds budget after truncating every role input");
    }
}

/// Renders role prompts within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    /// Render the task description for `ctx.role`.
    pub fn build(&self, ctx: &RoleContext) -> Result<String> {
        let engine = PromptEngine::new();
        let mut ctx = ctx.clone();
        loop {
            let rendered = engine
                .render(&ctx)
                .with_context(|| format!("render {} prompt", ctx.role))?;
            let mut sections = parse_sections(&rendered);
            if joined_len(&sections) > self.budget_bytes && !ctx.own_history.is_empty() {
                let dropped = ctx.own_history.remove(0);
                debug!(role = %ctx.role, round = dropped.round, "dropped oldest history entry for budget");
                continue;
            }
            apply_budget(&mut sections, self.budget_bytes);
            return Ok(join_sections(&sections));
        }
    }
}
