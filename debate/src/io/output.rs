//! Markdown documents for closed rounds and the final synthesis.
//!
//! Rendering is deterministic: the same round always produces the same
//! bytes, so rewriting a round after a resume is harmless.

use std::path::PathBuf;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::{debug, info, instrument};

use super::paths::DebatePaths;
use super::write_atomic;
use crate::core::error::DebateError;
use crate::core::synthesis::{Synthesis, build_synthesis};
use crate::core::types::{DebateSession, Round};

const ROUND_TEMPLATE: &str = include_str!("templates/round.md");
const SYNTHESIS_TEMPLATE: &str = include_str!("templates/synthesis.md");

struct DocumentEngine {
    env: Environment<'static>,
}

impl DocumentEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("round.md", ROUND_TEMPLATE)
            .expect("round template should be valid");
        env.add_template("synthesis.md", SYNTHESIS_TEMPLATE)
            .expect("synthesis template should be valid");
        Self { env }
    }

    fn render_round(&self, round: &Round) -> Result<String> {
        let text = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();
        let template = self.env.get_template("round.md")?;
        let rendered = template.render(context! {
            index => round.index,
            critic => text(&round.critic),
            advocate => text(&round.advocate),
            judge => text(&round.judge),
            scribe => text(&round.scribe),
            early_ruling => round.early_ruling,
        })?;
        Ok(with_trailing_newline(rendered))
    }

    fn render_synthesis(&self, synthesis: &Synthesis) -> Result<String> {
        let template = self.env.get_template("synthesis.md")?;
        let rendered = template.render(context! {
            topic => synthesis.topic.trim(),
            rounds_completed => synthesis.rounds_completed,
            termination => synthesis.termination.label(),
            round_outcomes => &synthesis.round_outcomes,
            agreements => &synthesis.agreements,
            concessions => &synthesis.concessions,
            dismissed => &synthesis.dismissed,
            rulings => &synthesis.rulings,
            unresolved => &synthesis.unresolved,
            verdict => synthesis.verdict.trim(),
        })?;
        Ok(with_trailing_newline(rendered))
    }
}

fn with_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Render a complete round. Fails with `IncompleteRound` if any role is missing.
pub fn render_round(round: &Round) -> Result<String> {
    let missing = round.missing_roles();
    if !missing.is_empty() {
        return Err(DebateError::IncompleteRound {
            index: round.index,
            missing,
        }
        .into());
    }
    DocumentEngine::new()
        .render_round(round)
        .with_context(|| format!("render round {}", round.index))
}

/// Render the synthesis document for `session`.
pub fn render_synthesis(session: &DebateSession) -> Result<String> {
    let synthesis = build_synthesis(session)?;
    DocumentEngine::new()
        .render_synthesis(&synthesis)
        .context("render synthesis")
}

/// Writes round and synthesis documents into an output directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    paths: DebatePaths,
}

impl OutputWriter {
    pub fn new(paths: DebatePaths) -> Self {
        Self { paths }
    }

    /// Write `round-<index>.md`, replacing any earlier write for that index.
    #[instrument(skip_all, fields(round = round.index))]
    pub fn write_round(&self, round: &Round) -> Result<PathBuf> {
        let rendered = render_round(round)?;
        let path = self.paths.round_path(round.index);
        write_atomic(&path, &rendered)?;
        debug!(path = %path.display(), bytes = rendered.len(), "round written");
        Ok(path)
    }

    /// Write `synthesis.md` and return the rendered document.
    #[instrument(skip_all, fields(rounds = session.rounds.len()))]
    pub fn write_synthesis(&self, session: &DebateSession) -> Result<String> {
        let rendered = render_synthesis(session)?;
        write_atomic(&self.paths.synthesis_path, &rendered)?;
        info!(path = %self.paths.synthesis_path.display(), "synthesis written");
        Ok(rendered)
    }
}
