//! Debate configuration stored under `debate-output/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::write_atomic;
use crate::core::types::DEFAULT_ROUND_LIMIT;

/// What to do when an agent misses its turn deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Mark the task failed and stop the debate.
    Abort,
    /// Mark the task failed and re-enqueue the turn, up to `max_turn_attempts`.
    Retry,
}

/// Debate configuration (TOML).
///
/// Edited by humans; missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebateConfig {
    /// Round limit for new sessions.
    pub rounds: u32,

    /// Wall-clock budget for a single agent turn, in seconds.
    pub turn_timeout_secs: u64,

    /// Attempts per turn under `on_timeout = "retry"`.
    pub max_turn_attempts: u32,

    pub on_timeout: TimeoutPolicy,

    /// Truncate captured agent stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Maximum bytes for a rendered turn prompt before history is dropped.
    pub prompt_budget_bytes: usize,

    /// Mirror progress to `state.json` for the live viewer.
    pub live_feed: bool,

    /// Reference material paths passed to every role.
    pub references: Vec<String>,

    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Command that reads a prompt on stdin and prints the role's result.
    pub command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec!["claude".to_string(), "-p".to_string()],
        }
    }
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUND_LIMIT,
            turn_timeout_secs: 30 * 60,
            max_turn_attempts: 2,
            on_timeout: TimeoutPolicy::Abort,
            output_limit_bytes: 200_000,
            prompt_budget_bytes: 60_000,
            live_feed: true,
            references: Vec::new(),
            agent: AgentConfig::default(),
        }
    }
}

impl DebateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(anyhow!("rounds must be > 0"));
        }
        if self.turn_timeout_secs == 0 {
            return Err(anyhow!("turn_timeout_secs must be > 0"));
        }
        if self.max_turn_attempts == 0 {
            return Err(anyhow!("max_turn_attempts must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        Ok(())
    }

    /// Attempts allowed per turn under the configured timeout policy.
    pub fn attempts_per_turn(&self) -> u32 {
        match self.on_timeout {
            TimeoutPolicy::Abort => 1,
            TimeoutPolicy::Retry => self.max_turn_attempts,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DebateConfig::default()`.
pub fn load_config(path: &Path) -> Result<DebateConfig> {
    if !path.exists() {
        let cfg = DebateConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DebateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DebateConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
