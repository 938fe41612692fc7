//! Live progress feed (`state.json`) polled by the viewer.
//!
//! Every operation is a load-modify-save of the whole document and is an
//! idempotent set, so replaying a turn after a crash never duplicates an
//! entry. Each save bumps `version`, which clients compare to detect change.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::write_atomic;
use crate::core::types::{DEFAULT_ROUND_LIMIT, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Turn,
    Synthesis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEntry {
    /// 0 for the synthesis entry.
    pub round: u32,
    pub agent: Role,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Local wall-clock time, `HH:MM`.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub topic: String,
    pub status: FeedStatus,
    /// Role currently working, if any.
    pub thinking: Option<Role>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub version: u64,
    pub entries: Vec<LiveEntry>,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            topic: String::new(),
            status: FeedStatus::InProgress,
            thinking: None,
            current_round: 1,
            total_rounds: DEFAULT_ROUND_LIMIT,
            version: 0,
            entries: Vec::new(),
        }
    }
}

/// Handle on `state.json`. A disabled feed turns every update into a no-op.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    path: PathBuf,
    enabled: bool,
}

impl LiveFeed {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reset the feed for a new debate.
    pub fn init(&self, topic: &str, total_rounds: u32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let state = LiveState {
            topic: topic.to_string(),
            total_rounds,
            version: self.load()?.version,
            ..LiveState::default()
        };
        self.save(state)
    }

    pub fn set_thinking(&self, role: Option<Role>) -> Result<()> {
        self.update(|state| state.thinking = role)
    }

    pub fn set_round(&self, round: u32) -> Result<()> {
        self.update(|state| state.current_round = round)
    }

    pub fn set_status(&self, status: FeedStatus) -> Result<()> {
        self.update(|state| {
            state.status = status;
            if status == FeedStatus::Completed {
                state.thinking = None;
            }
        })
    }

    /// Insert or replace the entry keyed by `(round, agent, kind)`.
    pub fn upsert_entry(&self, round: u32, agent: Role, kind: EntryKind, content: &str) -> Result<()> {
        self.update(|state| {
            let existing = state
                .entries
                .iter_mut()
                .find(|entry| entry.round == round && entry.agent == agent && entry.kind == kind);
            match existing {
                Some(entry) if entry.content == content => {}
                Some(entry) => {
                    entry.content = content.to_string();
                    entry.timestamp = timestamp();
                }
                None => state.entries.push(LiveEntry {
                    round,
                    agent,
                    content: content.to_string(),
                    kind,
                    timestamp: timestamp(),
                }),
            }
        })
    }

    /// Read the current document; a missing file yields the default state.
    pub fn load(&self) -> Result<LiveState> {
        load_live_state(&self.path)
    }

    fn update(&self, apply: impl FnOnce(&mut LiveState)) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let mut state = self.load()?;
        apply(&mut state);
        self.save(state)
    }

    fn save(&self, mut state: LiveState) -> Result<()> {
        state.version += 1;
        debug!(path = %self.path.display(), version = state.version, "writing live state");
        let mut buf = serde_json::to_string_pretty(&state).context("serialize live state")?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

pub fn load_live_state(path: &Path) -> Result<LiveState> {
    if !path.exists() {
        return Ok(LiveState::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read live state {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse live state {}", path.display()))
}

fn timestamp() -> String {
    Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(temp: &tempfile::TempDir) -> LiveFeed {
        LiveFeed::new(temp.path().join("state.json"), true)
    }

    #[test]
    fn every_save_bumps_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let feed = feed(&temp);
        feed.init("Adopt Rust", 3).expect("init");
        feed.set_thinking(Some(Role::Critic)).expect("thinking");
        feed.set_round(1).expect("round");

        let state = feed.load().expect("load");
        assert_eq!(state.version, 3);
        assert_eq!(state.topic, "Adopt Rust");
        assert_eq!(state.thinking, Some(Role::Critic));
    }

    #[test]
    fn upsert_is_keyed_by_round_agent_and_kind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let feed = feed(&temp);
        feed.init("topic", 2).expect("init");
        feed.upsert_entry(1, Role::Critic, EntryKind::Turn, "first draft")
            .expect("upsert");
        feed.upsert_entry(1, Role::Critic, EntryKind::Turn, "replayed")
            .expect("upsert again");
        feed.upsert_entry(0, Role::Scribe, EntryKind::Synthesis, "synthesis")
            .expect("synthesis");

        let state = feed.load().expect("load");
        assert_eq!(state.entries.len(), 2);
        assert_eq!(state.entries[0].content, "replayed");
        assert_eq!(state.entries[1].round, 0);
    }

    #[test]
    fn completed_clears_thinking_and_serializes_viewer_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let feed = feed(&temp);
        feed.init("topic", 3).expect("init");
        feed.set_thinking(Some(Role::Judge)).expect("thinking");
        feed.upsert_entry(1, Role::Judge, EntryKind::Turn, "ruling")
            .expect("upsert");
        feed.set_status(FeedStatus::Completed).expect("status");

        let raw = fs::read_to_string(feed.path()).expect("read");
        assert!(raw.contains("\"status\": \"completed\""), "{raw}");
        assert!(raw.contains("\"thinking\": null"), "{raw}");
        assert!(raw.contains("\"type\": \"turn\""), "{raw}");
        assert!(raw.contains("\"agent\": \"judge\""), "{raw}");
    }

    #[test]
    fn disabled_feed_writes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let feed = LiveFeed::new(temp.path().join("state.json"), false);
        feed.init("topic", 3).expect("init");
        feed.set_round(2).expect("round");
        assert!(!feed.path().exists());
    }
}
