//! A loaded debate: output directory, configuration and session state.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::controller::expect_role;
use crate::core::error::DebateError;
use crate::core::queue::TaskId;
use crate::core::router::{Delivery, MessageRouter};
use crate::core::types::Role;
use crate::io::config::{DebateConfig, load_config};
use crate::io::live::{EntryKind, LiveFeed};
use crate::io::output::OutputWriter;
use crate::io::paths::DebatePaths;
use crate::io::session_store::{SessionState, load_session, write_session};
use crate::io::transcript::JsonlTranscript;

pub struct DebateWorkspace {
    pub paths: DebatePaths,
    pub config: DebateConfig,
    pub state: SessionState,
    pub feed: LiveFeed,
    pub writer: OutputWriter,
    router: MessageRouter<JsonlTranscript>,
}

impl DebateWorkspace {
    /// Load config and session from an initialized output directory.
    pub fn open(root: &Path) -> Result<Self> {
        let paths = DebatePaths::new(root);
        if !paths.is_initialized() {
            return Err(anyhow!(
                "no debate in {} (run `debate init` first)",
                paths.root.display()
            ));
        }
        let config = load_config(&paths.config_path)?;
        let state = load_session(&paths.session_path)
            .with_context(|| format!("load {}", paths.session_path.display()))?;
        debug!(root = %paths.root.display(), rounds = state.session.rounds.len(), "workspace opened");
        Ok(Self {
            feed: LiveFeed::new(&paths.state_path, config.live_feed),
            writer: OutputWriter::new(paths.clone()),
            router: MessageRouter::new(JsonlTranscript::new(&paths.transcript_path)),
            paths,
            config,
            state,
        })
    }

    /// Persist the session atomically.
    pub fn save(&self) -> Result<()> {
        write_session(&self.paths.session_path, &self.state)
    }

    /// Accept `text` as `role`'s result for the open round.
    ///
    /// Order is checked before anything is mutated, so a rejected delivery
    /// leaves the task, transcript and session untouched. On success the
    /// task (if any) is completed, the result routed, the feed updated and
    /// the session saved.
    pub fn accept_result(&mut self, role: Role, text: &str, task: Option<TaskId>) -> Result<Delivery> {
        let round = self
            .state
            .session
            .open_round()
            .ok_or(DebateError::NoOpenRound)?;
        expect_role(round, role)?;

        if let Some(id) = task {
            self.state.queue.complete(id)?;
        }
        let delivery = self.router.deliver(&mut self.state.session, role, text)?;
        self.feed
            .upsert_entry(delivery.round, role, EntryKind::Turn, text)?;
        self.feed.set_thinking(None)?;
        self.save()?;
        debug!(
            round = delivery.round,
            role = %role,
            early_ruling = delivery.early_ruling,
            "result accepted"
        );
        Ok(delivery)
    }
}
