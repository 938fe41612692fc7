//! Shared application state for the live-feed server.

use std::path::PathBuf;
use std::sync::Arc;

use debate::io::paths::DebatePaths;
use tokio::sync::broadcast;

/// Events broadcast to SSE clients when files in the output directory change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// `state.json` was rewritten by the orchestrator.
    StateChanged,
    SessionChanged,
    RoundWritten { round: u32 },
    SynthesisWritten,
    ConfigChanged,
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<DebatePaths>,
    /// Broadcast sender for file change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
}

impl AppState {
    pub fn new(output_dir: PathBuf) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            paths: Arc::new(DebatePaths::new(output_dir)),
            event_tx: Arc::new(event_tx),
        }
    }
}
