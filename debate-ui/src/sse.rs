//! Server-Sent Events stream and output-directory watcher.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use debate::io::paths::round_index_from_path;
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::state::{AppState, ChangeEvent};

#[derive(Serialize)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    round: Option<u32>,
}

impl From<&ChangeEvent> for SsePayload {
    fn from(event: &ChangeEvent) -> Self {
        let (event_type, round) = match event {
            ChangeEvent::StateChanged => ("state_changed", None),
            ChangeEvent::SessionChanged => ("session_changed", None),
            ChangeEvent::RoundWritten { round } => ("round_written", Some(*round)),
            ChangeEvent::SynthesisWritten => ("synthesis_written", None),
            ChangeEvent::ConfigChanged => ("config_changed", None),
        };
        SsePayload { event_type, round }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    let payload = SsePayload::from(&change_event);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Start the output-directory watcher in a background task.
pub fn start_file_watcher(state: AppState) {
    tokio::spawn(async move {
        if let Err(e) = run_file_watcher(state).await {
            warn!(error = %e, "file watcher failed");
        }
    });
}

async fn run_file_watcher(state: AppState) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    let root = &state.paths.root;
    if root.exists() {
        watcher.watch(root, RecursiveMode::NonRecursive)?;
        info!(path = %root.display(), "watching output directory");
    } else {
        warn!(path = %root.display(), "output directory does not exist, no live updates");
    }

    // Flush on a fixed tick so a burst of rewrites collapses into one event each.
    let mut pending_events: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(Duration::from_millis(100));
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending_events.push(event);
            }
            _ = flush_tick.tick() => {
                if pending_events.is_empty() {
                    continue;
                }
                process_events(&state, &pending_events);
                pending_events.clear();
            }
        }
    }
}

/// Translate a batch of file events into deduplicated change events.
fn process_events(state: &AppState, events: &[NotifyEvent]) {
    let paths = &state.paths;
    let mut state_changed = false;
    let mut session_changed = false;
    let mut synthesis_written = false;
    let mut config_changed = false;
    let mut rounds: BTreeSet<u32> = BTreeSet::new();

    for event in events {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        for path in &event.paths {
            if path == &paths.state_path {
                state_changed = true;
            } else if path == &paths.session_path {
                session_changed = true;
            } else if path == &paths.synthesis_path {
                synthesis_written = true;
            } else if path == &paths.config_path {
                config_changed = true;
            } else if let Some(round) = round_index_from_path(path) {
                rounds.insert(round);
            }
        }
    }

    let mut changes = Vec::new();
    if state_changed {
        changes.push(ChangeEvent::StateChanged);
    }
    if session_changed {
        changes.push(ChangeEvent::SessionChanged);
    }
    changes.extend(rounds.into_iter().map(|round| ChangeEvent::RoundWritten { round }));
    if synthesis_written {
        changes.push(ChangeEvent::SynthesisWritten);
    }
    if config_changed {
        changes.push(ChangeEvent::ConfigChanged);
    }

    for change in changes {
        debug!(?change, "broadcasting change");
        let _ = state.event_tx.send(change);
    }
}
