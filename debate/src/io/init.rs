//! Output directory scaffolding for a new debate.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{DebateConfig, load_config, write_config};
use super::live::LiveFeed;
use super::paths::{DebatePaths, round_index_from_path};
use super::session_store::{SessionState, write_session};
use crate::core::types::DebateSession;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub topic: String,
    /// Overrides `rounds` from `config.toml`.
    pub rounds: Option<u32>,
    /// Discard an existing debate in the same directory.
    pub force: bool,
}

/// Create a fresh session in `root`.
///
/// An existing `config.toml` is kept (it is human-edited); every debate
/// artifact is replaced. Fails if a session already exists unless
/// `options.force` is set.
pub fn init_debate(root: &Path, options: &InitOptions) -> Result<DebatePaths> {
    let paths = DebatePaths::new(root);
    let topic = options.topic.trim();
    if topic.is_empty() {
        return Err(anyhow!("debate init: topic must not be empty"));
    }
    if paths.root.exists() && !paths.root.is_dir() {
        return Err(anyhow!(
            "debate init: {} exists but is not a directory",
            paths.root.display()
        ));
    }
    if paths.is_initialized() && !options.force {
        return Err(anyhow!(
            "debate init: {} already exists (use --force to overwrite)",
            paths.session_path.display()
        ));
    }

    fs::create_dir_all(&paths.root)
        .with_context(|| format!("create directory {}", paths.root.display()))?;
    clear_artifacts(&paths)?;

    let config = if paths.config_path.exists() {
        load_config(&paths.config_path)?
    } else {
        let config = DebateConfig::default();
        write_config(&paths.config_path, &config)?;
        config
    };
    let rounds = options.rounds.unwrap_or(config.rounds);
    if rounds == 0 {
        return Err(anyhow!("debate init: rounds must be > 0"));
    }

    let state = SessionState::new(DebateSession::new(topic, Some(rounds)));
    write_session(&paths.session_path, &state)?;
    LiveFeed::new(&paths.state_path, config.live_feed).init(topic, rounds)?;

    info!(root = %paths.root.display(), rounds, "debate initialized");
    Ok(paths)
}

fn clear_artifacts(paths: &DebatePaths) -> Result<()> {
    for path in [
        &paths.session_path,
        &paths.state_path,
        &paths.transcript_path,
        &paths.synthesis_path,
    ] {
        remove_file_if_exists(path)?;
    }
    if paths.turns_dir.exists() {
        fs::remove_dir_all(&paths.turns_dir)
            .with_context(|| format!("remove {}", paths.turns_dir.display()))?;
    }
    for entry in fs::read_dir(&paths.root)
        .with_context(|| format!("read directory {}", paths.root.display()))?
    {
        let path = entry.context("read directory entry")?.path();
        if round_index_from_path(&path).is_some() {
            remove_file_if_exists(&path)?;
        }
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::session_store::load_session;

    fn options(topic: &str, force: bool) -> InitOptions {
        InitOptions {
            topic: topic.to_string(),
            rounds: None,
            force,
        }
    }

    #[test]
    fn init_creates_session_config_and_feed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_debate(&temp.path().join("out"), &options("Adopt Rust", false))
            .expect("init");

        assert!(paths.config_path.is_file());
        assert!(paths.state_path.is_file());
        let state = load_session(&paths.session_path).expect("load");
        assert_eq!(state.session.topic, "Adopt Rust");
        assert_eq!(state.session.round_limit, Some(3));
        assert!(state.session.rounds.is_empty());
    }

    #[test]
    fn init_without_force_refuses_existing_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_debate(temp.path(), &options("first", false)).expect("init");
        let err = init_debate(temp.path(), &options("second", false)).expect_err("exists");
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn force_clears_artifacts_and_keeps_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_debate(temp.path(), &options("first", false)).expect("init");
        fs::write(&paths.config_path, "rounds = 5\n").expect("custom config");
        fs::write(paths.round_path(1), "old round").expect("round");
        fs::write(&paths.transcript_path, "{}\n").expect("transcript");

        init_debate(temp.path(), &options("second", true)).expect("re-init");

        assert!(!paths.round_path(1).exists());
        assert!(!paths.transcript_path.exists());
        assert_eq!(
            fs::read_to_string(&paths.config_path).expect("config"),
            "rounds = 5\n"
        );
        let state = load_session(&paths.session_path).expect("load");
        assert_eq!(state.session.topic, "second");
        assert_eq!(state.session.round_limit, Some(5));
    }

    #[test]
    fn explicit_rounds_override_config_and_zero_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut opts = options("topic", false);
        opts.rounds = Some(0);
        assert!(init_debate(temp.path(), &opts).is_err());

        opts.rounds = Some(1);
        let paths = init_debate(temp.path(), &opts).expect("init");
        let state = load_session(&paths.session_path).expect("load");
        assert_eq!(state.session.round_limit, Some(1));
    }
}
