//! Canonical file layout of a debate output directory.

use std::path::{Path, PathBuf};

use crate::core::types::Role;

/// Output directory used when none is given on the command line.
pub const DEFAULT_OUTPUT_DIR: &str = "debate-output";

/// All canonical paths within an output directory.
#[derive(Debug, Clone)]
pub struct DebatePaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub session_path: PathBuf,
    pub state_path: PathBuf,
    pub transcript_path: PathBuf,
    pub synthesis_path: PathBuf,
    pub turns_dir: PathBuf,
}

impl DebatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_path: root.join("config.toml"),
            session_path: root.join("session.json"),
            state_path: root.join("state.json"),
            transcript_path: root.join("transcript.jsonl"),
            synthesis_path: root.join("synthesis.md"),
            turns_dir: root.join("turns"),
            root,
        }
    }

    /// `round-<index>.md`
    pub fn round_path(&self, index: u32) -> PathBuf {
        self.root.join(format!("round-{index}.md"))
    }

    /// `turns/<round>-<role>-<attempt>.log`
    pub fn turn_log_path(&self, round: u32, role: Role, attempt: u32) -> PathBuf {
        self.turns_dir.join(format!("{round}-{role}-{attempt}.log"))
    }

    pub fn is_initialized(&self) -> bool {
        self.session_path.exists()
    }
}

/// Parse a `round-<n>.md` file name back into its index.
pub fn round_index_from_path(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("round-")?
        .strip_suffix(".md")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_paths_round_trip_their_index() {
        let paths = DebatePaths::new("/tmp/out");
        let path = paths.round_path(12);
        assert_eq!(path, PathBuf::from("/tmp/out/round-12.md"));
        assert_eq!(round_index_from_path(&path), Some(12));
        assert_eq!(round_index_from_path(&paths.synthesis_path), None);
    }

    #[test]
    fn turn_logs_live_under_turns_dir() {
        let paths = DebatePaths::new("out");
        assert_eq!(
            paths.turn_log_path(2, Role::Judge, 1),
            PathBuf::from("out/turns/2-judge-1.log")
        );
    }
}
