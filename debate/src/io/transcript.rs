//! JSONL transcript of accepted role results.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::router::{TranscriptEntry, TranscriptSink};
use crate::io::write_atomic;

/// `transcript.jsonl` sink; one line per accepted delivery, flushed on append.
///
/// A turn re-run after a crash between the append and the session save
/// replaces the trailing entry for the same round and role instead of adding
/// a second one.
#[derive(Debug, Clone)]
pub struct JsonlTranscript {
    path: PathBuf,
}

impl JsonlTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for JsonlTranscript {
    fn append(&mut self, entry: &TranscriptEntry) -> Result<()> {
        let mut entries = load_transcript(&self.path)?;
        if let Some(last) = entries.last_mut()
            && last.round == entry.round
            && last.role == entry.role
        {
            *last = entry.clone();
            let mut contents = String::new();
            for existing in &entries {
                contents.push_str(
                    &serde_json::to_string(existing).context("serialize transcript entry")?,
                );
                contents.push('\n');
            }
            write_atomic(&self.path, &contents)?;
            debug!(round = entry.round, role = %entry.role, "transcript entry replaced");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create transcript dir {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(entry).context("serialize transcript entry")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open transcript {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append transcript {}", self.path.display()))?;
        file.flush().context("flush transcript")?;
        debug!(round = entry.round, role = %entry.role, "transcript entry appended");
        Ok(())
    }
}

/// Read every transcript entry; a missing file is an empty transcript.
pub fn load_transcript(path: &Path) -> Result<Vec<TranscriptEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).with_context(|| format!("open transcript {}", path.display()))?;
    let mut entries = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read transcript {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line)
            .with_context(|| format!("parse transcript line {} in {}", line_no + 1, path.display()))?;
        entries.push(entry);
    }
    Ok(entries)
}
