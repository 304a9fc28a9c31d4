//! Append-only JSON run log for composed queries.
//!
//! The log file is a JSON array of run entries. Run ids are zero-padded
//! sequence numbers supplied by a [`RunSequence`], so tests can inject a
//! fixed sequence instead of reading a file.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use formtext_core::budget::Trim;

/// Width of a zero-padded run id.
pub const RUN_ID_WIDTH: usize = 7;

/// Source of run ids.
pub trait RunSequence {
    fn next_run_id(&self) -> String;
}

/// Derives the next run id from an existing JSON-array log file.
///
/// Uses the last entry's numeric `run_id` + 1, else the entry count + 1,
/// else 1 when the file is missing or unreadable.
#[derive(Debug, Clone)]
pub struct JsonLogSequence {
    path: PathBuf,
}

impl JsonLogSequence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RunSequence for JsonLogSequence {
    fn next_run_id(&self) -> String {
        let entries = read_entries(&self.path).unwrap_or_default();
        let next = entries
            .last()
            .and_then(|e| e.get("run_id"))
            .and_then(|id| match id {
                Value::String(s) => s.trim().parse::<u64>().ok(),
                Value::Number(n) => n.as_u64(),
                _ => None,
            })
            .map(|n| n + 1)
            .unwrap_or(entries.len() as u64 + 1);
        format_run_id(next)
    }
}

pub fn format_run_id(n: u64) -> String {
    format!("{:0width$}", n, width = RUN_ID_WIDTH)
}

/// One logged compose run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub run_id: String,
    pub timestamp: String,
    pub input: String,
    pub token_budget: usize,
    pub combined_length: usize,
    pub trims: Vec<Trim>,
}

impl RunEntry {
    pub fn new(
        seq: &dyn RunSequence,
        input: &Path,
        token_budget: usize,
        combined_length: usize,
        trims: Vec<Trim>,
    ) -> Self {
        Self {
            run_id: seq.next_run_id(),
            timestamp: Utc::now().to_rfc3339(),
            input: input.display().to_string(),
            token_budget,
            combined_length,
            trims,
        }
    }
}

fn read_entries(path: &Path) -> Option<Vec<Value>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&text).ok()? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Append `entry` to the JSON-array log at `path`.
///
/// A missing or unparseable log is replaced by a fresh array.
pub fn append_entry(path: &Path, entry: &RunEntry) -> Result<()> {
    let mut entries = read_entries(path).unwrap_or_default();
    entries.push(serde_json::to_value(entry)?);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&entries)?)
        .with_context(|| format!("Failed to write run log: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixed(&'static str);

    impl RunSequence for Fixed {
        fn next_run_id(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_sequence_missing_file_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let seq = JsonLogSequence::new(dir.path().join("log.json"));
        assert_eq!(seq.next_run_id(), "0000001");
    }

    #[test]
    fn test_sequence_from_last_run_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, r#"[{"run_id": "0000004"}, {"run_id": "0000041"}]"#).unwrap();
        assert_eq!(JsonLogSequence::new(&path).next_run_id(), "0000042");
    }

    #[test]
    fn test_sequence_falls_back_to_len() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, r#"[{"x": 1}, {"run_id": "abc"}]"#).unwrap();
        assert_eq!(JsonLogSequence::new(&path).next_run_id(), "0000003");
    }

    #[test]
    fn test_sequence_unreadable_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, "garbage").unwrap();
        assert_eq!(JsonLogSequence::new(&path).next_run_id(), "0000001");
    }

    #[test]
    fn test_append_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("runs.json");
        let seq = JsonLogSequence::new(&path);
        for _ in 0..2 {
            let entry = RunEntry::new(&seq, Path::new("in.json"), 100, 42, Vec::new());
            append_entry(&path, &entry).unwrap();
        }
        let entries: Vec<RunEntry> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].run_id, "0000002");
        assert_eq!(entries[1].combined_length, 42);
    }

    #[test]
    fn test_injected_sequence() {
        let entry = RunEntry::new(&Fixed("0000099"), Path::new("x"), 1, 2, Vec::new());
        assert_eq!(entry.run_id, "0000099");
        assert!(!entry.timestamp.is_empty());
    }
}
