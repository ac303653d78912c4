//! Feedback log boundary
//!
//! The core only supplies the fields; the sink owns durability. The default
//! sink appends one JSON object per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

/// User vote on an answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    /// Answer was helpful
    Up,
    /// Answer was not helpful
    Down,
}

/// One feedback entry for a question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// When the feedback was given
    pub timestamp: DateTime<Utc>,
    /// The vote
    pub vote: Vote,
    /// The question that was asked
    pub question: String,
    /// The answer that was shown
    pub answer: String,
    /// Sources cited with the answer
    pub sources: Vec<String>,
    /// Identifies the pipeline configuration that produced the answer
    pub config_tag: String,
}

/// Accepts feedback records and appends them durably
pub trait FeedbackSink: Send + Sync {
    /// Append one record
    fn append(&self, record: &FeedbackRecord) -> Result<()>;
}

/// Append-only JSON-lines feedback log
pub struct JsonlFeedbackSink {
    path: PathBuf,
}

impl JsonlFeedbackSink {
    /// Create a sink writing to `path`; the file is created on first append
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FeedbackSink for JsonlFeedbackSink {
    fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_append_as_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.jsonl");
        let sink = JsonlFeedbackSink::new(path.clone());

        for vote in [Vote::Up, Vote::Down] {
            sink.append(&FeedbackRecord {
                timestamp: Utc::now(),
                vote,
                question: "门票多少钱？".to_string(),
                answer: "每人499元。".to_string(),
                sources: vec!["A.txt".to_string()],
                config_tag: "default".to_string(),
            })
            .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: FeedbackRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.vote, Vote::Up);
        assert_eq!(first.sources, vec!["A.txt"]);
    }
}
